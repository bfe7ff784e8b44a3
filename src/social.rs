use spin_sdk::http::{Request, Response};
use crate::models::models::{Post, User};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{store, validate_uuid};
use crate::core::kv::KeyValue;

// Follow and like relations are stored as id lists: `followings:{user}`
// and `followers:{user}` are inverse views of the same edges and are
// always written together; `likes:{post}` holds the ids of users who
// like the post, and counts are always derived from list length.

pub fn is_following<S: KeyValue>(store: &S, actor: &str, target: &str) -> Result<bool, ApiError> {
    let followings: Vec<String> = store.get_json(&followings_key(actor))?.unwrap_or_default();
    Ok(followings.iter().any(|id| id == target))
}

pub fn following_of<S: KeyValue>(store: &S, user_id: &str) -> Result<Vec<String>, ApiError> {
    Ok(store.get_json(&followings_key(user_id))?.unwrap_or_default())
}

pub fn followers_of<S: KeyValue>(store: &S, user_id: &str) -> Result<Vec<String>, ApiError> {
    Ok(store.get_json(&followers_key(user_id))?.unwrap_or_default())
}

pub fn following_count<S: KeyValue>(store: &S, user_id: &str) -> Result<usize, ApiError> {
    Ok(following_of(store, user_id)?.len())
}

pub fn followers_count<S: KeyValue>(store: &S, user_id: &str) -> Result<usize, ApiError> {
    Ok(followers_of(store, user_id)?.len())
}

/// Flip the follow edge actor→target. Returns the state after the flip.
pub fn toggle_follow<S: KeyValue>(store: &S, actor: &str, target: &str) -> Result<bool, ApiError> {
    if actor == target {
        return Err(ApiError::Forbidden("You cannot follow yourself.".to_string()));
    }
    if store.get_json::<User>(&user_key(target))?.is_none() {
        return Err(ApiError::NotFound("Target user not found".to_string()));
    }

    let mut followings: Vec<String> = store.get_json(&followings_key(actor))?.unwrap_or_default();
    let mut followers: Vec<String> = store.get_json(&followers_key(target))?.unwrap_or_default();
    let prior_followers = followers.clone();

    let now_following = if followings.iter().any(|id| id == target) {
        followings.retain(|id| id != target);
        followers.retain(|id| id != actor);
        false
    } else {
        followings.push(target.to_string());
        followers.push(actor.to_string());
        true
    };

    // Two keys, no transaction: if the second write fails, restore the
    // first so the inverse views never disagree.
    store.set_json(&followers_key(target), &followers)?;
    if let Err(err) = store.set_json(&followings_key(actor), &followings) {
        let _ = store.set_json(&followers_key(target), &prior_followers);
        return Err(err.into());
    }

    Ok(now_following)
}

pub fn likes_of<S: KeyValue>(store: &S, post_id: &str) -> Result<Vec<String>, ApiError> {
    Ok(store.get_json(&likes_key(post_id))?.unwrap_or_default())
}

pub fn likes_count<S: KeyValue>(store: &S, post_id: &str) -> Result<usize, ApiError> {
    Ok(likes_of(store, post_id)?.len())
}

pub fn liked_by<S: KeyValue>(store: &S, post_id: &str, user_id: &str) -> Result<bool, ApiError> {
    Ok(likes_of(store, post_id)?.iter().any(|id| id == user_id))
}

/// Flip the actor's like on a post. Returns the state after the flip and
/// the resulting like count.
pub fn toggle_like<S: KeyValue>(store: &S, actor: &str, post_id: &str) -> Result<(bool, usize), ApiError> {
    if store.get_json::<Post>(&post_key(post_id))?.is_none() {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let mut likers: Vec<String> = store.get_json(&likes_key(post_id))?.unwrap_or_default();
    let liked = if likers.iter().any(|id| id == actor) {
        likers.retain(|id| id != actor);
        false
    } else {
        likers.push(actor.to_string());
        true
    };
    store.set_json(&likes_key(post_id), &likers)?;

    Ok((liked, likers.len()))
}

// === HTTP handlers ===

pub fn handle_follow_toggle(req: Request) -> anyhow::Result<Response> {
    let user_id = match crate::auth::validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let target_user_id = value["target_user_id"].as_str().unwrap_or_default();

    if target_user_id.is_empty() || !validate_uuid(target_user_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }

    match toggle_follow(&store, &user_id, target_user_id) {
        Ok(following) => {
            tracing::debug!(actor = %user_id, target = %target_user_id, following, "follow toggled");
            let count = match followers_count(&store, target_user_id) {
                Ok(count) => count,
                Err(e) => return Ok(e.into()),
            };
            let resp = serde_json::json!({
                "following": following,
                "followers_count": count,
            });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        Err(e) => Ok(e.into()),
    }
}

pub fn handle_like_toggle(req: Request) -> anyhow::Result<Response> {
    let user_id = match crate::auth::validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    // Path shape: /posts/{id}/like
    let path = req.path();
    let post_id = path
        .trim_start_matches("/posts/")
        .trim_end_matches("/like")
        .trim_end_matches('/');

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    match toggle_like(&store, &user_id, post_id) {
        Ok((liked, likes_count)) => {
            tracing::debug!(actor = %user_id, post = %post_id, liked, "like toggled");
            let resp = serde_json::json!({
                "liked": liked,
                "likes_count": likes_count,
            });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        Err(e) => Ok(e.into()),
    }
}

pub fn get_followings_list(path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/followings/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    match following_of(&store, user_id) {
        Ok(followings) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&followings)?)
            .build()),
        Err(e) => Ok(e.into()),
    }
}

pub fn get_followers_list(path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/followers/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    match followers_of(&store, user_id) {
        Ok(followers) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&followers)?)
            .build()),
        Err(e) => Ok(e.into()),
    }
}
