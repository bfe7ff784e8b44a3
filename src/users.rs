use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use ammonia::Builder;
use crate::models::models::User;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{store, hash_password, verify_password, validate_uuid};
use crate::core::kv::KeyValue;
use crate::social::{followers_count, following_count, is_following};

/// Strip all HTML, leaving plain text.
fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

pub fn find_user_by_username<S: KeyValue>(store: &S, username: &str) -> Result<Option<User>, ApiError> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in users {
        if let Some(user) = store.get_json::<User>(&user_key(&id))? {
            if user.username == username {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

/// Register a new account and log it straight in. Returns the user plus a
/// fresh session token.
pub fn register_user<S: KeyValue>(
    store: &S,
    username: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<(User, String), ApiError> {
    // Sanitize first: what gets validated is what gets stored, so markup
    // cannot pad an otherwise empty or too-short username.
    let username = sanitize_text(username);

    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest("Username must be 3-50 characters".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest("Password must be at least 3 characters".to_string()));
    }
    if password != confirmation {
        return Err(ApiError::BadRequest("Passwords must match.".to_string()));
    }

    if find_user_by_username(store, &username)?.is_some() {
        return Err(ApiError::Conflict("Username already taken.".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username,
        email: sanitize_text(email),
        password: hash_password(password)?,
        bio: None,
    };
    store.set_json(&user_key(&id), &user)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(id);
    store.set_json(USERS_LIST_KEY, &users)?;

    let token = crate::auth::issue_token(store, &user.id)?;
    Ok((user, token))
}

/// Public profile JSON: identity plus social counts, and the viewer's
/// follow state when a viewer is present.
pub fn build_profile_json<S: KeyValue>(
    store: &S,
    user: &User,
    viewer: Option<&str>,
) -> Result<serde_json::Value, ApiError> {
    let viewer_follows = match viewer {
        Some(actor) if actor != user.id => is_following(store, actor, &user.id)?,
        _ => false,
    };

    Ok(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "bio": user.bio.as_ref().unwrap_or(&String::new()),
        "followers_count": followers_count(store, &user.id)?,
        "following_count": following_count(store, &user.id)?,
        "is_following": viewer_follows,
    }))
}

// === HTTP handlers ===

pub fn create_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = body["username"].as_str().unwrap_or("");
    let email = body["email"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");
    let confirmation = body["confirmation"].as_str().unwrap_or("");

    match register_user(&store, username, email, password, confirmation) {
        Ok((user, token)) => {
            tracing::info!(user_id = %user.id, "user registered");
            let resp = serde_json::json!({
                "id": user.id,
                "username": user.username,
                "email": user.email,
                "token": token,
            });
            Ok(Response::builder()
                .status(201)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        Err(e) => Ok(e.into()),
    }
}

pub fn get_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match crate::auth::validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    match store.get_json::<User>(&user_key(&user_id))? {
        Some(user) => {
            let profile = build_profile_json(&store, &user, Some(&user_id))?;
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&profile)?)
                .build())
        }
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

pub fn get_user_details(req: &Request, path: &str) -> anyhow::Result<Response> {
    let user_id = path.trim_start_matches("/users/");

    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    let viewer = crate::auth::validate_token(req);
    match store.get_json::<User>(&user_key(user_id))? {
        Some(user) => {
            let profile = build_profile_json(&store, &user, viewer.as_deref())?;
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&profile)?)
                .build())
        }
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match crate::auth::validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let key = user_key(&user_id);
    let mut user = match store.get_json::<User>(&key)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let mut password_changed = false;

    if let Some(bio) = value["bio"].as_str() {
        if bio.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()).into());
        }
        let sanitized_bio = sanitize_text(bio);
        user.bio = if sanitized_bio.is_empty() { None } else { Some(sanitized_bio) };
    }

    if let Some(new_password) = value["new_password"].as_str() {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Ok(ApiError::BadRequest("Password must be 3+ characters".to_string()).into());
        }
        let old_password = value["old_password"].as_str().unwrap_or_default();
        if !verify_password(old_password, &user.password) {
            return Ok(ApiError::Unauthorized.into());
        }
        user.password = hash_password(new_password)?;
        password_changed = true;
    }

    store.set_json(&key, &user)?;

    let mut response_data = build_profile_json(&store, &user, Some(&user_id))?;
    if password_changed {
        // Every existing session dies with the old password.
        if let Err(e) = crate::auth::invalidate_user_tokens(&store, &user_id) {
            return Ok(e.into());
        }
        let new_token = match crate::auth::issue_token(&store, &user_id) {
            Ok(token) => token,
            Err(e) => return Ok(e.into()),
        };
        tracing::info!(user_id = %user_id, "password changed, sessions revoked");
        response_data["token"] = serde_json::Value::String(new_token);
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&response_data)?)
        .build())
}
