use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::{User, TokenData};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{store, now_iso, verify_password};
use crate::core::kv::KeyValue;

/// Issue a fresh bearer token for `user_id` and record it in the token
/// index so password changes can revoke it later.
pub fn issue_token<S: KeyValue>(store: &S, user_id: &str) -> Result<String, ApiError> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

pub fn authenticate<S: KeyValue>(store: &S, username: &str, password: &str) -> Result<User, ApiError> {
    match crate::users::find_user_by_username(store, username)? {
        Some(user) if verify_password(password, &user.password) => Ok(user),
        _ => Err(ApiError::InvalidCredentials),
    }
}

/// Delete every token belonging to `user_id`.
pub fn invalidate_user_tokens<S: KeyValue>(store: &S, user_id: &str) -> Result<(), ApiError> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut kept = Vec::new();

    for token in tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => store.delete(&key)?,
            _ => kept.push(token),
        }
    }

    store.set_json(TOKENS_LIST_KEY, &kept)?;
    Ok(())
}

/// Resolve a token to its user id, rejecting expired tokens and tokens
/// whose user no longer exists.
pub fn actor_for_token<S: KeyValue>(store: &S, token: &str) -> Option<String> {
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let now = chrono::Utc::now();
        let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > token_expiration_hours() {
            return None;
        }
    }

    store.get_json::<User>(&user_key(&data.user_id)).ok()??;
    Some(data.user_id)
}

fn bearer_token(req: &Request) -> Option<&str> {
    let auth_header = req.header("Authorization")?.as_str()?;
    auth_header.strip_prefix("Bearer ")
}

/// The actor issuing this request, or None if unauthenticated.
pub fn validate_token(req: &Request) -> Option<String> {
    actor_for_token(&store(), bearer_token(req)?)
}

// === HTTP handlers ===

pub fn login_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let creds: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = creds["username"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    let user = match authenticate(&store, username, password) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(username, "login rejected");
            return Ok(e.into());
        }
    };

    let token = match issue_token(&store, &user.id) {
        Ok(token) => token,
        Err(e) => return Ok(e.into()),
    };
    tracing::info!(user_id = %user.id, "user logged in");

    let resp = serde_json::json!({
        "token": token,
        "user_id": user.id
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn logout_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let token = match bearer_token(&req) {
        Some(token) => token.to_string(),
        None => return Ok(ApiError::Unauthorized.into()),
    };

    store.delete(&token_key(&token))?;
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let tokens: Vec<String> = tokens.into_iter().filter(|t| *t != token).collect();
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    let resp = serde_json::json!({
        "message": "Logged out successfully"
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;
    use crate::users::register_user;

    #[test]
    fn tokens_resolve_to_their_user_until_invalidated() {
        let store = MemoryStore::new();
        let (user, _) = register_user(&store, "carol", "carol@example.com", "secret", "secret").unwrap();

        let token = issue_token(&store, &user.id).unwrap();
        assert_eq!(actor_for_token(&store, &token), Some(user.id.clone()));

        invalidate_user_tokens(&store, &user.id).unwrap();
        assert_eq!(actor_for_token(&store, &token), None);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let store = MemoryStore::new();
        register_user(&store, "carol", "carol@example.com", "secret", "secret").unwrap();

        let err = authenticate(&store, "carol", "nope").unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let err = authenticate(&store, "nobody", "secret").unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }
}
