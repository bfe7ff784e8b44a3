use crate::models::models::User;
use crate::config::*;
use crate::core::helpers::hash_password;
use crate::core::kv::KeyValue;
use crate::posts::create_post;
use crate::social::{toggle_follow, toggle_like};
use uuid::Uuid;

fn create_demo_user<S: KeyValue>(store: &S, username: &str, bio: &str) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: hash_password(username)?,
        bio: Some(bio.to_string()),
    };
    store.set_json(&user_key(&id), &user)?;

    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(id)
}

/// Seed demo accounts and content so a fresh deployment has something to
/// show. Idempotent: does nothing once the demo users exist.
pub fn seed_demo_data<S: KeyValue>(store: &S) -> anyhow::Result<()> {
    if crate::users::find_user_by_username(store, "alice")?.is_some() {
        return Ok(());
    }

    let alice = create_demo_user(store, "alice", "Hello, I'm Alice!")?;
    let bob = create_demo_user(store, "bob", "Bob's corner of the internet")?;

    let hello = create_post(store, &alice, "Welcome to Ripple! This is my first post.")?;
    create_post(store, &alice, "Just finished an amazing project. Feeling productive today!")?;
    create_post(store, &bob, "Hey everyone! Looking forward to connecting with you all.")?;

    toggle_follow(store, &bob, &alice)?;
    toggle_like(store, &bob, &hello.id)?;

    Ok(())
}

/// Clear every key the service writes.
pub fn reset_db_data<S: KeyValue>(store: &S) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let posts: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();

    for id in &posts {
        store.delete(&post_key(id))?;
        store.delete(&likes_key(id))?;
    }

    for id in &users {
        store.delete(&user_key(id))?;
        store.delete(&followings_key(id))?;
        store.delete(&followers_key(id))?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in tokens {
        store.delete(&token_key(&token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(FEED_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;
    store.delete(POST_SEQ_KEY)?;

    Ok(())
}
