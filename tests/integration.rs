use ripple::core::kv::MemoryStore;
use ripple::feed::{compose, FeedView};
use ripple::posts::{create_post, edit_post};
use ripple::social::{is_following, toggle_follow, toggle_like};
use ripple::users::register_user;

// The full user story: register, post, follow, read the following feed,
// and toggle a like both ways.
#[test]
fn alice_and_bob_scenario() {
    let store = MemoryStore::new();

    // alice registers and posts
    let (alice, _alice_token) =
        register_user(&store, "alice", "alice@example.com", "secret", "secret").unwrap();
    let post = create_post(&store, &alice.id, "hello world").unwrap();
    assert!(!post.edited);

    let global = compose(&store, &FeedView::Global, None, 1).unwrap();
    assert_eq!(global.items[0].id, post.id);
    assert_eq!(global.items[0].author, "alice");
    assert!(!global.items[0].edited);

    // bob registers and follows alice
    let (bob, _bob_token) =
        register_user(&store, "bob", "bob@example.com", "secret", "secret").unwrap();
    assert!(toggle_follow(&store, &bob.id, &alice.id).unwrap());
    assert!(is_following(&store, &bob.id, &alice.id).unwrap());

    // bob's following feed contains exactly alice's post
    let following = compose(&store, &FeedView::Following, Some(&bob.id), 1).unwrap();
    assert_eq!(following.total_count, 1);
    assert_eq!(following.items[0].id, post.id);

    // like toggles on, then back off, with counts from the edge set
    let (liked, count) = toggle_like(&store, &bob.id, &post.id).unwrap();
    assert!(liked);
    assert_eq!(count, 1);

    let (liked, count) = toggle_like(&store, &bob.id, &post.id).unwrap();
    assert!(!liked);
    assert_eq!(count, 0);
}

#[test]
fn edits_show_up_in_feeds_with_the_edited_flag() {
    let store = MemoryStore::new();
    let (alice, _) = register_user(&store, "alice", "alice@example.com", "secret", "secret").unwrap();
    let post = create_post(&store, &alice.id, "first draft").unwrap();

    edit_post(&store, &alice.id, &post.id, "final copy").unwrap();

    let global = compose(&store, &FeedView::Global, None, 1).unwrap();
    assert_eq!(global.items[0].content, "final copy");
    assert!(global.items[0].edited);
}

#[test]
fn feeds_paginate_deterministically_across_pages() {
    let store = MemoryStore::new();
    let (alice, _) = register_user(&store, "alice", "alice@example.com", "secret", "secret").unwrap();
    for i in 0..23 {
        create_post(&store, &alice.id, &format!("post {}", i)).unwrap();
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let feed = compose(&store, &FeedView::Global, None, page).unwrap();
        for item in &feed.items {
            seen.push(item.id.clone());
        }
    }

    assert_eq!(seen.len(), 23);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 23, "no post may repeat or vanish across pages");
}
