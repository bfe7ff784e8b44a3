use std::collections::HashMap;

use serde::Serialize;
use spin_sdk::http::{Request, Response};
use crate::models::models::{Post, User};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::store;
use crate::core::kv::KeyValue;
use crate::core::query_params::{get_page, get_string, parse_query_params};
use crate::posts::load_post;
use crate::social::{liked_by, likes_count};

/// Which posts a feed shows.
pub enum FeedView {
    /// Every post.
    Global,
    /// Posts authored by one user (by id).
    Profile(String),
    /// Posts authored by anyone the actor follows. Requires an actor.
    Following,
}

/// One page of a feed, with the metadata a client needs to paginate.
#[derive(Serialize, Debug)]
pub struct FeedPage<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub num_pages: usize,
    pub total_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// A post decorated for display: author username, like state and count.
#[derive(Serialize, Debug)]
pub struct PostView {
    pub id: String,
    pub author: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
    pub edited: bool,
    pub likes_count: usize,
    pub liked: bool,
}

/// Slice `items` into 1-based pages of `per_page`. Pages past the end are
/// empty, not an error.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> FeedPage<T> {
    let page = page.max(1);
    let total_count = items.len();
    let num_pages = std::cmp::max(1, total_count.div_ceil(per_page));
    let start = (page - 1).saturating_mul(per_page);

    let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();
    FeedPage {
        items,
        page,
        num_pages,
        total_count,
        has_next: page.saturating_mul(per_page) < total_count,
        has_previous: page > 1,
    }
}

/// Compose one page of the requested feed, newest first. Equal timestamps
/// are ordered by insertion sequence so pagination stays deterministic.
pub fn compose<S: KeyValue>(
    store: &S,
    view: &FeedView,
    actor: Option<&str>,
    page: usize,
) -> Result<FeedPage<PostView>, ApiError> {
    let author_filter: Option<Vec<String>> = match view {
        FeedView::Global => None,
        FeedView::Profile(user_id) => Some(vec![user_id.clone()]),
        FeedView::Following => {
            let actor = actor.ok_or(ApiError::Unauthorized)?;
            Some(crate::social::following_of(store, actor)?)
        }
    };

    let ids: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts: Vec<Post> = Vec::new();
    for id in &ids {
        if let Some(post) = load_post(store, id)? {
            let keep = author_filter
                .as_ref()
                .map_or(true, |authors| authors.contains(&post.user_id));
            if keep {
                posts.push(post);
            }
        }
    }

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.seq.cmp(&b.seq)));

    let page = paginate(posts, page, POSTS_PER_PAGE);
    decorate(store, page, actor)
}

fn decorate<S: KeyValue>(
    store: &S,
    page: FeedPage<Post>,
    actor: Option<&str>,
) -> Result<FeedPage<PostView>, ApiError> {
    let mut usernames: HashMap<String, String> = HashMap::new();
    let mut items = Vec::with_capacity(page.items.len());

    for post in page.items {
        let author = match usernames.get(&post.user_id) {
            Some(name) => name.clone(),
            None => {
                let name = store
                    .get_json::<User>(&user_key(&post.user_id))?
                    .map(|u| u.username)
                    .unwrap_or_default();
                usernames.insert(post.user_id.clone(), name.clone());
                name
            }
        };
        let liked = match actor {
            Some(actor) => liked_by(store, &post.id, actor)?,
            None => false,
        };
        items.push(PostView {
            id: post.id.clone(),
            author,
            author_id: post.user_id,
            content: post.content,
            created_at: post.created_at,
            edited: post.edited,
            likes_count: likes_count(store, &post.id)?,
            liked,
        });
    }

    Ok(FeedPage {
        items,
        page: page.page,
        num_pages: page.num_pages,
        total_count: page.total_count,
        has_next: page.has_next,
        has_previous: page.has_previous,
    })
}

// === HTTP handlers ===

fn page_response<T: Serialize>(page: &FeedPage<T>) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(page)?)
        .build())
}

/// GET /posts: the global feed, or one user's posts with `?user=<name>`.
pub fn list_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let params = parse_query_params(req.uri());
    let page = get_page(&params);
    let actor = crate::auth::validate_token(&req);

    let view = match get_string(&params, "user", None) {
        Some(username) => match crate::users::find_user_by_username(&store, &username) {
            Ok(Some(user)) => FeedView::Profile(user.id),
            Ok(None) => return Ok(ApiError::NotFound("User not found".to_string()).into()),
            Err(e) => return Ok(e.into()),
        },
        None => FeedView::Global,
    };

    match compose(&store, &view, actor.as_deref(), page) {
        Ok(page) => page_response(&page),
        Err(e) => Ok(e.into()),
    }
}

/// GET /feed: posts from followed users only. Requires authentication.
pub fn following_feed(req: Request) -> anyhow::Result<Response> {
    let user_id = match crate::auth::validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let params = parse_query_params(req.uri());
    let page = get_page(&params);

    match compose(&store, &FeedView::Following, Some(&user_id), page) {
        Ok(page) => page_response(&page),
        Err(e) => Ok(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;
    use crate::posts::create_post;
    use crate::social::toggle_follow;
    use crate::users::register_user;

    fn user(store: &MemoryStore, name: &str) -> String {
        register_user(store, name, &format!("{}@example.com", name), "secret", "secret")
            .unwrap()
            .0
            .id
    }

    #[test]
    fn global_feed_is_newest_first_with_stable_ties() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");

        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(create_post(&store, &alice, &format!("post {}", i)).unwrap());
        }
        // Force identical timestamps so only seq can order them.
        for post in &ids {
            let mut stored = crate::posts::load_post(&store, &post.id).unwrap().unwrap();
            stored.created_at = "2026-01-01T00:00:00+00:00".to_string();
            store.set_json(&post_key(&stored.id), &stored).unwrap();
        }

        let page = compose(&store, &FeedView::Global, None, 1).unwrap();
        let seqs: Vec<u64> = page
            .items
            .iter()
            .map(|v| crate::posts::load_post(&store, &v.id).unwrap().unwrap().seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn global_feed_orders_by_timestamp_descending() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");

        for i in 0..3 {
            let post = create_post(&store, &alice, &format!("post {}", i)).unwrap();
            let mut stored = crate::posts::load_post(&store, &post.id).unwrap().unwrap();
            stored.created_at = format!("2026-01-0{}T00:00:00+00:00", i + 1);
            store.set_json(&post_key(&stored.id), &stored).unwrap();
        }

        let page = compose(&store, &FeedView::Global, None, 1).unwrap();
        let stamps: Vec<&str> = page.items.iter().map(|v| v.created_at.as_str()).collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn pagination_metadata_is_consistent() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");
        for i in 0..25 {
            create_post(&store, &alice, &format!("post {}", i)).unwrap();
        }

        let first = compose(&store, &FeedView::Global, None, 1).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_count, 25);
        assert_eq!(first.num_pages, 3);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = compose(&store, &FeedView::Global, None, 3).unwrap();
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");
        create_post(&store, &alice, "only one").unwrap();

        let page = compose(&store, &FeedView::Global, None, 9).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 1);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn profile_feed_contains_only_that_author() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        create_post(&store, &alice, "from alice").unwrap();
        create_post(&store, &bob, "from bob").unwrap();
        create_post(&store, &alice, "alice again").unwrap();

        let page = compose(&store, &FeedView::Profile(alice.clone()), None, 1).unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page.items.iter().all(|v| v.author_id == alice));
        assert!(page.items.iter().all(|v| v.author == "alice"));
    }

    #[test]
    fn following_feed_tracks_the_follow_set() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let carol = user(&store, "carol");
        create_post(&store, &alice, "from alice").unwrap();
        create_post(&store, &carol, "from carol").unwrap();

        toggle_follow(&store, &bob, &alice).unwrap();
        let page = compose(&store, &FeedView::Following, Some(&bob), 1).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].author_id, alice);

        toggle_follow(&store, &bob, &alice).unwrap();
        let page = compose(&store, &FeedView::Following, Some(&bob), 1).unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn following_feed_without_actor_is_unauthorized() {
        let store = MemoryStore::new();
        let err = compose(&store, &FeedView::Following, None, 1).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn liked_flag_is_relative_to_the_viewer() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let post = create_post(&store, &alice, "like me").unwrap();
        crate::social::toggle_like(&store, &bob, &post.id).unwrap();

        let page = compose(&store, &FeedView::Global, Some(&bob), 1).unwrap();
        assert!(page.items[0].liked);
        assert_eq!(page.items[0].likes_count, 1);

        let page = compose(&store, &FeedView::Global, Some(&alice), 1).unwrap();
        assert!(!page.items[0].liked);

        let page = compose(&store, &FeedView::Global, None, 1).unwrap();
        assert!(!page.items[0].liked);
    }
}
