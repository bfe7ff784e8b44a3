use spin_sdk::http::{Request, Response};

use crate::core::errors::ApiError;

pub mod config;
pub mod auth;
pub mod users;
pub mod posts;
pub mod feed;
pub mod social;
pub mod templates;
pub mod static_server;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod kv;
    pub mod query_params;
}

pub mod models {
    pub mod models;
}

// === Component entrypoint ===
// Only the wasm build exports the incoming-handler; the native binary
// links the rlib and calls `route` through its own adapter.
#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::{
        http::{IntoResponse, Request},
        http_component,
    };

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let _ = crate::core::db::seed_demo_data(&crate::core::helpers::store());
        crate::route(req)
    }
}

/// Dispatch a request to its handler. Shared by the Spin component and
/// the native development server.
pub fn route(req: Request) -> anyhow::Result<Response> {
    let path = req.path().to_string();
    let method = req.method().to_string();

    match (method.as_str(), path.as_str()) {
        ("POST", "/users") => users::create_user(req),
        ("POST", "/login") => auth::login_user(req),
        ("POST", "/logout") | ("GET", "/logout") => auth::logout_user(req),
        ("GET", "/profile") => users::get_profile(req),
        ("PUT", "/profile") => users::update_profile(req),
        ("GET", "/posts") => feed::list_posts(req),
        ("POST", "/posts") => posts::handle_create_post(req),
        ("GET", "/feed") => feed::following_feed(req),
        ("POST", "/follow") => social::handle_follow_toggle(req),
        ("POST", p) if p.starts_with("/posts/") && p.ends_with("/like") => {
            social::handle_like_toggle(req)
        }
        ("PUT", p) if p.starts_with("/posts/") && !p.ends_with("/like") => {
            posts::handle_edit_post(req)
        }
        (_, p) if p.starts_with("/posts/") => Ok(ApiError::MethodNotAllowed.into()),
        ("GET", p) if p.starts_with("/followers/") => social::get_followers_list(p),
        ("GET", p) if p.starts_with("/followings/") => social::get_followings_list(p),
        ("GET", p) if p.starts_with("/users/") && p.len() > 7 => users::get_user_details(&req, p),
        ("GET", p) if !p.contains('.') && p.len() > 1 => templates::render_user_profile(&req, p),
        ("GET", p) => static_server::serve_static(p),
        _ => Ok(Response::builder().status(404).body("Not found").build()),
    }
}
