use spin_sdk::http::{Request, Response};
use rust_embed::RustEmbed;
use crate::models::models::User;
use crate::core::errors::ApiError;
use crate::core::helpers::store;
use crate::social::{followers_count, following_count};

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// Server-rendered profile page: /<username>.
pub fn render_user_profile(_req: &Request, path: &str) -> anyhow::Result<Response> {
    let username = path.trim_start_matches('/');
    let store = store();

    let user: User = match crate::users::find_user_by_username(&store, username) {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(ApiError::NotFound("User not found".to_string()).into()),
        Err(e) => return Ok(e.into()),
    };

    let template = Assets::get("profile.html")
        .ok_or_else(|| anyhow::anyhow!("Profile template not found"))?
        .data
        .to_vec();

    let mut html = String::from_utf8(template)?;

    let escaped_username = html_escape::encode_text(&user.username).to_string();
    let escaped_user_id = html_escape::encode_text(&user.id).to_string();

    html = html.replace("PROFILE_USERNAME", &escaped_username);
    html = html.replace("PROFILE_USER_ID", &escaped_user_id);
    html = html.replace("FOLLOWERS_COUNT", &followers_count(&store, &user.id)?.to_string());
    html = html.replace("FOLLOWING_COUNT", &following_count(&store, &user.id)?.to_string());

    let bio_section = user.bio.as_ref()
        .map(|bio| format!(
            r#"<div class="profile-field">
                <div class="profile-field-label">Bio</div>
                <div class="profile-field-value">{}</div>
            </div>"#,
            html_escape::encode_text(bio)
        ))
        .unwrap_or_default();

    html = html.replace("PROFILE_BIO", &bio_section);

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build())
}
