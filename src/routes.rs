use spin_sdk::http::{Request, Response};
use tracing::debug;

use crate::context::AppContext;
use crate::core::errors::ApiError;
use crate::core::helpers::parse_id;
use crate::core::query_params::split_uri;
use crate::core::static_server;
use crate::follow::FollowList;
use crate::media::MediaFolder;
use crate::{auth, comments, follow, images, posts, users};

/// Dispatch a request to its handler and render any error as an envelope.
pub fn handle_request(ctx: &AppContext, req: &Request) -> Response {
    let method = req.method().to_string().to_ascii_uppercase();
    let (path, _) = split_uri(req.uri());
    debug!(%method, path, "request");

    // Mutations run one at a time so id lists never lose updates.
    let _guard = matches!(method.as_str(), "POST" | "PUT" | "DELETE" | "PATCH").then(|| ctx.write_guard());

    match route(ctx, req, &method, path) {
        Ok(resp) => resp,
        Err(err) => err.into(),
    }
}

fn route(ctx: &AppContext, req: &Request, method: &str, path: &str) -> Result<Response, ApiError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let lowered: Vec<String> = segments.iter().map(|s| s.to_ascii_lowercase()).collect();
    let key: Vec<&str> = lowered.iter().map(String::as_str).collect();
    // Dynamic segments keep their original spelling.
    let arg = |i: usize| decode(segments[i]);
    let id = |i: usize| parse_id(segments[i]);

    if let [folder, _] = key.as_slice() {
        if let Some(folder) = MediaFolder::from_segment(folder) {
            match method {
                "GET" => return static_server::serve_media(ctx, req, folder, &arg(1)),
                "OPTIONS" => return Ok(static_server::preflight(ctx, req)),
                _ => {}
            }
        }
    }

    match (method, key.as_slice()) {
        // Auth
        ("POST", ["api", "auth", "register"]) => auth::register(ctx, req),
        ("POST", ["api", "auth", "login"]) => auth::login(ctx, req),
        ("POST", ["api", "auth", "logout"]) => auth::logout(ctx, req),
        ("POST", ["api", "auth", "forgot-password"]) => auth::forgot_password(ctx, req),
        ("POST", ["api", "auth", "reset-password"]) => auth::reset_password(ctx, req),

        // Users
        ("GET", ["api", "user"]) => users::get_current_user(ctx, req),
        ("GET", ["api", "user", "by-username", _]) => users::get_by_username(ctx, req, &arg(3)),
        ("PUT", ["api", "user", "update"]) => users::update_user(ctx, req),
        ("POST", ["api", "user", "update-profile-picture"]) => users::update_profile_picture(ctx, req),
        ("PUT", ["api", "user", "update-password"]) => users::update_password(ctx, req),
        ("DELETE", ["api", "user", "delete-account"]) => users::delete_account(ctx, req),

        // Posts
        ("GET", ["api", "post", "posts"]) => posts::list_posts(ctx, req),
        ("POST", ["api", "post", "posts"]) => posts::create_post(ctx, req),
        ("GET", ["api", "post", "user", "posts"]) => posts::list_user_posts(ctx, req),
        ("GET", ["api", "post", "feed"]) => posts::get_feed(ctx, req),
        ("PUT", ["api", "post", "update-description"]) => posts::update_description(ctx, req),
        ("GET", ["api", "post", "posts", _]) => posts::get_post_detail(ctx, req, id(3)?),
        ("DELETE", ["api", "post", "posts", _]) => posts::delete_post(ctx, req, id(3)?),
        ("POST", ["api", "post", "posts", _, "like"]) => posts::like_post(ctx, req, id(3)?),
        ("DELETE", ["api", "post", "posts", _, "like"]) => posts::unlike_post(ctx, req, id(3)?),

        // Comments
        ("POST", ["api", "comment", "comment"]) => comments::create_comment(ctx, req),
        ("PUT", ["api", "comment"]) => comments::update_comment(ctx, req),
        ("DELETE", ["api", "comment", _]) => comments::delete_comment(ctx, req, id(2)?),
        ("POST", ["api", "comment", _, "like"]) => comments::like_comment(ctx, req, id(2)?),
        ("DELETE", ["api", "comment", _, "like"]) => comments::unlike_comment(ctx, req, id(2)?),

        // Follows
        ("GET", ["api", "follow", "followers"]) => follow::list(ctx, req, None, FollowList::Followers),
        ("GET", ["api", "follow", "following"]) => follow::list(ctx, req, None, FollowList::Following),
        ("GET", ["api", "follow", _, "followers"]) => {
            follow::list(ctx, req, Some(id(2)?), FollowList::Followers)
        }
        ("GET", ["api", "follow", _, "following"]) => {
            follow::list(ctx, req, Some(id(2)?), FollowList::Following)
        }
        ("POST", ["api", "follow", _]) => follow::handle_follow(ctx, req, id(2)?),
        ("DELETE", ["api", "follow", _]) => follow::handle_unfollow(ctx, req, id(2)?),

        // AI images
        ("GET", ["api", "image", "generation-tokens"]) => images::generation_tokens(ctx, req),
        ("POST", ["api", "image", "generate-image"]) => images::generate_image(ctx, req),
        ("POST", ["api", "image", "upload-profile-picture"]) => images::upload_profile_picture(ctx, req),
        ("GET", ["api", "image"]) => images::list_creations(ctx, req),
        ("GET", ["api", "image", _]) => images::get_creation(ctx, req, id(2)?),
        ("POST", ["api", "image", _, "share"]) => images::share_creation(ctx, req, id(2)?),

        (_, ["api", ..]) => Err(ApiError::NotFound("Endpoint not found".to_string())),

        ("GET", _) => static_server::serve_static(path),
        _ => Err(ApiError::NotFound("Endpoint not found".to_string())),
    }
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use spin_sdk::http::Method;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).body(Vec::new()).build()
    }

    #[test]
    fn unknown_api_routes_answer_with_an_envelope() {
        let ctx = AppContext::in_memory(Config::default());
        let resp = handle_request(&ctx, &request(Method::Get, "/api/nothing/here"));
        assert_eq!(*resp.status(), 404);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["success"], false);
    }

    #[test]
    fn fixed_segments_match_case_insensitively() {
        let ctx = AppContext::in_memory(Config::default());
        let lower = handle_request(&ctx, &request(Method::Get, "/api/post/posts"));
        let mixed = handle_request(&ctx, &request(Method::Get, "/api/Post/posts?page=1"));
        assert_eq!(*lower.status(), 200);
        assert_eq!(*mixed.status(), 200);
    }

    #[test]
    fn non_numeric_ids_are_bad_requests() {
        let ctx = AppContext::in_memory(Config::default());
        let resp = handle_request(&ctx, &request(Method::Get, "/api/Post/posts/abc"));
        assert_eq!(*resp.status(), 400);
    }

    #[test]
    fn protected_routes_require_a_token() {
        let ctx = AppContext::in_memory(Config::default());
        let resp = handle_request(&ctx, &request(Method::Get, "/api/User"));
        assert_eq!(*resp.status(), 401);
    }
}
