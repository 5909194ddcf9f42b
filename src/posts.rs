use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::{optional_user_id, require_user_id};
use crate::comments;
use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{created, done, ok, paginated, PageRequest};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, parse_json, sanitize_text};
use crate::core::kv::{prepend_id, remove_id, KvStore, KvStoreExt};
use crate::core::multipart::MultipartForm;
use crate::core::query_params::parse_query_params;
use crate::follow;
use crate::likes::{self, LikeTarget};
use crate::media::{self, MediaFolder, UploadKind};
use crate::models::dto::{PostDetail, PostView, UpdatePostDto};
use crate::models::models::Post;
use crate::users;

pub fn load_post(store: &dyn KvStore, post_id: u64) -> anyhow::Result<Option<Post>> {
    store.get_json(&post_key(post_id))
}

pub fn get_post(store: &dyn KvStore, post_id: u64) -> Result<Post, ApiError> {
    load_post(store, post_id)?.ok_or_else(|| ApiError::not_found("Post"))
}

pub fn validate_description(raw: &str) -> Result<String, ApiError> {
    let description = sanitize_text(raw);
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description is required".to_string()));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(description)
}

pub fn post_view(store: &dyn KvStore, post: &Post, viewer: Option<u64>) -> anyhow::Result<PostView> {
    let author = users::load_user(store, post.user_id)?;
    let (username, name, surname, profile_picture) = match &author {
        Some(u) => (u.username.clone(), u.name.clone(), u.surname.clone(), users::profile_picture(u)),
        None => (String::new(), String::new(), String::new(), DEFAULT_PROFILE_PICTURE.to_string()),
    };
    let target = LikeTarget::Post(post.id);

    Ok(PostView {
        id: post.id,
        user_id: post.user_id,
        username,
        name,
        surname,
        profile_picture,
        description: post.description.clone(),
        image_url: post.image_url.clone(),
        like_count: likes::like_count(store, target)?,
        comment_count: comments::comment_count(store, post.id)?,
        is_liked_by_current_user: likes::is_liked(store, viewer, target)?,
        created_at: post.created_at.clone(),
        updated_at: post.updated_at.clone(),
    })
}

/// Persist a new post and put it at the top of the global and author feeds.
pub fn insert_post(store: &dyn KvStore, user_id: u64, description: String, image_url: String) -> anyhow::Result<Post> {
    let post = Post {
        id: store.next_id("post")?,
        user_id,
        description,
        image_url,
        created_at: now_iso(),
        updated_at: None,
    };
    store.set_json(&post_key(post.id), &post)?;
    prepend_id(store, FEED_KEY, post.id)?;
    prepend_id(store, &user_posts_key(user_id), post.id)?;
    Ok(post)
}

pub fn delete_post_cascade(store: &dyn KvStore, post: &Post) -> anyhow::Result<()> {
    comments::delete_post_comments(store, post.id)?;
    likes::clear_target(store, LikeTarget::Post(post.id))?;
    remove_id(store, FEED_KEY, post.id)?;
    remove_id(store, &user_posts_key(post.user_id), post.id)?;
    media::delete_file(store, MediaFolder::PostPics, &post.image_url)?;
    store.delete(&post_key(post.id))
}

fn views_for(store: &dyn KvStore, ids: &[u64], viewer: Option<u64>) -> anyhow::Result<Vec<PostView>> {
    let mut views = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = load_post(store, *id)? {
            views.push(post_view(store, &post, viewer)?);
        }
    }
    Ok(views)
}

fn page_of(req: &Request) -> PageRequest {
    PageRequest::from_params(&parse_query_params(req.uri()), POSTS_PER_PAGE)
}

// === HTTP Handlers ===

pub fn list_posts(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let viewer = optional_user_id(ctx, req)?;
    let store = ctx.store();
    let page = page_of(req);

    let ids = store.get_ids(FEED_KEY)?;
    let posts = views_for(store, page.slice(&ids), viewer)?;
    paginated("Posts retrieved successfully", posts, page, ids.len())
}

pub fn list_user_posts(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    let page = page_of(req);

    let ids = store.get_ids(&user_posts_key(user_id))?;
    let posts = views_for(store, page.slice(&ids), Some(user_id))?;
    paginated("Posts retrieved successfully", posts, page, ids.len())
}

/// Posts by the accounts the caller follows, newest first.
pub fn get_feed(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    let page = page_of(req);

    let followings = follow::get_followings(store, user_id)?;
    let mut ids = Vec::new();
    for id in store.get_ids(FEED_KEY)? {
        if let Some(post) = load_post(store, id)? {
            if followings.contains(&post.user_id) {
                ids.push(id);
            }
        }
    }

    let posts = views_for(store, page.slice(&ids), Some(user_id))?;
    paginated("Feed retrieved successfully", posts, page, ids.len())
}

pub fn create_post(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let form = MultipartForm::parse(req)?;

    let description = validate_description(form.text("description").unwrap_or_default())?;
    let picture = form
        .file("picture")
        .ok_or_else(|| ApiError::BadRequest("Picture is required".to_string()))?;
    let ext = media::validate_upload(UploadKind::PostPicture, &picture.file_name, &picture.data)?;

    let store = ctx.store();
    let image_url = media::store_file(store, MediaFolder::PostPics, ext, &picture.data)?;
    let post = insert_post(store, user_id, description, image_url)?;

    info!(user_id, post_id = post.id, "post created");
    created("Post created successfully", post_view(store, &post, Some(user_id))?)
}

pub fn get_post_detail(ctx: &AppContext, req: &Request, post_id: u64) -> Result<Response, ApiError> {
    let viewer = optional_user_id(ctx, req)?;
    let store = ctx.store();
    let post = get_post(store, post_id)?;

    let detail = PostDetail {
        post: post_view(store, &post, viewer)?,
        comments: comments::comment_tree(store, post.id, viewer)?,
    };
    ok("Post retrieved successfully", detail)
}

pub fn like_post(ctx: &AppContext, req: &Request, post_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    get_post(store, post_id)?;

    if !likes::add_like(store, user_id, LikeTarget::Post(post_id))? {
        return Err(ApiError::Conflict("Post already liked".to_string()));
    }
    done("Post liked successfully")
}

pub fn unlike_post(ctx: &AppContext, req: &Request, post_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    get_post(store, post_id)?;

    if !likes::remove_like(store, user_id, LikeTarget::Post(post_id))? {
        return Err(ApiError::Conflict("Post not liked".to_string()));
    }
    done("Post unliked successfully")
}

pub fn update_description(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let dto: UpdatePostDto = parse_json(req)?;
    let store = ctx.store();

    let mut post = get_post(store, dto.post_id.0)?;
    if post.user_id != user_id {
        return Err(ApiError::Forbidden("You can only edit your own posts".to_string()));
    }

    post.description = validate_description(&dto.description)?;
    post.updated_at = Some(now_iso());
    store.set_json(&post_key(post.id), &post)?;

    ok("Post updated successfully", post_view(store, &post, Some(user_id))?)
}

pub fn delete_post(ctx: &AppContext, req: &Request, post_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();

    let post = get_post(store, post_id)?;
    if post.user_id != user_id {
        return Err(ApiError::Forbidden("You can only delete your own posts".to_string()));
    }

    delete_post_cascade(store, &post)?;
    info!(user_id, post_id, "post deleted");
    done("Post deleted successfully")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;

    #[test]
    fn descriptions_are_required_and_bounded() {
        assert_eq!(validate_description("  <p>sunset</p> ").unwrap(), "sunset");
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"a".repeat(MAX_DESCRIPTION_LENGTH + 1)).is_err());
    }

    #[test]
    fn inserted_posts_lead_both_feeds_and_cascade_away() {
        let store = MemoryStore::new();
        let first = insert_post(&store, 1, "one".into(), "a.png".into()).unwrap();
        let second = insert_post(&store, 1, "two".into(), "b.png".into()).unwrap();
        assert_eq!(store.get_ids(FEED_KEY).unwrap(), vec![second.id, first.id]);
        assert_eq!(store.get_ids(&user_posts_key(1)).unwrap(), vec![second.id, first.id]);

        likes::add_like(&store, 2, LikeTarget::Post(second.id)).unwrap();
        delete_post_cascade(&store, &second).unwrap();
        assert_eq!(store.get_ids(FEED_KEY).unwrap(), vec![first.id]);
        assert!(load_post(&store, second.id).unwrap().is_none());
        assert!(store.get_ids(&user_post_likes_key(2)).unwrap().is_empty());
    }
}
