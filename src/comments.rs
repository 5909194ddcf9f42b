//! Comments on posts. Replies nest one level deep: a reply to a reply is
//! filed under the top-level comment it belongs to.

use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::require_user_id;
use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{created, done, ok};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, parse_json, sanitize_text};
use crate::core::kv::{add_id, remove_id, KvStore, KvStoreExt};
use crate::likes::{self, LikeTarget};
use crate::models::dto::{CommentView, CreateCommentDto, UpdateCommentDto};
use crate::models::models::Comment;
use crate::posts;
use crate::users;

pub fn load_comment(store: &dyn KvStore, comment_id: u64) -> anyhow::Result<Option<Comment>> {
    store.get_json(&comment_key(comment_id))
}

fn get_comment(store: &dyn KvStore, comment_id: u64) -> Result<Comment, ApiError> {
    load_comment(store, comment_id)?.ok_or_else(|| ApiError::not_found("Comment"))
}

pub fn validate_comment(raw: &str) -> Result<String, ApiError> {
    let text = sanitize_text(raw);
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment is required".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(text)
}

/// Comments and replies on a post.
pub fn comment_count(store: &dyn KvStore, post_id: u64) -> anyhow::Result<u64> {
    Ok(store.get_ids(&post_comments_key(post_id))?.len() as u64)
}

fn comment_view(store: &dyn KvStore, comment: &Comment, viewer: Option<u64>) -> anyhow::Result<CommentView> {
    let author = users::load_user(store, comment.user_id)?;
    let target = LikeTarget::Comment(comment.id);

    Ok(CommentView {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        username: author.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
        profile_picture: author
            .as_ref()
            .map(users::profile_picture)
            .unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_string()),
        comment: comment.text.clone(),
        parent_id: comment.parent_id,
        like_count: likes::like_count(store, target)?,
        is_liked_by_current_user: likes::is_liked(store, viewer, target)?,
        created_at: comment.created_at.clone(),
        replies: Vec::new(),
    })
}

/// Top-level comments in posting order, each carrying its replies.
pub fn comment_tree(store: &dyn KvStore, post_id: u64, viewer: Option<u64>) -> anyhow::Result<Vec<CommentView>> {
    let mut tree = Vec::new();
    for id in store.get_ids(&post_comments_key(post_id))? {
        let Some(comment) = load_comment(store, id)? else {
            continue;
        };
        if comment.parent_id.is_some() {
            continue;
        }
        let mut view = comment_view(store, &comment, viewer)?;
        for reply_id in store.get_ids(&comment_replies_key(comment.id))? {
            if let Some(reply) = load_comment(store, reply_id)? {
                view.replies.push(comment_view(store, &reply, viewer)?);
            }
        }
        tree.push(view);
    }
    Ok(tree)
}

fn delete_single(store: &dyn KvStore, comment: &Comment) -> anyhow::Result<()> {
    likes::clear_target(store, LikeTarget::Comment(comment.id))?;
    remove_id(store, &post_comments_key(comment.post_id), comment.id)?;
    remove_id(store, &user_comments_key(comment.user_id), comment.id)?;
    store.delete(&comment_replies_key(comment.id))?;
    store.delete(&comment_key(comment.id))
}

/// Delete a comment together with its replies.
pub fn delete_comment_cascade(store: &dyn KvStore, comment: &Comment) -> anyhow::Result<()> {
    for reply_id in store.get_ids(&comment_replies_key(comment.id))? {
        if let Some(reply) = load_comment(store, reply_id)? {
            delete_single(store, &reply)?;
        }
    }
    if let Some(parent_id) = comment.parent_id {
        remove_id(store, &comment_replies_key(parent_id), comment.id)?;
    }
    delete_single(store, comment)
}

pub fn delete_post_comments(store: &dyn KvStore, post_id: u64) -> anyhow::Result<()> {
    for id in store.get_ids(&post_comments_key(post_id))? {
        if let Some(comment) = load_comment(store, id)? {
            delete_single(store, &comment)?;
        }
    }
    store.delete(&post_comments_key(post_id))
}

// === HTTP Handlers ===

pub fn create_comment(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let dto: CreateCommentDto = parse_json(req)?;
    let text = validate_comment(&dto.comment)?;
    let store = ctx.store();

    let post = posts::get_post(store, dto.post_id.0)?;
    let parent_id = match dto.parent_id {
        Some(parent_id) => {
            let parent = load_comment(store, parent_id.0)?
                .ok_or_else(|| ApiError::not_found("Parent comment"))?;
            if parent.post_id != post.id {
                return Err(ApiError::BadRequest(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
            Some(parent.parent_id.unwrap_or(parent.id))
        }
        None => None,
    };

    let comment = Comment {
        id: store.next_id("comment")?,
        post_id: post.id,
        user_id,
        parent_id,
        text,
        created_at: now_iso(),
        updated_at: None,
    };
    store.set_json(&comment_key(comment.id), &comment)?;
    add_id(store, &post_comments_key(post.id), comment.id)?;
    add_id(store, &user_comments_key(user_id), comment.id)?;
    if let Some(root) = parent_id {
        add_id(store, &comment_replies_key(root), comment.id)?;
    }

    info!(user_id, post_id = post.id, comment_id = comment.id, "comment added");
    created("Comment added successfully", comment_view(store, &comment, Some(user_id))?)
}

pub fn update_comment(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let dto: UpdateCommentDto = parse_json(req)?;
    let store = ctx.store();

    let mut comment = get_comment(store, dto.comment_id.0)?;
    if comment.user_id != user_id {
        return Err(ApiError::Forbidden("You can only edit your own comments".to_string()));
    }

    comment.text = validate_comment(&dto.comment)?;
    comment.updated_at = Some(now_iso());
    store.set_json(&comment_key(comment.id), &comment)?;

    ok("Comment updated successfully", comment_view(store, &comment, Some(user_id))?)
}

pub fn delete_comment(ctx: &AppContext, req: &Request, comment_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();

    let comment = get_comment(store, comment_id)?;
    let post_owner = posts::load_post(store, comment.post_id)?.map(|p| p.user_id);
    if comment.user_id != user_id && post_owner != Some(user_id) {
        return Err(ApiError::Forbidden("You can only delete your own comments".to_string()));
    }

    delete_comment_cascade(store, &comment)?;
    info!(user_id, comment_id, "comment deleted");
    done("Comment deleted successfully")
}

pub fn like_comment(ctx: &AppContext, req: &Request, comment_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    get_comment(store, comment_id)?;

    if !likes::add_like(store, user_id, LikeTarget::Comment(comment_id))? {
        return Err(ApiError::Conflict("Comment already liked".to_string()));
    }
    done("Comment liked successfully")
}

pub fn unlike_comment(ctx: &AppContext, req: &Request, comment_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    let store = ctx.store();
    get_comment(store, comment_id)?;

    if !likes::remove_like(store, user_id, LikeTarget::Comment(comment_id))? {
        return Err(ApiError::Conflict("Comment not liked".to_string()));
    }
    done("Comment unliked successfully")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;

    fn insert(store: &MemoryStore, id: u64, post_id: u64, parent_id: Option<u64>) -> Comment {
        let comment = Comment {
            id,
            post_id,
            user_id: 1,
            parent_id,
            text: format!("comment {}", id),
            created_at: now_iso(),
            updated_at: None,
        };
        store.set_json(&comment_key(id), &comment).unwrap();
        add_id(store, &post_comments_key(post_id), id).unwrap();
        add_id(store, &user_comments_key(1), id).unwrap();
        if let Some(parent) = parent_id {
            add_id(store, &comment_replies_key(parent), id).unwrap();
        }
        comment
    }

    #[test]
    fn tree_nests_replies_under_roots() {
        let store = MemoryStore::new();
        insert(&store, 1, 9, None);
        insert(&store, 2, 9, Some(1));
        insert(&store, 3, 9, None);

        let tree = comment_tree(&store, 9, None).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].parent_id, Some(1));
        assert_eq!(comment_count(&store, 9).unwrap(), 3);
    }

    #[test]
    fn deleting_a_root_takes_its_replies() {
        let store = MemoryStore::new();
        let root = insert(&store, 1, 9, None);
        insert(&store, 2, 9, Some(1));
        likes::add_like(&store, 5, LikeTarget::Comment(2)).unwrap();

        delete_comment_cascade(&store, &root).unwrap();
        assert_eq!(comment_count(&store, 9).unwrap(), 0);
        assert!(load_comment(&store, 2).unwrap().is_none());
        assert!(store.get_ids(&user_comment_likes_key(5)).unwrap().is_empty());
        assert!(store.get_ids(&user_comments_key(1)).unwrap().is_empty());
    }

    #[test]
    fn deleting_a_reply_detaches_it_from_the_root() {
        let store = MemoryStore::new();
        insert(&store, 1, 9, None);
        let reply = insert(&store, 2, 9, Some(1));
        delete_comment_cascade(&store, &reply).unwrap();
        assert!(store.get_ids(&comment_replies_key(1)).unwrap().is_empty());
        assert_eq!(comment_tree(&store, 9, None).unwrap()[0].replies.len(), 0);
    }
}
