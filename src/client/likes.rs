//! Optimistic like toggling.
//!
//! Local state flips first so the UI responds at once. If the server says the
//! like already exists (or is already gone), the opposite call is sent to
//! bring it in line with the user's click, and the post is always re-fetched
//! so the server has the last word.

use super::{ApiClient, ClientError};
use crate::models::dto::{CommentView, PostDetail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Like,
    Unlike,
}

/// Which call undoes a like conflict reported by the server, if any.
fn recovery_for(message: &str) -> Option<Recovery> {
    let message = message.to_lowercase();
    if message.contains("already liked") {
        Some(Recovery::Unlike)
    } else if message.contains("not liked") {
        Some(Recovery::Like)
    } else {
        None
    }
}

fn flip(liked: &mut bool, count: &mut u64) {
    *count = if *liked { count.saturating_sub(1) } else { *count + 1 };
    *liked = !*liked;
}

/// Toggle the like on `post` and reconcile with the server.
///
/// Returns the server's message when the call did not go through as sent,
/// for the caller to show. A 401 rolls back the local flip and is returned
/// as an error.
pub async fn toggle_post_like(client: &ApiClient, post: &mut PostDetail) -> Result<Option<String>, ClientError> {
    let id = post.post.id;
    let was_liked = post.post.is_liked_by_current_user;
    flip(&mut post.post.is_liked_by_current_user, &mut post.post.like_count);

    let attempt = if was_liked {
        client.unlike_post(id).await
    } else {
        client.like_post(id).await
    };

    let mut notice = None;
    match attempt {
        Ok(_) => {}
        Err(ClientError::Unauthorized) => {
            flip(&mut post.post.is_liked_by_current_user, &mut post.post.like_count);
            return Err(ClientError::Unauthorized);
        }
        Err(err) => {
            let message = err.to_string();
            let recovered = match recovery_for(&message) {
                Some(Recovery::Unlike) => client.unlike_post(id).await.map(|_| ()),
                Some(Recovery::Like) => client.like_post(id).await.map(|_| ()),
                None => Ok(()),
            };
            notice = Some(match recovered {
                Ok(()) => message,
                Err(e) => e.to_string(),
            });
        }
    }

    match client.post(id).await {
        Ok(resp) => {
            if let Some(fresh) = resp.data {
                *post = fresh;
            }
        }
        Err(e) => {
            notice.get_or_insert_with(|| e.to_string());
        }
    }
    Ok(notice)
}

/// Toggle the like on a comment of `post`, then refresh the whole post.
pub async fn toggle_comment_like(
    client: &ApiClient,
    post: &mut PostDetail,
    comment_id: u64,
) -> Result<Option<String>, ClientError> {
    let Some(comment) = find_comment(&mut post.comments, comment_id) else {
        return Ok(Some("Comment not found".to_string()));
    };
    let was_liked = comment.is_liked_by_current_user;
    flip(&mut comment.is_liked_by_current_user, &mut comment.like_count);

    let attempt = if was_liked {
        client.unlike_comment(comment_id).await
    } else {
        client.like_comment(comment_id).await
    };

    let mut notice = None;
    match attempt {
        Ok(_) => {}
        Err(ClientError::Unauthorized) => {
            if let Some(comment) = find_comment(&mut post.comments, comment_id) {
                flip(&mut comment.is_liked_by_current_user, &mut comment.like_count);
            }
            return Err(ClientError::Unauthorized);
        }
        Err(err) => {
            let message = err.to_string();
            let recovered = match recovery_for(&message) {
                Some(Recovery::Unlike) => client.unlike_comment(comment_id).await.map(|_| ()),
                Some(Recovery::Like) => client.like_comment(comment_id).await.map(|_| ()),
                None => Ok(()),
            };
            notice = Some(match recovered {
                Ok(()) => message,
                Err(e) => e.to_string(),
            });
        }
    }

    match client.post(post.post.id).await {
        Ok(resp) => {
            if let Some(fresh) = resp.data {
                *post = fresh;
            }
        }
        Err(e) => {
            notice.get_or_insert_with(|| e.to_string());
        }
    }
    Ok(notice)
}

fn find_comment(comments: &mut [CommentView], comment_id: u64) -> Option<&mut CommentView> {
    for comment in comments.iter_mut() {
        if comment.id == comment_id {
            return Some(comment);
        }
        if let Some(reply) = comment.replies.iter_mut().find(|r| r.id == comment_id) {
            return Some(reply);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_the_opposite_call() {
        assert_eq!(recovery_for("Post already liked"), Some(Recovery::Unlike));
        assert_eq!(recovery_for("Comment not liked"), Some(Recovery::Like));
        assert_eq!(recovery_for("Post not found"), None);
    }

    #[test]
    fn flipping_adjusts_the_count() {
        let (mut liked, mut count) = (false, 0);
        flip(&mut liked, &mut count);
        assert!(liked);
        assert_eq!(count, 1);
        flip(&mut liked, &mut count);
        flip(&mut liked, &mut count);
        flip(&mut liked, &mut count);
        assert_eq!((liked, count), (false, 0));

        let (mut liked, mut count) = (true, 0);
        flip(&mut liked, &mut count);
        assert_eq!(count, 0);
    }
}
