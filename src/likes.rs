//! Like edges for posts and comments.
//!
//! Each edge is indexed twice: on the target (who liked it) and on the user
//! (what they liked), so counts and account cleanup stay cheap.

use crate::config::{comment_likes_key, post_likes_key, user_comment_likes_key, user_post_likes_key};
use crate::core::kv::{add_id, remove_id, KvStore, KvStoreExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post(u64),
    Comment(u64),
}

impl LikeTarget {
    fn target_key(&self) -> String {
        match *self {
            LikeTarget::Post(id) => post_likes_key(id),
            LikeTarget::Comment(id) => comment_likes_key(id),
        }
    }

    fn user_key(&self, user_id: u64) -> String {
        match self {
            LikeTarget::Post(_) => user_post_likes_key(user_id),
            LikeTarget::Comment(_) => user_comment_likes_key(user_id),
        }
    }

    fn id(&self) -> u64 {
        match *self {
            LikeTarget::Post(id) | LikeTarget::Comment(id) => id,
        }
    }
}

/// Record a like. Returns false when the user already liked the target.
pub fn add_like(store: &dyn KvStore, user_id: u64, target: LikeTarget) -> anyhow::Result<bool> {
    if !add_id(store, &target.target_key(), user_id)? {
        return Ok(false);
    }
    add_id(store, &target.user_key(user_id), target.id())?;
    Ok(true)
}

/// Remove a like. Returns false when there was none.
pub fn remove_like(store: &dyn KvStore, user_id: u64, target: LikeTarget) -> anyhow::Result<bool> {
    if !remove_id(store, &target.target_key(), user_id)? {
        return Ok(false);
    }
    remove_id(store, &target.user_key(user_id), target.id())?;
    Ok(true)
}

pub fn like_count(store: &dyn KvStore, target: LikeTarget) -> anyhow::Result<u64> {
    Ok(store.get_ids(&target.target_key())?.len() as u64)
}

pub fn is_liked(store: &dyn KvStore, user_id: Option<u64>, target: LikeTarget) -> anyhow::Result<bool> {
    match user_id {
        Some(uid) => Ok(store.get_ids(&target.target_key())?.contains(&uid)),
        None => Ok(false),
    }
}

/// Drop every like on a deleted target.
pub fn clear_target(store: &dyn KvStore, target: LikeTarget) -> anyhow::Result<()> {
    for user_id in store.get_ids(&target.target_key())? {
        remove_id(store, &target.user_key(user_id), target.id())?;
    }
    store.delete(&target.target_key())
}

/// Drop every like a deleted user left behind.
pub fn clear_user(store: &dyn KvStore, user_id: u64) -> anyhow::Result<()> {
    for post_id in store.get_ids(&user_post_likes_key(user_id))? {
        remove_id(store, &post_likes_key(post_id), user_id)?;
    }
    for comment_id in store.get_ids(&user_comment_likes_key(user_id))? {
        remove_id(store, &comment_likes_key(comment_id), user_id)?;
    }
    store.delete(&user_post_likes_key(user_id))?;
    store.delete(&user_comment_likes_key(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;

    #[test]
    fn likes_are_idempotent_per_user() {
        let store = MemoryStore::new();
        let post = LikeTarget::Post(1);
        assert!(add_like(&store, 7, post).unwrap());
        assert!(!add_like(&store, 7, post).unwrap());
        assert!(add_like(&store, 8, post).unwrap());
        assert_eq!(like_count(&store, post).unwrap(), 2);
        assert!(is_liked(&store, Some(7), post).unwrap());
        assert!(!is_liked(&store, None, post).unwrap());

        assert!(remove_like(&store, 7, post).unwrap());
        assert!(!remove_like(&store, 7, post).unwrap());
        assert_eq!(like_count(&store, post).unwrap(), 1);
    }

    #[test]
    fn post_and_comment_likes_are_separate() {
        let store = MemoryStore::new();
        add_like(&store, 1, LikeTarget::Post(5)).unwrap();
        assert_eq!(like_count(&store, LikeTarget::Comment(5)).unwrap(), 0);
    }

    #[test]
    fn clearing_removes_both_indexes() {
        let store = MemoryStore::new();
        add_like(&store, 1, LikeTarget::Post(5)).unwrap();
        add_like(&store, 1, LikeTarget::Comment(9)).unwrap();
        add_like(&store, 2, LikeTarget::Post(5)).unwrap();

        clear_user(&store, 1).unwrap();
        assert_eq!(like_count(&store, LikeTarget::Post(5)).unwrap(), 1);
        assert_eq!(like_count(&store, LikeTarget::Comment(9)).unwrap(), 0);

        clear_target(&store, LikeTarget::Post(5)).unwrap();
        assert!(store.get_ids(&user_post_likes_key(2)).unwrap().is_empty());
    }
}
