use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::require_user_id;
use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{done, paginated, PageRequest};
use crate::core::errors::ApiError;
use crate::core::kv::{add_id, remove_id, KvStore, KvStoreExt};
use crate::core::query_params::parse_query_params;
use crate::models::dto::UserSummary;
use crate::users;

/// Record that `follower_id` follows `followee_id`. Returns false if the edge already existed.
pub fn follow_user(store: &dyn KvStore, follower_id: u64, followee_id: u64) -> anyhow::Result<bool> {
    if !add_id(store, &followings_key(follower_id), followee_id)? {
        return Ok(false);
    }
    add_id(store, &followers_key(followee_id), follower_id)?;
    Ok(true)
}

pub fn unfollow_user(store: &dyn KvStore, follower_id: u64, followee_id: u64) -> anyhow::Result<bool> {
    if !remove_id(store, &followings_key(follower_id), followee_id)? {
        return Ok(false);
    }
    remove_id(store, &followers_key(followee_id), follower_id)?;
    Ok(true)
}

pub fn get_followings(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Vec<u64>> {
    store.get_ids(&followings_key(user_id))
}

pub fn get_followers(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Vec<u64>> {
    store.get_ids(&followers_key(user_id))
}

pub fn is_following(store: &dyn KvStore, follower_id: u64, followee_id: u64) -> anyhow::Result<bool> {
    Ok(get_followings(store, follower_id)?.contains(&followee_id))
}

pub fn follower_count(store: &dyn KvStore, user_id: u64) -> anyhow::Result<u64> {
    Ok(get_followers(store, user_id)?.len() as u64)
}

pub fn following_count(store: &dyn KvStore, user_id: u64) -> anyhow::Result<u64> {
    Ok(get_followings(store, user_id)?.len() as u64)
}

/// Drop every edge touching a deleted user.
pub fn clear_user(store: &dyn KvStore, user_id: u64) -> anyhow::Result<()> {
    for followee in get_followings(store, user_id)? {
        remove_id(store, &followers_key(followee), user_id)?;
    }
    for follower in get_followers(store, user_id)? {
        remove_id(store, &followings_key(follower), user_id)?;
    }
    store.delete(&followings_key(user_id))?;
    store.delete(&followers_key(user_id))
}

fn summaries(store: &dyn KvStore, ids: &[u64]) -> anyhow::Result<Vec<UserSummary>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = users::load_user(store, *id)? {
            out.push(users::summary(&user));
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowList {
    Followers,
    Following,
}

// === HTTP Handlers ===

pub fn handle_follow(ctx: &AppContext, req: &Request, followee_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    if user_id == followee_id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }

    let store = ctx.store();
    if users::load_user(store, followee_id)?.is_none() {
        return Err(ApiError::not_found("User"));
    }
    if !follow_user(store, user_id, followee_id)? {
        return Err(ApiError::Conflict("Already following".to_string()));
    }

    info!(user_id, followee_id, "followed");
    done("User followed successfully")
}

pub fn handle_unfollow(ctx: &AppContext, req: &Request, followee_id: u64) -> Result<Response, ApiError> {
    let user_id = require_user_id(ctx, req)?;
    if !unfollow_user(ctx.store(), user_id, followee_id)? {
        return Err(ApiError::Conflict("Not following".to_string()));
    }

    info!(user_id, followee_id, "unfollowed");
    done("User unfollowed successfully")
}

/// Followers or followings of `user_id`, or of the caller when `None`.
pub fn list(ctx: &AppContext, req: &Request, user_id: Option<u64>, which: FollowList) -> Result<Response, ApiError> {
    let store = ctx.store();
    let user_id = match user_id {
        Some(id) => {
            if users::load_user(store, id)?.is_none() {
                return Err(ApiError::not_found("User"));
            }
            id
        }
        None => require_user_id(ctx, req)?,
    };
    let page = PageRequest::from_params(&parse_query_params(req.uri()), FOLLOWS_PER_PAGE);

    let (ids, message) = match which {
        FollowList::Followers => (get_followers(store, user_id)?, "Followers retrieved successfully"),
        FollowList::Following => (get_followings(store, user_id)?, "Following retrieved successfully"),
    };
    let users = summaries(store, page.slice(&ids))?;
    paginated(message, users, page, ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;

    #[test]
    fn edges_are_unique_and_indexed_both_ways() {
        let store = MemoryStore::new();
        assert!(follow_user(&store, 1, 2).unwrap());
        assert!(!follow_user(&store, 1, 2).unwrap());
        assert!(is_following(&store, 1, 2).unwrap());
        assert!(!is_following(&store, 2, 1).unwrap());
        assert_eq!(follower_count(&store, 2).unwrap(), 1);
        assert_eq!(following_count(&store, 1).unwrap(), 1);

        assert!(unfollow_user(&store, 1, 2).unwrap());
        assert!(!unfollow_user(&store, 1, 2).unwrap());
        assert_eq!(follower_count(&store, 2).unwrap(), 0);
    }

    #[test]
    fn clearing_a_user_removes_their_edges_elsewhere() {
        let store = MemoryStore::new();
        follow_user(&store, 1, 2).unwrap();
        follow_user(&store, 3, 1).unwrap();
        clear_user(&store, 1).unwrap();
        assert_eq!(follower_count(&store, 2).unwrap(), 0);
        assert_eq!(following_count(&store, 3).unwrap(), 0);
    }
}
