use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::auth::{self, require_user};
use crate::comments;
use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{done, ok};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, non_empty, parse_json, verify_password};
use crate::core::kv::{KvStore, KvStoreExt};
use crate::core::multipart::MultipartForm;
use crate::follow;
use crate::likes;
use crate::media::{self, MediaFolder, UploadKind};
use crate::models::dto::{
    DeleteAccountRequest, PasswordChanged, UpdatePasswordDto, UpdateUserDto, UserProfile, UserSummary,
};
use crate::models::models::{Comment, Creation, Post, User};
use crate::posts;

pub fn load_user(store: &dyn KvStore, user_id: u64) -> anyhow::Result<Option<User>> {
    store.get_json(&user_key(user_id))
}

pub fn find_by_username(store: &dyn KvStore, username: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<u64>(&user_name_key(username))? {
        Some(id) => load_user(store, id),
        None => Ok(None),
    }
}

pub fn save_user(store: &dyn KvStore, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(user.id), user)
}

pub fn profile_picture(user: &User) -> String {
    user.profile_picture
        .clone()
        .unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_string())
}

pub fn summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        name: user.name.clone(),
        surname: user.surname.clone(),
        profile_picture: profile_picture(user),
    }
}

/// Profile as seen by `viewer`. Private fields are only filled in for the owner.
pub fn build_profile(ctx: &AppContext, user: &User, viewer: Option<u64>) -> Result<UserProfile, ApiError> {
    let store = ctx.store();
    let own = viewer == Some(user.id);

    let post_ids = store.get_ids(&user_posts_key(user.id))?;
    let mut posts = Vec::with_capacity(post_ids.len());
    for id in &post_ids {
        if let Some(post) = posts::load_post(store, *id)? {
            posts.push(posts::post_view(store, &post, viewer)?);
        }
    }

    let is_followed = match viewer {
        Some(viewer_id) if !own => Some(follow::is_following(store, viewer_id, user.id)?),
        _ => None,
    };

    Ok(UserProfile {
        id: user.id,
        username: user.username.clone(),
        name: user.name.clone(),
        surname: user.surname.clone(),
        middle_name: user.middle_name.clone(),
        email: own.then(|| user.email.clone()),
        phone_number: if own { user.phone_number.clone() } else { None },
        city: user.city.clone(),
        state: user.state.clone(),
        country: user.country.clone(),
        created_at: user.created_at.clone(),
        profile_picture: profile_picture(user),
        post_count: posts.len() as u64,
        followers: follow::follower_count(store, user.id)?,
        following: follow::following_count(store, user.id)?,
        generation_tokens: own.then_some(user.generation_tokens),
        is_followed_by_current_user: is_followed,
        posts,
    })
}

/// Remove a user and everything that hangs off the account.
pub fn delete_user_cascade(store: &dyn KvStore, user: &User) -> anyhow::Result<()> {
    for post_id in store.get_ids(&user_posts_key(user.id))? {
        if let Some(post) = store.get_json::<Post>(&post_key(post_id))? {
            posts::delete_post_cascade(store, &post)?;
        }
    }
    store.delete(&user_posts_key(user.id))?;

    // Comments on other people's posts.
    for comment_id in store.get_ids(&user_comments_key(user.id))? {
        if let Some(comment) = store.get_json::<Comment>(&comment_key(comment_id))? {
            comments::delete_comment_cascade(store, &comment)?;
        }
    }
    store.delete(&user_comments_key(user.id))?;

    likes::clear_user(store, user.id)?;
    follow::clear_user(store, user.id)?;

    for creation_id in store.get_ids(&user_creations_key(user.id))? {
        if let Some(creation) = store.get_json::<Creation>(&creation_key(creation_id))? {
            media::delete_file(store, MediaFolder::AiPics, &creation.image_url)?;
        }
        store.delete(&creation_key(creation_id))?;
    }
    store.delete(&user_creations_key(user.id))?;

    if let Some(picture) = &user.profile_picture {
        media::delete_file(store, MediaFolder::ProfilePics, picture)?;
    }

    auth::revoke_tokens(store, user.id, None)?;
    auth::clear_reset_token(store, user.id)?;
    store.delete(&user_name_key(&user.username))?;
    store.delete(&user_email_key(&user.email))?;
    store.delete(&user_key(user.id))
}

// === HTTP Handlers ===

pub fn get_current_user(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    ok("User retrieved successfully", build_profile(ctx, &user, Some(user.id))?)
}

pub fn get_by_username(ctx: &AppContext, req: &Request, username: &str) -> Result<Response, ApiError> {
    let viewer = auth::optional_user_id(ctx, req)?;
    let user = find_by_username(ctx.store(), username)?.ok_or_else(|| ApiError::not_found("User"))?;
    ok("User retrieved successfully", build_profile(ctx, &user, viewer)?)
}

pub fn update_user(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let mut user = require_user(ctx, req)?;
    let dto: UpdateUserDto = parse_json(req)?;

    if let Some(name) = &dto.name {
        user.name = auth::validate_name("Name", name)?;
    }
    if let Some(surname) = &dto.surname {
        user.surname = auth::validate_name("Surname", surname)?;
    }
    // Present but empty clears the field.
    let optional = [
        (&dto.middle_name, &mut user.middle_name),
        (&dto.phone_number, &mut user.phone_number),
        (&dto.city, &mut user.city),
        (&dto.state, &mut user.state),
        (&dto.country, &mut user.country),
    ];
    for (incoming, field) in optional {
        if let Some(value) = incoming {
            *field = non_empty(Some(value));
        }
    }

    save_user(ctx.store(), &user)?;
    info!(user_id = user.id, "profile updated");
    ok("Profile updated successfully", build_profile(ctx, &user, Some(user.id))?)
}

pub fn update_profile_picture(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let mut user = require_user(ctx, req)?;
    let form = MultipartForm::parse(req)?;
    let file = form
        .file("profilePicture")
        .ok_or_else(|| ApiError::BadRequest("Profile picture is required".to_string()))?;

    let ext = media::validate_upload(UploadKind::ProfilePicture, &file.file_name, &file.data)?;
    let store = ctx.store();
    let name = media::store_file(store, MediaFolder::ProfilePics, ext, &file.data)?;

    if let Some(old) = user.profile_picture.replace(name) {
        if old != DEFAULT_PROFILE_PICTURE {
            media::delete_file(store, MediaFolder::ProfilePics, &old)?;
        }
    }
    save_user(store, &user)?;

    info!(user_id = user.id, "profile picture updated");
    ok("Profile picture updated successfully", build_profile(ctx, &user, Some(user.id))?)
}

pub fn update_password(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let mut user = require_user(ctx, req)?;
    let dto: UpdatePasswordDto = parse_json(req)?;

    if !verify_password(&dto.current_password, &user.password) {
        warn!(user_id = user.id, "password change with wrong current password");
        return Err(ApiError::BadRequest("Current password is incorrect".to_string()));
    }
    auth::validate_password(&dto.new_password)?;

    let store = ctx.store();
    user.password = hash_password(&dto.new_password)?;
    save_user(store, &user)?;

    auth::revoke_tokens(store, user.id, None)?;
    let token = auth::issue_token(store, user.id, auth::session_max_age(ctx.config()))?;

    info!(user_id = user.id, "password changed");
    ok("Password updated successfully", PasswordChanged { token })
}

pub fn delete_account(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    let body: DeleteAccountRequest = parse_json(req)?;

    if !verify_password(body.password(), &user.password) {
        warn!(user_id = user.id, "account deletion with wrong password");
        return Err(ApiError::BadRequest("Password is incorrect".to_string()));
    }

    delete_user_cascade(ctx.store(), &user)?;
    info!(user_id = user.id, username = %user.username, "account deleted");
    done("Account deleted successfully")
}
