//! AI creations: generation against the per-user token balance, the
//! creator's gallery and sharing a creation as a post.

use spin_sdk::http::{Request, Response};
use tracing::{error, info};

use crate::auth::require_user;
use crate::config::*;
use crate::context::AppContext;
use crate::core::envelope::{created, ok, paginated, PageRequest};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, parse_json, sanitize_text};
use crate::core::kv::{prepend_id, KvStore, KvStoreExt};
use crate::core::multipart::MultipartForm;
use crate::core::query_params::parse_query_params;
use crate::media::{self, MediaFolder, UploadKind};
use crate::models::dto::{CreationView, GenerateImageRequest, GeneratedImage, ShareCreationRequest};
use crate::models::models::Creation;
use crate::posts;
use crate::users;

pub fn validate_prompt(raw: &str) -> Result<String, ApiError> {
    let prompt = sanitize_text(raw);
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Prompt must be at most {} characters",
            MAX_PROMPT_LENGTH
        )));
    }
    Ok(prompt)
}

fn creation_view(store: &dyn KvStore, creation: &Creation) -> anyhow::Result<CreationView> {
    // A shared post may have been deleted since.
    let shared_post_id = match creation.shared_post_id {
        Some(id) if posts::load_post(store, id)?.is_some() => Some(id),
        _ => None,
    };
    Ok(CreationView {
        id: creation.id,
        prompt: creation.prompt.clone(),
        image_url: creation.image_url.clone(),
        created_at: creation.created_at.clone(),
        shared_post_id,
    })
}

fn owned_creation(store: &dyn KvStore, user_id: u64, creation_id: u64) -> Result<Creation, ApiError> {
    let creation: Creation = store
        .get_json(&creation_key(creation_id))?
        .ok_or_else(|| ApiError::not_found("Image"))?;
    if creation.user_id != user_id {
        return Err(ApiError::Forbidden("You do not have access to this image".to_string()));
    }
    Ok(creation)
}

// === HTTP Handlers ===

pub fn generation_tokens(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    ok("Generation tokens retrieved successfully", user.generation_tokens)
}

pub fn generate_image(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let mut user = require_user(ctx, req)?;
    let body: GenerateImageRequest = parse_json(req)?;
    let prompt = validate_prompt(&body.prompt)?;

    if user.generation_tokens == 0 {
        return Err(ApiError::Forbidden("No generation tokens left".to_string()));
    }

    let bytes = ctx.generator().generate(&prompt).map_err(|e| {
        error!(user_id = user.id, error = %format!("{:#}", e), "image generation failed");
        ApiError::InternalError("Image generation failed".to_string())
    })?;
    let ext = media::sniff_extension(&bytes)
        .ok_or_else(|| ApiError::InternalError("Generator returned an unsupported image".to_string()))?;

    let store = ctx.store();
    let image_url = media::store_file(store, MediaFolder::AiPics, ext, &bytes)?;
    let creation = Creation {
        id: store.next_id("creation")?,
        user_id: user.id,
        prompt,
        image_url,
        created_at: now_iso(),
        shared_post_id: None,
    };
    store.set_json(&creation_key(creation.id), &creation)?;
    prepend_id(store, &user_creations_key(user.id), creation.id)?;

    // Charged only once the image is safely stored.
    user.generation_tokens = user.generation_tokens.saturating_sub(1);
    users::save_user(store, &user)?;

    info!(user_id = user.id, creation_id = creation.id, remaining = user.generation_tokens, "image generated");
    created(
        "Image generated successfully",
        GeneratedImage {
            creation: creation_view(store, &creation)?,
            remaining_tokens: user.generation_tokens,
        },
    )
}

pub fn list_creations(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    let store = ctx.store();
    let page = PageRequest::from_params(&parse_query_params(req.uri()), IMAGES_PER_PAGE);

    let ids = store.get_ids(&user_creations_key(user.id))?;
    let mut images = Vec::new();
    for id in page.slice(&ids) {
        if let Some(creation) = store.get_json::<Creation>(&creation_key(*id))? {
            images.push(creation_view(store, &creation)?);
        }
    }
    paginated("Images retrieved successfully", images, page, ids.len())
}

pub fn get_creation(ctx: &AppContext, req: &Request, creation_id: u64) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    let store = ctx.store();
    let creation = owned_creation(store, user.id, creation_id)?;
    ok("Image retrieved successfully", creation_view(store, &creation)?)
}

/// Store a profile picture without assigning it; the stored file name is returned.
pub fn upload_profile_picture(ctx: &AppContext, req: &Request) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    let form = MultipartForm::parse(req)?;
    let file = form
        .file("file")
        .ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;

    let ext = media::validate_upload(UploadKind::ProfilePicture, &file.file_name, &file.data)?;
    let name = media::store_file(ctx.store(), MediaFolder::ProfilePics, ext, &file.data)?;

    info!(user_id = user.id, file = %name, "profile picture uploaded");
    ok("Profile picture uploaded successfully", name)
}

pub fn share_creation(ctx: &AppContext, req: &Request, creation_id: u64) -> Result<Response, ApiError> {
    let user = require_user(ctx, req)?;
    let body: ShareCreationRequest = if req.body().is_empty() {
        ShareCreationRequest::default()
    } else {
        parse_json(req)?
    };
    let store = ctx.store();

    let mut creation = owned_creation(store, user.id, creation_id)?;
    if creation_view(store, &creation)?.shared_post_id.is_some() {
        return Err(ApiError::Conflict("Image already shared".to_string()));
    }

    let description = match sanitize_text(&body.description).as_str() {
        "" => creation.prompt.clone(),
        _ => posts::validate_description(&body.description)?,
    };

    let bytes = media::load_file(store, MediaFolder::AiPics, &creation.image_url)?
        .ok_or_else(|| ApiError::not_found("Image file"))?;
    let ext = media::file_extension(&creation.image_url).unwrap_or_else(|| ".png".to_string());
    let image_url = media::store_file(store, MediaFolder::PostPics, &ext, &bytes)?;

    let post = posts::insert_post(store, user.id, description, image_url)?;
    creation.shared_post_id = Some(post.id);
    store.set_json(&creation_key(creation.id), &creation)?;

    info!(user_id = user.id, creation_id, post_id = post.id, "creation shared");
    created("Image shared successfully", posts::post_view(store, &post, Some(user.id))?)
}
