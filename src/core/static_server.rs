use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::{Request, Response};

use crate::config::DEFAULT_PROFILE_PICTURE;
use crate::context::AppContext;
use crate::core::errors::ApiError;
use crate::media::{self, MediaFolder};

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

pub fn serve_static(path: &str) -> Result<Response, ApiError> {
    let file_path = match path {
        "/" | "/index.html" => "index.html",
        _ => path.trim_start_matches('/'),
    };

    let file = Assets::get(file_path).ok_or_else(|| ApiError::not_found("File"))?;
    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(file.data.to_vec())
        .build())
}

/// CORS headers for image requests from an allowed origin; none otherwise.
pub fn cors_headers(ctx: &AppContext, req: &Request) -> Vec<(&'static str, String)> {
    let origin = match req.header("Origin").and_then(|h| h.as_str()) {
        Some(origin) if ctx.config().is_origin_allowed(origin) => origin.to_string(),
        _ => return Vec::new(),
    };
    vec![
        ("Access-Control-Allow-Origin", origin),
        ("Access-Control-Allow-Credentials", "true".to_string()),
        ("Access-Control-Allow-Methods", "GET, OPTIONS".to_string()),
        ("Access-Control-Allow-Headers", "Content-Type, Authorization".to_string()),
    ]
}

/// Serve an uploaded or generated image from one of the public folders.
pub fn serve_media(ctx: &AppContext, req: &Request, folder: MediaFolder, name: &str) -> Result<Response, ApiError> {
    let bytes = match media::load_file(ctx.store(), folder, name)? {
        Some(bytes) => bytes,
        None if name == DEFAULT_PROFILE_PICTURE => Assets::get(DEFAULT_PROFILE_PICTURE)
            .map(|file| file.data.to_vec())
            .ok_or_else(|| ApiError::not_found("File"))?,
        None => return Err(ApiError::not_found("File")),
    };
    let mime = from_path(name).first_or_octet_stream();

    let mut builder = Response::builder();
    builder
        .status(200)
        .header("Content-Type", mime.as_ref())
        .header("Cache-Control", "public, max-age=86400");
    for (name, value) in cors_headers(ctx, req) {
        builder.header(name, value);
    }
    Ok(builder.body(bytes).build())
}

/// Answer a CORS preflight for the image folders.
pub fn preflight(ctx: &AppContext, req: &Request) -> Response {
    let mut builder = Response::builder();
    builder.status(204);
    for (name, value) in cors_headers(ctx, req) {
        builder.header(name, value);
    }
    builder.body(Vec::new()).build()
}
