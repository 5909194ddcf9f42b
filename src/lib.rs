//! ImagineHub: a social gallery for AI generated images.
//!
//! The crate is both the HTTP backend (a Spin component on wasm32, an
//! actix-web server natively) and, natively, a typed client for the same API.

pub mod auth;
pub mod comments;
pub mod config;
pub mod context;
pub mod core;
pub mod follow;
pub mod generator;
pub mod images;
pub mod likes;
pub mod media;
pub mod models;
pub mod posts;
pub mod routes;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod client;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;

pub use context::AppContext;
pub use crate::core::envelope::{ApiResponse, PaginationInfo};
pub use crate::core::errors::ApiError;
pub use routes::handle_request;

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: spin_sdk::http::Request) -> anyhow::Result<spin_sdk::http::Response> {
    let ctx = AppContext::from_spin()?;
    Ok(routes::handle_request(&ctx, &req))
}
