//! Typed client for the ImagineHub API.
//!
//! Services are methods on [`ApiClient`], grouped by resource in the
//! submodules. Every call returns the server's envelope; non-2xx answers
//! become [`ClientError`]s, and a 401 also fires the registered
//! [`Api401Handlers`].

mod api401;
mod auth;
mod follow;
mod images;
mod likes;
mod pagination;
mod posts;
mod token;
mod users;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use api401::{Api401Handlers, ToastKind};
pub use auth::RegisterRequest;
pub use likes::{toggle_comment_like, toggle_post_like};
pub use pagination::InfiniteList;
pub use token::TokenStore;

use crate::config::DEFAULT_PROFILE_PICTURE;
use crate::core::envelope::ApiResponse;
use crate::core::errors::LOGIN_REQUIRED_MESSAGE;
use crate::media::{self, UploadError, UploadKind};

pub const DEFAULT_API_URL: &str = "http://localhost:5169/api";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("You need to log in to continue.")]
    Unauthorized,
    #[error("{message}")]
    Api { status: u16, message: String },
    /// A 2xx answer whose envelope reports failure.
    #[error("{0}")]
    Rejected(String),
    /// Refused locally before anything was sent.
    #[error("{0}")]
    Validation(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid response: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<UploadError> for ClientError {
    fn from(err: UploadError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:5169/api`.
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Reads `IMAGINEHUB_API_URL`, falling back to the local development server.
    pub fn from_env() -> Self {
        match std::env::var("IMAGINEHUB_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    /// Host the image folders are served from: the API URL without `/api`.
    pub fn asset_base(&self) -> &str {
        self.api_url.strip_suffix("/api").unwrap_or(&self.api_url)
    }

    pub fn profile_picture_url(&self, name: Option<&str>) -> String {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_PROFILE_PICTURE);
        format!("{}/profile_pics/{}", self.asset_base(), name)
    }

    pub fn post_picture_url(&self, name: &str) -> String {
        format!("{}/post_pics/{}", self.asset_base(), name)
    }

    pub fn ai_picture_url(&self, name: &str) -> String {
        format!("{}/ai_pics/{}", self.asset_base(), name)
    }
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Check the file the way the server will, before spending a request on it.
    fn validated(&self, kind: UploadKind) -> Result<(), ClientError> {
        media::validate_upload(kind, &self.file_name, &self.bytes)?;
        Ok(())
    }

    fn into_part(self) -> Result<reqwest::multipart::Part, ClientError> {
        let mime = mime_guess::from_path(&self.file_name).first_or_octet_stream();
        Ok(reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime.as_ref())?)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<TokenStore>,
    on_401: Arc<Api401Handlers>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            tokens: Arc::new(tokens),
            on_401: Arc::new(Api401Handlers::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// The process-wide 401 hook; register the toast and login callbacks here.
    pub fn api401(&self) -> &Api401Handlers {
        &self.on_401
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.config.api_url, path));
        match self.tokens.auth_header() {
            Some(header) => builder.header(reqwest::header::AUTHORIZATION, header),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<ApiResponse<T>, ClientError> {
        self.send_with(builder, true).await
    }

    /// Like `send`, but a 401 is only routed through the login hook when `session_required` is set.
    /// Otherwise it comes back as a plain `Api` error carrying the server's message.
    async fn send_with<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        session_required: bool,
    ) -> Result<ApiResponse<T>, ClientError> {
        let resp = builder.send().await?;
        let status = resp.status().as_u16();

        if status == 401 && session_required {
            self.on_401.handle(status);
            return Err(ClientError::Unauthorized);
        }

        let body = resp.bytes().await?;
        if !(200..300).contains(&status) {
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .map(|env| env.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP error! status: {}", status));
            return Err(ClientError::Api { status, message });
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            return Err(ClientError::Rejected(envelope.message));
        }
        Ok(envelope)
    }
}

impl ClientError {
    /// Text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized => LOGIN_REQUIRED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

fn page_query(page: u32, page_size: u32) -> String {
    format!("?page={}&pageSize={}", page, page_size)
}
