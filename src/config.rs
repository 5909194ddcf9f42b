use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

// === Validation limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_PROMPT_LENGTH: usize = 1000;

// === Pagination ===
pub const POSTS_PER_PAGE: u32 = 10;
pub const IMAGES_PER_PAGE: u32 = 12;
pub const FOLLOWS_PER_PAGE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

// === Uploads ===
pub const MAX_PROFILE_PICTURE_BYTES: usize = 7 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_PROFILE_PICTURE_DIMENSION: u32 = 512;
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".gif"];
pub const DEFAULT_PROFILE_PICTURE: &str = "default.png";

/// Largest request body the native server accepts.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://192.168.1.104:3000",
    "http://78.172.156.103:3000",
];

// === KV keys ===
pub fn seq_key(kind: &str) -> String {
    format!("seq:{}", kind)
}

pub fn user_key(user_id: u64) -> String {
    format!("user:{}", user_id)
}

pub fn user_email_key(email: &str) -> String {
    format!("user_email:{}", email.to_lowercase())
}

pub fn user_name_key(username: &str) -> String {
    format!("user_name:{}", username.to_lowercase())
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn user_tokens_key(user_id: u64) -> String {
    format!("user_tokens:{}", user_id)
}

pub fn reset_key(token: &str) -> String {
    format!("reset:{}", token)
}

pub fn user_reset_key(user_id: u64) -> String {
    format!("user_reset:{}", user_id)
}

pub fn post_key(post_id: u64) -> String {
    format!("post:{}", post_id)
}

pub const FEED_KEY: &str = "feed";

pub fn user_posts_key(user_id: u64) -> String {
    format!("user_posts:{}", user_id)
}

pub fn comment_key(comment_id: u64) -> String {
    format!("comment:{}", comment_id)
}

pub fn post_comments_key(post_id: u64) -> String {
    format!("post_comments:{}", post_id)
}

pub fn comment_replies_key(comment_id: u64) -> String {
    format!("comment_replies:{}", comment_id)
}

pub fn user_comments_key(user_id: u64) -> String {
    format!("user_comments:{}", user_id)
}

pub fn post_likes_key(post_id: u64) -> String {
    format!("post_likes:{}", post_id)
}

pub fn comment_likes_key(comment_id: u64) -> String {
    format!("comment_likes:{}", comment_id)
}

pub fn user_post_likes_key(user_id: u64) -> String {
    format!("user_post_likes:{}", user_id)
}

pub fn user_comment_likes_key(user_id: u64) -> String {
    format!("user_comment_likes:{}", user_id)
}

pub fn followings_key(user_id: u64) -> String {
    format!("followings:{}", user_id)
}

pub fn followers_key(user_id: u64) -> String {
    format!("followers:{}", user_id)
}

pub fn creation_key(creation_id: u64) -> String {
    format!("creation:{}", creation_id)
}

pub fn user_creations_key(user_id: u64) -> String {
    format!("user_creations:{}", user_id)
}

pub fn file_key(folder: &str, name: &str) -> String {
    format!("file:{}:{}", folder, name)
}

/// Server settings resolved from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub token_expiration_hours: i64,
    pub reset_token_minutes: i64,
    pub initial_generation_tokens: u32,
    pub allowed_origins: Vec<String>,
    /// External generator endpoint; the built-in placeholder generator is used when unset.
    pub generator_url: Option<String>,
    pub generated_image_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_expiration_hours: 24,
            reset_token_minutes: 30,
            initial_generation_tokens: 10,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            generator_url: None,
            generated_image_size: 512,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token_expiration_hours: try_load(
                "IMAGINEHUB_TOKEN_EXPIRATION_HOURS",
                defaults.token_expiration_hours,
            ),
            reset_token_minutes: try_load(
                "IMAGINEHUB_RESET_TOKEN_MINUTES",
                defaults.reset_token_minutes,
            ),
            initial_generation_tokens: try_load(
                "IMAGINEHUB_INITIAL_GENERATION_TOKENS",
                defaults.initial_generation_tokens,
            ),
            allowed_origins: env::var("IMAGINEHUB_ALLOWED_ORIGINS")
                .ok()
                .map(|raw| parse_origins(&raw))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.allowed_origins),
            generator_url: env::var("IMAGINEHUB_GENERATOR_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            generated_image_size: try_load(
                "IMAGINEHUB_GENERATED_IMAGE_SIZE",
                defaults.generated_image_size,
            )
            .clamp(64, 2048),
        }
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
