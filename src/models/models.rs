//! Records as they are persisted in the key-value store.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub middle_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub profile_picture: Option<String>,
    pub generation_tokens: u32,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub description: String,
    pub image_url: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
    /// Always a top-level comment; replies never nest deeper.
    pub parent_id: Option<u64>,
    pub text: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// An AI generated image owned by its creator.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Creation {
    pub id: u64,
    pub user_id: u64,
    pub prompt: String,
    pub image_url: String,
    pub created_at: String,
    pub shared_post_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenData {
    pub user_id: u64,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ResetData {
    pub user_id: u64,
    pub created_at: String,
}
