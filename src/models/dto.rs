//! JSON shapes exchanged with clients. Field names are camelCase on the wire.

use serde::{Deserialize, Deserializer, Serialize};

/// A numeric id that clients may send either as a number or as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Id(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Id)
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {:?}", s))),
        }
    }
}

// === Requests ===

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDto {
    pub current_password: String,
    pub new_password: String,
}

/// Account deletion confirms with the password, sent either bare or wrapped.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum DeleteAccountRequest {
    Bare(String),
    Wrapped { password: String },
}

impl DeleteAccountRequest {
    pub fn password(&self) -> &str {
        match self {
            DeleteAccountRequest::Bare(p) => p,
            DeleteAccountRequest::Wrapped { password } => password,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostDto {
    pub post_id: Id,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentDto {
    pub post_id: Id,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentDto {
    pub comment_id: Id,
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerateImageRequest {
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ShareCreationRequest {
    #[serde(default)]
    pub description: String,
}

// === Responses ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub profile_picture: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    /// Only present on the caller's own profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub created_at: String,
    pub profile_picture: String,
    pub post_count: u64,
    pub followers: u64,
    pub following: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_followed_by_current_user: Option<bool>,
    #[serde(default)]
    pub posts: Vec<PostView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub profile_picture: String,
    pub description: String,
    pub image_url: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked_by_current_user: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostView,
    #[serde(default)]
    pub comments: Vec<CommentView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
    pub username: String,
    pub profile_picture: String,
    pub comment: String,
    pub parent_id: Option<u64>,
    pub like_count: u64,
    pub is_liked_by_current_user: bool,
    pub created_at: String,
    #[serde(default)]
    pub replies: Vec<CommentView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreationView {
    pub id: u64,
    pub prompt: String,
    pub image_url: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_post_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    #[serde(flatten)]
    pub creation: CreationView,
    pub remaining_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChanged {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_strings() {
        let dto: CreateCommentDto =
            serde_json::from_str(r#"{"postId":"12","comment":"nice","parentId":3}"#).unwrap();
        assert_eq!(dto.post_id, Id(12));
        assert_eq!(dto.parent_id, Some(Id(3)));

        let dto: CreateCommentDto = serde_json::from_str(r#"{"postId":5,"comment":"x"}"#).unwrap();
        assert_eq!(dto.parent_id, None);

        assert!(serde_json::from_str::<UpdatePostDto>(r#"{"postId":"abc","description":""}"#).is_err());
    }

    #[test]
    fn delete_account_accepts_bare_password() {
        let bare: DeleteAccountRequest = serde_json::from_str(r#""s3cret""#).unwrap();
        assert_eq!(bare.password(), "s3cret");
        let wrapped: DeleteAccountRequest = serde_json::from_str(r#"{"password":"s3cret"}"#).unwrap();
        assert_eq!(wrapped.password(), "s3cret");
    }

    #[test]
    fn post_detail_flattens_the_post() {
        let detail = PostDetail {
            post: PostView {
                id: 1,
                user_id: 2,
                username: "ada".into(),
                name: "Ada".into(),
                surname: "L".into(),
                profile_picture: "default.png".into(),
                description: "d".into(),
                image_url: "a.png".into(),
                like_count: 0,
                comment_count: 0,
                is_liked_by_current_user: false,
                created_at: "now".into(),
                updated_at: None,
            },
            comments: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["isLikedByCurrentUser"], false);
        assert_eq!(json["imageUrl"], "a.png");
        assert!(json["comments"].as_array().unwrap().is_empty());
    }
}
