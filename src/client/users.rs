use reqwest::multipart::Form;
use reqwest::Method;

use super::{ApiClient, ClientError, UploadFile};
use crate::core::envelope::ApiResponse;
use crate::media::UploadKind;
use crate::models::dto::{DeleteAccountRequest, PasswordChanged, UpdatePasswordDto, UpdateUserDto, UserProfile};

impl ApiClient {
    pub async fn current_user(&self) -> Result<ApiResponse<UserProfile>, ClientError> {
        self.send(self.request(Method::GET, "/User")).await
    }

    pub async fn user_by_username(&self, username: &str) -> Result<ApiResponse<UserProfile>, ClientError> {
        let path = format!("/User/by-username/{}", urlencoding::encode(username));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn update_user(&self, update: &UpdateUserDto) -> Result<ApiResponse<UserProfile>, ClientError> {
        self.send(self.request(Method::PUT, "/User/update").json(update)).await
    }

    pub async fn update_profile_picture(&self, file: UploadFile) -> Result<ApiResponse<UserProfile>, ClientError> {
        file.validated(UploadKind::ProfilePicture)?;
        let form = Form::new().part("profilePicture", file.into_part()?);
        self.send(self.request(Method::POST, "/User/update-profile-picture").multipart(form))
            .await
    }

    /// Change the password. The server revokes other sessions and hands back a
    /// fresh token, which replaces the stored one in the same storage.
    pub async fn update_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<ApiResponse<PasswordChanged>, ClientError> {
        let body = UpdatePasswordDto {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let resp: ApiResponse<PasswordChanged> =
            self.send(self.request(Method::PUT, "/User/update-password").json(&body)).await?;
        if let Some(changed) = &resp.data {
            let remember = self.tokens().is_remembered();
            self.tokens().set_token(&changed.token, remember)?;
        }
        Ok(resp)
    }

    pub async fn delete_account(&self, password: &str) -> Result<ApiResponse<()>, ClientError> {
        let body = DeleteAccountRequest::Bare(password.to_string());
        let resp = self
            .send(self.request(Method::DELETE, "/User/delete-account").json(&body))
            .await?;
        self.tokens().clear()?;
        Ok(resp)
    }
}
