use reqwest::multipart::Form;
use reqwest::Method;
use tracing::info;

use super::{ApiClient, ClientError, UploadFile};
use crate::core::envelope::ApiResponse;
use crate::media::UploadKind;
use crate::models::dto::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest, UserProfile,
};

/// Registration form fields; optional ones are left out of the form when `None`.
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub surname: String,
    pub middle_name: Option<String>,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub profile_picture: Option<UploadFile>,
}

impl ApiClient {
    /// Log in and keep the token: on disk when `remember` is set, in memory otherwise.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<ApiResponse<LoginResponse>, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp: ApiResponse<LoginResponse> =
            self.send_with(self.request(Method::POST, "/auth/login").json(&body), false).await?;

        if let Some(data) = &resp.data {
            self.tokens().set_token(&data.token, remember)?;
            info!(remember, "logged in");
        }
        Ok(resp)
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<ApiResponse<UserProfile>, ClientError> {
        if let Some(picture) = &request.profile_picture {
            picture.validated(UploadKind::ProfilePicture)?;
        }

        let mut form = Form::new()
            .text("username", request.username)
            .text("name", request.name)
            .text("surname", request.surname)
            .text("email", request.email)
            .text("password", request.password);
        let optional = [
            ("middleName", request.middle_name),
            ("phoneNumber", request.phone_number),
            ("city", request.city),
            ("state", request.state),
            ("country", request.country),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
        if let Some(picture) = request.profile_picture {
            form = form.part("profilePicture", picture.into_part()?);
        }

        self.send(self.request(Method::POST, "/auth/register").multipart(form)).await
    }

    /// Revoke the session on the server and forget the token locally.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.send::<()>(self.request(Method::POST, "/auth/logout")).await;
        self.tokens().clear()?;
        match result {
            Ok(_) | Err(ClientError::Unauthorized) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiResponse<()>, ClientError> {
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.send(self.request(Method::POST, "/auth/forgot-password").json(&body)).await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<ApiResponse<()>, ClientError> {
        let body = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.send(self.request(Method::POST, "/auth/reset-password").json(&body)).await
    }
}
