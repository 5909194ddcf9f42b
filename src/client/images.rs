use reqwest::multipart::Form;
use reqwest::Method;

use super::{page_query, ApiClient, ClientError, UploadFile};
use crate::core::envelope::ApiResponse;
use crate::media::UploadKind;
use crate::models::dto::{CreationView, GenerateImageRequest, GeneratedImage, PostView, ShareCreationRequest};

impl ApiClient {
    pub async fn generation_tokens(&self) -> Result<ApiResponse<u32>, ClientError> {
        self.send(self.request(Method::GET, "/Image/generation-tokens"))
            .await
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<ApiResponse<GeneratedImage>, ClientError> {
        let body = GenerateImageRequest {
            prompt: prompt.to_string(),
        };
        self.send(self.request(Method::POST, "/Image/generate-image").json(&body))
            .await
    }

    pub async fn images(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<CreationView>>, ClientError> {
        let path = format!("/Image{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn image(&self, image_id: u64) -> Result<ApiResponse<CreationView>, ClientError> {
        self.send(self.request(Method::GET, &format!("/Image/{}", image_id)))
            .await
    }

    /// Upload a profile picture and get back the stored file name.
    pub async fn upload_profile_picture(&self, file: UploadFile) -> Result<ApiResponse<String>, ClientError> {
        file.validated(UploadKind::ProfilePicture)?;
        let form = Form::new().part("file", file.into_part()?);
        self.send(self.request(Method::POST, "/Image/upload-profile-picture").multipart(form))
            .await
    }

    pub async fn share_image(&self, image_id: u64, description: &str) -> Result<ApiResponse<PostView>, ClientError> {
        let body = ShareCreationRequest {
            description: description.to_string(),
        };
        self.send(self.request(Method::POST, &format!("/Image/{}/share", image_id)).json(&body))
            .await
    }
}
