use reqwest::multipart::Form;
use reqwest::Method;

use super::{page_query, ApiClient, ClientError, UploadFile};
use crate::core::envelope::ApiResponse;
use crate::media::UploadKind;
use crate::models::dto::{
    CommentView, CreateCommentDto, Id, PostDetail, PostView, UpdateCommentDto, UpdatePostDto,
};

// === Posts ===
impl ApiClient {
    pub async fn posts(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<PostView>>, ClientError> {
        let path = format!("/Post/posts{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn user_posts(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<PostView>>, ClientError> {
        let path = format!("/Post/user/posts{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn feed(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<PostView>>, ClientError> {
        let path = format!("/Post/feed{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn create_post(&self, description: &str, picture: UploadFile) -> Result<ApiResponse<PostView>, ClientError> {
        picture.validated(UploadKind::PostPicture)?;
        let form = Form::new()
            .text("description", description.to_string())
            .part("picture", picture.into_part()?);
        self.send(self.request(Method::POST, "/Post/posts").multipart(form)).await
    }

    pub async fn post(&self, post_id: u64) -> Result<ApiResponse<PostDetail>, ClientError> {
        self.send(self.request(Method::GET, &format!("/Post/posts/{}", post_id)))
            .await
    }

    pub async fn like_post(&self, post_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::POST, &format!("/Post/posts/{}/like", post_id)))
            .await
    }

    pub async fn unlike_post(&self, post_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/Post/posts/{}/like", post_id)))
            .await
    }

    pub async fn update_post_description(
        &self,
        post_id: u64,
        description: &str,
    ) -> Result<ApiResponse<PostView>, ClientError> {
        let body = UpdatePostDto {
            post_id: Id(post_id),
            description: description.to_string(),
        };
        self.send(self.request(Method::PUT, "/Post/update-description").json(&body))
            .await
    }

    pub async fn delete_post(&self, post_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/Post/posts/{}", post_id)))
            .await
    }
}

// === Comments ===
impl ApiClient {
    pub async fn create_comment(
        &self,
        post_id: u64,
        comment: &str,
        parent_id: Option<u64>,
    ) -> Result<ApiResponse<CommentView>, ClientError> {
        let body = CreateCommentDto {
            post_id: Id(post_id),
            comment: comment.to_string(),
            parent_id: parent_id.map(Id),
        };
        self.send(self.request(Method::POST, "/comment/comment").json(&body))
            .await
    }

    pub async fn update_comment(&self, comment_id: u64, comment: &str) -> Result<ApiResponse<CommentView>, ClientError> {
        let body = UpdateCommentDto {
            comment_id: Id(comment_id),
            comment: comment.to_string(),
        };
        self.send(self.request(Method::PUT, "/comment").json(&body)).await
    }

    pub async fn delete_comment(&self, comment_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/comment/{}", comment_id)))
            .await
    }

    pub async fn like_comment(&self, comment_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::POST, &format!("/comment/{}/like", comment_id)))
            .await
    }

    pub async fn unlike_comment(&self, comment_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/comment/{}/like", comment_id)))
            .await
    }
}
