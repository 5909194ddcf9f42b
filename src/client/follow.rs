use reqwest::Method;

use super::{page_query, ApiClient, ClientError};
use crate::core::envelope::ApiResponse;
use crate::models::dto::UserSummary;

impl ApiClient {
    pub async fn follow(&self, user_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::POST, &format!("/Follow/{}", user_id)))
            .await
    }

    pub async fn unfollow(&self, user_id: u64) -> Result<ApiResponse<()>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/Follow/{}", user_id)))
            .await
    }

    /// The caller's followers.
    pub async fn followers(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<UserSummary>>, ClientError> {
        let path = format!("/Follow/followers{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    /// Accounts the caller follows.
    pub async fn following(&self, page: u32, page_size: u32) -> Result<ApiResponse<Vec<UserSummary>>, ClientError> {
        let path = format!("/Follow/following{}", page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn user_followers(
        &self,
        user_id: u64,
        page: u32,
        page_size: u32,
    ) -> Result<ApiResponse<Vec<UserSummary>>, ClientError> {
        let path = format!("/Follow/{}/followers{}", user_id, page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn user_following(
        &self,
        user_id: u64,
        page: u32,
        page_size: u32,
    ) -> Result<ApiResponse<Vec<UserSummary>>, ClientError> {
        let path = format!("/Follow/{}/following{}", user_id, page_query(page, page_size));
        self.send(self.request(Method::GET, &path)).await
    }
}
