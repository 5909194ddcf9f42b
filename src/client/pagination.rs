use std::future::Future;

use super::ClientError;
use crate::core::envelope::ApiResponse;

/// Items of a paginated listing, accumulated one page at a time as the user scrolls.
#[derive(Debug, Clone)]
pub struct InfiniteList<T> {
    items: Vec<T>,
    next_page: u32,
    page_size: u32,
    exhausted: bool,
}

impl<T> InfiniteList<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            next_page: 1,
            page_size: page_size.max(1),
            exhausted: false,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// True once the last page has been loaded.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.next_page = 1;
        self.exhausted = false;
    }

    /// Fetch the next page with `fetch(page, page_size)` and append it.
    /// Returns how many items arrived; nothing is fetched once exhausted.
    pub async fn load_more<F, Fut>(&mut self, fetch: F) -> Result<usize, ClientError>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = Result<ApiResponse<Vec<T>>, ClientError>>,
    {
        if self.exhausted {
            return Ok(0);
        }

        let resp = fetch(self.next_page, self.page_size).await?;
        let page = resp.data.unwrap_or_default();
        let received = page.len();
        self.items.extend(page);
        self.next_page += 1;

        self.exhausted = match resp.pagination {
            Some(info) => info.current_page >= info.total_pages,
            None => received < self.page_size as usize,
        } || received == 0;

        Ok(received)
    }
}
