use async_trait::async_trait;

use crate::error::FetchError;

/// Port for retrieving API description documents over HTTP
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// `GET url` and return the raw body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
