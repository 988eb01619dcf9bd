//! reqwest-based document fetcher

use apiscout_ports::{DocumentFetcher, FetchError};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches documents with plain `GET` requests
///
/// Every request is bounded by the client's timeout.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
}

impl HttpDocumentFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(body.to_vec())
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Other {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
