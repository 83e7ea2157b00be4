use std::time::Duration;

use crate::error::FrameSourceError;
use crate::models::frame_models::{BlobListResponse, BlobObject};

// The listing endpoint returns at most 1000 objects per page
const PAGE_LIMIT: usize = 1000;

/// Read-only client for the blob storage listing API.
pub struct BlobClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BlobClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Lists every object under `prefix`, following pagination cursors.
    pub async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, FrameSourceError> {
        let token = self.token.as_ref().ok_or(FrameSourceError::MissingToken)?;
        let limit = PAGE_LIMIT.to_string();
        let mut blobs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![("prefix", prefix), ("limit", limit.as_str())];
            if let Some(ref c) = cursor {
                query.push(("cursor", c.as_str()));
            }

            let response = self
                .client
                .get(&self.base_url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(FrameSourceError::Status(response.status()));
            }

            let page: BlobListResponse = response.json().await?;
            tracing::debug!("Blob listing page for {} returned {} objects", prefix, page.blobs.len());
            blobs.extend(page.blobs);

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blobs)
    }
}
