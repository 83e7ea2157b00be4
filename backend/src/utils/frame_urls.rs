use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::blob::BlobClient;
use crate::error::FrameSourceError;
use crate::models::frame_models::{BlobObject, FrameSetConfig};

static FRAME_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frame_(\d+)").expect("frame number pattern is valid"));

/// `base/frame_0001.ext` .. `base/frame_NNNN.ext`, one per frame.
pub fn deterministic_urls(set: &FrameSetConfig) -> Vec<String> {
    (0..set.frame_count)
        .map(|i| format!("{}/frame_{:04}.{}", set.base_path, i + 1, set.extension))
        .collect()
}

/// Number embedded in an object path like `Frames/frame_0042.png`.
pub fn frame_number(path: &str) -> Option<u64> {
    FRAME_NUMBER
        .captures(path)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Drops unnumbered objects and sorts the rest by their embedded frame number.
pub fn order_by_frame_number(blobs: Vec<BlobObject>) -> Vec<String> {
    let mut numbered: Vec<(u64, String)> = blobs
        .into_iter()
        .filter_map(|blob| frame_number(&blob.pathname).map(|n| (n, blob.url)))
        .collect();
    numbered.sort_by_key(|(n, _)| *n);
    numbered.into_iter().map(|(_, url)| url).collect()
}

/// Resolves the url list for a frame set, preferring blob storage when the set asks for it.
pub struct FrameUrlProvider {
    blob: BlobClient,
}

impl FrameUrlProvider {
    pub fn new(blob: BlobClient) -> Self {
        Self { blob }
    }

    pub async fn urls(&self, set: &FrameSetConfig) -> Vec<String> {
        let Some(prefix) = set.blob_prefix.as_deref() else {
            return deterministic_urls(set);
        };

        match self.list_from_blob(set, prefix).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("Falling back to local {} frames: {}", set.name, e);
                deterministic_urls(set)
            }
        }
    }

    async fn list_from_blob(&self, set: &FrameSetConfig, prefix: &str) -> Result<Vec<String>, FrameSourceError> {
        let blobs = self.blob.list(prefix).await?;
        let mut urls = order_by_frame_number(blobs);
        if urls.len() < set.frame_count {
            return Err(FrameSourceError::ShortListing {
                found: urls.len(),
                expected: set.frame_count,
            });
        }
        urls.truncate(set.frame_count);
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(count: usize) -> FrameSetConfig {
        FrameSetConfig {
            name: "frames".to_string(),
            frame_count: count,
            base_path: "/Frames".to_string(),
            extension: "png".to_string(),
            blob_prefix: Some("Frames/".to_string()),
            immutable: false,
        }
    }

    fn blob(path: &str) -> BlobObject {
        BlobObject {
            url: format!("https://store.example.com/{}", path),
            pathname: path.to_string(),
            size: None,
            uploaded_at: None,
        }
    }

    #[test]
    fn deterministic_urls_are_one_based_and_padded() {
        let urls = deterministic_urls(&set(359));
        assert_eq!(urls.len(), 359);
        assert_eq!(urls[0], "/Frames/frame_0001.png");
        assert_eq!(urls[9], "/Frames/frame_0010.png");
        assert_eq!(urls[358], "/Frames/frame_0359.png");
    }

    #[test]
    fn zero_frames_gives_empty_list() {
        assert!(deterministic_urls(&set(0)).is_empty());
    }

    #[test]
    fn extracts_frame_numbers() {
        assert_eq!(frame_number("Frames/frame_0042.png"), Some(42));
        assert_eq!(frame_number("Frames/frame_12000.webp"), Some(12000));
        assert_eq!(frame_number("Frames/cover.png"), None);
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let urls = order_by_frame_number(vec![
            blob("Frames/frame_10.png"),
            blob("Frames/readme.txt"),
            blob("Frames/frame_2.png"),
            blob("Frames/frame_1.png"),
        ]);
        assert_eq!(
            urls,
            vec![
                "https://store.example.com/Frames/frame_1.png",
                "https://store.example.com/Frames/frame_2.png",
                "https://store.example.com/Frames/frame_10.png",
            ]
        );
    }

    #[tokio::test]
    async fn missing_token_falls_back_to_local_paths() {
        let provider = FrameUrlProvider::new(BlobClient::new("http://127.0.0.1:9", None));
        let urls = provider.urls(&set(5)).await;
        assert_eq!(urls, deterministic_urls(&set(5)));
    }

    #[tokio::test]
    async fn unreachable_blob_store_falls_back_to_local_paths() {
        let provider = FrameUrlProvider::new(BlobClient::new("http://127.0.0.1:9", Some("token".to_string())));
        let urls = provider.urls(&set(3)).await;
        assert_eq!(urls, vec!["/Frames/frame_0001.png", "/Frames/frame_0002.png", "/Frames/frame_0003.png"]);
    }
}
