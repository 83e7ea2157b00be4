use serde::{Deserialize, Serialize};

/// Describes one servable image sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSetConfig {
    pub name: String,
    pub frame_count: usize,
    pub base_path: String, // url prefix of the local copies, without trailing slash
    pub extension: String, // "png", "webp", ..
    pub blob_prefix: Option<String>, // when set the urls are listed from blob storage first
    pub immutable: bool, // static assets that never change once deployed
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FramesResponse {
    pub urls: Vec<String>,
}

/// One object returned by the blob listing API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    pub url: String,
    pub pathname: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobListResponse {
    pub blobs: Vec<BlobObject>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}
