use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("blob storage token is not configured")]
    MissingToken,
    #[error("blob listing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("blob listing returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("blob listing had {found} numbered frames, expected {expected}")]
    ShortListing { found: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("filesystem is read-only and no external store is configured")]
    ReadOnly,
    #[error("email store connection failed: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("file storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid frame url {0}")]
    Url(String),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}
