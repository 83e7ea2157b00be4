use std::path::PathBuf;

use crate::models::frame_models::FrameSetConfig;

pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub frontend_url: String,
    pub public_dir: PathBuf,
    pub emails_file: PathBuf,
    pub redis_url: Option<String>,
    pub blob_token: Option<String>,
    pub blob_api_url: String,
    pub read_only_fs: bool,
    pub sentry_dsn: Option<String>,
}

// Empty values are treated the same as missing ones
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    matches!(
        env_opt(name).as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env_opt("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        Self {
            port,
            frontend_url: env_opt("FRONTEND_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            public_dir: env_opt("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()).into(),
            emails_file: env_opt("EMAILS_FILE").unwrap_or_else(|| "data/emails.json".to_string()).into(),
            redis_url: env_opt("REDIS_URL").or_else(|| env_opt("KV_URL")),
            blob_token: env_opt("BLOB_READ_WRITE_TOKEN"),
            blob_api_url: env_opt("BLOB_API_URL").unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string()),
            // Serverless hosts mount the app directory read-only
            read_only_fs: env_flag("READ_ONLY_FS") || env_flag("VERCEL"),
            sentry_dsn: env_opt("SENTRY_DSN"),
        }
    }

    /// The PNG hero sequence. Listed from blob storage when a token is configured.
    pub fn hero_frames(&self) -> FrameSetConfig {
        FrameSetConfig {
            name: "frames".to_string(),
            frame_count: 359,
            base_path: "/Frames".to_string(),
            extension: "png".to_string(),
            blob_prefix: self.blob_token.as_ref().map(|_| "Frames/".to_string()),
            immutable: false,
        }
    }

    /// The optimized webp sequence served straight from the public directory.
    pub fn webp_frames(&self) -> FrameSetConfig {
        FrameSetConfig {
            name: "frames2".to_string(),
            frame_count: 182,
            base_path: "/frames2".to_string(),
            extension: "webp".to_string(),
            blob_prefix: None,
            immutable: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            frontend_url: "http://localhost:8080".to_string(),
            public_dir: PathBuf::from("public"),
            emails_file: PathBuf::from("data/emails.json"),
            redis_url: None,
            blob_token: None,
            blob_api_url: DEFAULT_BLOB_API_URL.to_string(),
            read_only_fs: false,
            sentry_dsn: None,
        }
    }
}

/// Redis URL with the password replaced, safe to print in logs.
pub fn mask_redis_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("*****")).is_ok() {
                parsed.to_string()
            } else {
                "<redis url>".to_string()
            }
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid redis url>".to_string(),
    }
}
