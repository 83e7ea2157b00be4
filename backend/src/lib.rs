use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod error;
pub mod playback;
pub mod api {
    pub mod blob;
}
pub mod handlers {
    pub mod email_handlers;
    pub mod frame_handlers;
}
pub mod models {
    pub mod email_models;
    pub mod frame_models;
}
pub mod repositories {
    pub mod email_repository;
}
pub mod utils {
    pub mod debounce;
    pub mod frame_urls;
}

use api::blob::BlobClient;
use config::AppConfig;
use handlers::{email_handlers, frame_handlers};
use models::frame_models::FrameSetConfig;
use repositories::email_repository::EmailStore;
use utils::frame_urls::FrameUrlProvider;

pub struct AppState {
    pub config: AppConfig,
    pub email_store: Arc<dyn EmailStore>,
    pub frame_urls: FrameUrlProvider,
    pub hero_frames: FrameSetConfig,
    pub webp_frames: FrameSetConfig,
}

impl AppState {
    pub fn new(config: AppConfig, email_store: Arc<dyn EmailStore>) -> Self {
        let blob = BlobClient::new(&config.blob_api_url, config.blob_token.clone());
        Self {
            hero_frames: config.hero_frames(),
            webp_frames: config.webp_frames(),
            frame_urls: FrameUrlProvider::new(blob),
            email_store,
            config,
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Sets up the fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quantiva=debug,tower_http=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

pub fn app(state: Arc<AppState>) -> Router {
    let public_dir = state.config.public_dir.clone();
    let immutable = HeaderValue::from_static(frame_handlers::IMMUTABLE_CACHE);

    let api_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/frames", get(frame_handlers::get_frames))
        .route("/api/frames2", get(frame_handlers::get_frames2))
        .route("/api/submit-email", post(email_handlers::submit_email));

    let cors_origin = match HeaderValue::from_str(&state.config.frontend_url) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!("FRONTEND_URL is not a valid origin, allowing none");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    let mut router = Router::new().merge(api_routes);
    // Frame sequences never change once deployed, let browsers keep them
    for set in [&state.hero_frames, &state.webp_frames] {
        let dir = public_dir.join(set.base_path.trim_start_matches('/'));
        router = router.nest_service(
            &set.base_path,
            SetResponseHeader::if_not_present(ServeDir::new(dir), header::CACHE_CONTROL, immutable.clone()),
        );
    }

    router
        .fallback_service(ServeDir::new(public_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(cors_origin)
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
                .expose_headers([header::CONTENT_TYPE, header::CONTENT_LENGTH]),
        )
        .with_state(state)
}
