use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;

use quantiva::config::AppConfig;
use quantiva::repositories::email_repository::build_email_store;
use quantiva::{app, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AppConfig::from_env();

    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((dsn, sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        }))
    });
    init_tracing();

    let email_store = build_email_store(&config).context("Failed to set up email store")?;
    tracing::info!("Email submissions go to the {} store", email_store.name());
    if config.blob_token.is_none() {
        tracing::info!("BLOB_READ_WRITE_TOKEN not set, serving local frame paths");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config, email_store));
    let app = app(state);

    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}
