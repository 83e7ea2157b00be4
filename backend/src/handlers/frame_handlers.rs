use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::models::frame_models::{FrameSetConfig, FramesResponse};
use crate::AppState;

pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

async fn frames_response(state: &AppState, set: &FrameSetConfig) -> Response {
    let urls = state.frame_urls.urls(set).await;
    tracing::debug!("Serving {} {} frame urls", urls.len(), set.name);

    let mut response = Json(FramesResponse { urls }).into_response();
    if set.immutable {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));
    }
    response
}

pub async fn get_frames(State(state): State<Arc<AppState>>) -> Response {
    frames_response(&state, &state.hero_frames).await
}

pub async fn get_frames2(State(state): State<Arc<AppState>>) -> Response {
    frames_response(&state, &state.webp_frames).await
}
