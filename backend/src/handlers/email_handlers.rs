use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use serde_json::json;

use crate::models::email_models::{EmailRecord, SubmitEmailRequest};
use crate::AppState;

fn email_from_json(body: &[u8]) -> Option<String> {
    let req: SubmitEmailRequest = serde_json::from_slice(body).ok()?;
    req.email.and_then(|v| v.as_str().map(str::to_string))
}

fn email_from_form(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "email")
        .map(|(_, value)| value.into_owned())
}

/// Pulls the `email` field out of a JSON or form body, trimmed. Empty when absent.
pub fn parse_email(content_type: &str, body: &[u8]) -> String {
    let content_type = content_type.to_ascii_lowercase();
    let email = if content_type.contains("application/json") {
        email_from_json(body)
    } else if content_type.contains("application/x-www-form-urlencoded") {
        email_from_form(body)
    } else {
        // Unknown or missing content type, guess
        email_from_json(body).or_else(|| email_from_form(body))
    };
    email.map(|e| e.trim().to_string()).unwrap_or_default()
}

pub async fn submit_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let email = parse_email(content_type, &body);
    if email.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing email"})),
        ));
    }

    let record = EmailRecord::new(email);
    let store = state.email_store.clone();
    let result = tokio::task::spawn_blocking(move || store.append(&record))
        .await
        .map_err(|e| {
            tracing::error!("Email store task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to store email"})),
            )
        })?;

    match result {
        Ok(stored_in) => {
            tracing::info!("Stored email submission in {} store", stored_in);
            Ok(Json(json!({"ok": true})))
        }
        Err(e) => {
            tracing::error!("Failed to store email submission: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            ))
        }
    }
}
