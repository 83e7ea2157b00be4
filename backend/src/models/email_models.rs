use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured signup. Appended once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl EmailRecord {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitEmailRequest {
    pub email: Option<serde_json::Value>, // anything but a string is treated as missing
}
