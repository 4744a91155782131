use serde::Serialize;

use crate::gateway::mask;

pub mod api;
pub mod callback;
pub mod interaction_log;
pub mod processor;

pub type Result<T> = std::result::Result<T, SubscriptionErrorResponse>;

#[derive(Debug, Serialize)]
pub struct SubscriptionErrorResponse {
    result: bool,
    error: String,
    logs: Vec<interaction_log::InteractionLog>,
}

impl std::error::Error for SubscriptionErrorResponse {}

impl std::fmt::Display for SubscriptionErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl SubscriptionErrorResponse {
    pub fn new(text: String, logs: Vec<interaction_log::InteractionLog>) -> Self {
        Self {
            result: false,
            error: text,
            logs,
        }
    }
}

impl axum::response::IntoResponse for SubscriptionErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(data = %mask::secure_serializable(&self), "Connector API error response payload");
        (reqwest::StatusCode::OK, axum::Json(self)).into_response()
    }
}
