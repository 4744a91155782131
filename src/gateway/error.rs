use std::fmt::Display;

use serde::de::Error;

#[derive(Debug)]
pub enum GatewayError {
    /// Transport-level failure (connect, timeout, DNS).
    Request(reqwest::Error),
    /// Rejected before any network call was made.
    InvalidRequest(&'static str),
    /// Authorization succeeded at the HTTP level but returned no usable token.
    MissingAccessToken,
    /// The provider responded with a non-success status.
    Upstream { status: u16, body: String },
    /// The provider responded with a body we could not decode.
    Deserialization(serde_json::Error),
}

impl GatewayError {
    pub(super) fn unexpected_payload(body: &str) -> Self {
        Self::Deserialization(serde_json::Error::custom(format!(
            "unexpected transaction payload: {body}"
        )))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Deserialization(serde_json::Error::custom(
                "failed to decode response body",
            ));
        }
        Self::Request(value)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Deserialization(value)
    }
}

impl std::error::Error for GatewayError {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Request(e) => write!(f, "http request error: {e}"),
            GatewayError::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
            GatewayError::MissingAccessToken => {
                f.write_str("authorize response missing access token")
            }
            GatewayError::Upstream { status, body } => {
                write!(f, "gateway api error: status={status} body={body}")
            }
            GatewayError::Deserialization(e) => {
                write!(f, "gateway response deserialization: {e}")
            }
        }
    }
}
