use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    gateway::{GatewayError, PaypackGateway, Result, mask},
    subscription::interaction_log::InteractionSpan,
};

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Token pair returned by the Paypack authorization endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub refresh: String,
    #[serde(default)]
    pub expires: u64,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Default)]
pub(super) struct TokenCache {
    current: Option<CachedToken>,
}

#[derive(Debug)]
struct CachedToken {
    access: String,
    valid_until: Instant,
}

impl TokenCache {
    fn valid_access(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|token| Instant::now() < token.valid_until)
            .map(|token| token.access.as_str())
    }

    fn store(&mut self, auth: &AuthResponse) {
        let mut lifetime = Duration::from_secs(auth.expires);
        if lifetime.is_zero() {
            lifetime = DEFAULT_TOKEN_LIFETIME;
        }
        let buffer = if lifetime <= EXPIRY_BUFFER {
            lifetime / 2
        } else {
            EXPIRY_BUFFER
        };
        self.current = Some(CachedToken {
            access: auth.access.clone(),
            valid_until: Instant::now() + (lifetime - buffer),
        });
    }
}

impl PaypackGateway {
    /// Exchange the application credentials for a fresh token pair.
    pub async fn authorize(&self, span: &mut InteractionSpan) -> Result<AuthResponse> {
        let request = AuthRequest {
            client_id: &self.app_id,
            client_secret: &self.app_secret,
        };
        let url = self.url("/api/auth/agents/authorize");
        let secured_request = mask::secure_serializable(&request);
        tracing::debug!(%url, data = %secured_request, "Gateway authorize request");
        span.set_request(url.clone(), &secured_request);

        let body = self
            .exchange(self.client.post(&url).json(&request), span)
            .await?;
        let response: serde_json::Value = serde_json::from_str(&body)?;
        let secured_response = mask::secure_value(&response);
        span.set_response(&secured_response);
        tracing::debug!(data = %secured_response, "Gateway authorize response");

        let auth: AuthResponse = serde_json::from_value(response)?;
        if auth.access.is_empty() {
            return Err(GatewayError::MissingAccessToken);
        }
        Ok(auth)
    }

    /// Return a bearer token, reusing the cached one until it nears expiry.
    pub(super) async fn access_token(&self) -> Result<String> {
        let mut cache = self.tokens.lock().await;
        if let Some(access) = cache.valid_access() {
            return Ok(access.to_string());
        }
        let mut span = InteractionSpan::enter();
        let auth = self.authorize(&mut span).await?;
        cache.store(&auth);
        Ok(auth.access)
    }
}
