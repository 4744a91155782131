use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    config::GatewayConfig, gateway::auth::TokenCache,
    subscription::interaction_log::InteractionSpan,
};

mod auth;
mod error;
mod find;
/// Requisite masking
pub mod mask;
mod transfer;

pub use auth::AuthResponse;
pub use error::GatewayError;
pub use find::TransactionLookup;

pub type Result<T> = std::result::Result<T, GatewayError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A payment transaction as reported by Paypack.
///
/// Every field is tolerated missing so that bodies which are not
/// transactions (e.g. a lookup miss) still decode and can be classified by
/// the presence of `ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub merchant: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<time::OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<time::OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct PaypackGateway {
    client: reqwest::Client,
    base_url: Arc<str>,
    app_id: Arc<str>,
    app_secret: Arc<str>,
    tokens: Arc<Mutex<TokenCache>>,
}

impl PaypackGateway {
    pub const DEFAULT_BASE_URL: &str = "https://payments.paypack.rw";

    pub fn new(config: &GatewayConfig) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client is buildable");
        Self {
            client,
            base_url: config.base_url.as_str().into(),
            app_id: config.app_id.as_str().into(),
            app_secret: config.app_secret.as_str().into(),
            tokens: Arc::new(Mutex::new(TokenCache::default())),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a prepared request and return the status with the raw body.
    ///
    /// Non-success statuses become [GatewayError::Upstream] carrying the body
    /// verbatim; callers that care about specific statuses (the 404 of a
    /// lookup miss) match on the error.
    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
        span: &mut InteractionSpan,
    ) -> Result<String> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        span.set_response_status(status);
        let body = response.text().await?;
        if status >= 400 {
            return Err(GatewayError::Upstream { status, body });
        }
        Ok(body)
    }
}

/// An in-process stand-in for the Paypack API, recording every call it
/// receives.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::PaypackGateway;
    use crate::config::GatewayConfig;

    #[derive(Debug, Clone)]
    pub(crate) struct RecordedCall {
        pub(crate) method: String,
        pub(crate) path: String,
        pub(crate) bearer: Option<String>,
        pub(crate) body: Option<Value>,
    }

    #[derive(Debug)]
    struct ProviderState {
        calls: Mutex<Vec<RecordedCall>>,
        authorize: Mutex<(u16, Value)>,
        transfer: Mutex<(u16, Value)>,
        find: Mutex<(u16, Value)>,
    }

    impl ProviderState {
        fn record(&self, method: &str, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
            let bearer = headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.to_string());
            self.calls.lock().unwrap().push(RecordedCall {
                method: method.to_string(),
                path: uri.path().to_string(),
                bearer,
                body,
            });
        }
    }

    pub(crate) struct MockProvider {
        state: Arc<ProviderState>,
        base_url: String,
    }

    impl MockProvider {
        pub(crate) async fn start() -> Self {
            let state = Arc::new(ProviderState {
                calls: Mutex::new(Vec::new()),
                authorize: Mutex::new((
                    200,
                    json!({ "access": "tkn-access", "refresh": "tkn-refresh", "expires": 3600 }),
                )),
                transfer: Mutex::new((200, Self::transaction())),
                find: Mutex::new((200, Self::transaction())),
            });
            let app = Router::new()
                .route("/api/auth/agents/authorize", post(authorize))
                .route("/api/transactions/{kind}", post(transfer))
                .route("/api/transactions/find/{reference}", get(find))
                .with_state(state.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            Self { state, base_url }
        }

        /// The transaction payload the provider answers with by default.
        pub(crate) fn transaction() -> Value {
            json!({
                "ref": "dbed4dbb-f1bd-433d-ba57-e383c5faa96b",
                "status": "pending",
                "amount": 1000.0,
                "fee": 23.0,
                "kind": "CASHIN",
                "provider": "mtn",
                "client": "250788123456",
                "merchant": "agent-01",
                "timestamp": "2026-05-14T09:30:00Z",
            })
        }

        pub(crate) fn gateway(&self) -> PaypackGateway {
            PaypackGateway::new(&GatewayConfig {
                app_id: "app-id".to_string(),
                app_secret: "app-secret".to_string(),
                base_url: self.base_url.clone(),
            })
        }

        pub(crate) fn calls(&self) -> Vec<RecordedCall> {
            self.state.calls.lock().unwrap().clone()
        }

        pub(crate) fn set_authorize(&self, status: u16, body: Value) {
            *self.state.authorize.lock().unwrap() = (status, body);
        }

        pub(crate) fn set_transfer(&self, status: u16, body: Value) {
            *self.state.transfer.lock().unwrap() = (status, body);
        }

        pub(crate) fn set_find(&self, status: u16, body: Value) {
            *self.state.find.lock().unwrap() = (status, body);
        }
    }

    async fn authorize(
        State(state): State<Arc<ProviderState>>,
        uri: Uri,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        state.record("POST", &uri, &headers, Some(body));
        respond(&state.authorize)
    }

    async fn transfer(
        State(state): State<Arc<ProviderState>>,
        uri: Uri,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        state.record("POST", &uri, &headers, Some(body));
        respond(&state.transfer)
    }

    async fn find(
        State(state): State<Arc<ProviderState>>,
        uri: Uri,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        state.record("GET", &uri, &headers, None);
        respond(&state.find)
    }

    fn respond(configured: &Mutex<(u16, Value)>) -> (StatusCode, Json<Value>) {
        let (status, body) = configured.lock().unwrap().clone();
        (StatusCode::from_u16(status).unwrap(), Json(body))
    }
}
