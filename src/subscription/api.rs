use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    gateway::{Transaction, TransactionLookup},
    state::AppState,
    subscription::{
        Result, SubscriptionErrorResponse,
        interaction_log::{InteractionLog, InteractionSpan},
        processor::{SubscriptionEvent, SubscriptionResponse},
    },
};

#[instrument(skip_all)]
async fn subscribe(
    State(AppState { processor, .. }): State<AppState>,
    Json(event): Json<SubscriptionEvent>,
) -> Result<ApiResponse<SubscriptionResponse>> {
    let (response, logs) = processor.handle(event).await?;
    tracing::info!(reference = %response.reference, found = response.found, "Processed subscription");
    Ok(ApiResponse::new(response, logs))
}

#[derive(Debug, Deserialize)]
pub struct DisbursementRequest {
    pub number: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct DisbursementResponse {
    #[serde(rename = "ref")]
    reference: String,
    status: String,
    transaction: Transaction,
}

#[instrument(skip_all)]
async fn disburse(
    State(AppState { gate, .. }): State<AppState>,
    Json(request): Json<DisbursementRequest>,
) -> Result<ApiResponse<DisbursementResponse>> {
    let mut span = InteractionSpan::enter();
    match gate
        .cash_out(&request.number, request.amount, &mut span)
        .await
    {
        Ok(transaction) => {
            let log = span.interaction_log("cashout");
            tracing::info!(reference = %transaction.reference, "Initiated disbursement");
            Ok(ApiResponse::new(
                DisbursementResponse {
                    reference: transaction.reference.clone(),
                    status: transaction.status.clone(),
                    transaction,
                },
                vec![log],
            ))
        }
        Err(e) => {
            tracing::error!("Failed to initiate disbursement: {e}");
            let log = span.interaction_log("cashout");
            Err(SubscriptionErrorResponse::new(e.to_string(), vec![log]))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<TransactionLookup> for LookupResponse {
    fn from(value: TransactionLookup) -> Self {
        match value {
            TransactionLookup::Found(transaction) => Self {
                found: true,
                transaction: Some(transaction),
                message: None,
            },
            TransactionLookup::NotFound { message } => Self {
                found: false,
                transaction: None,
                message: Some(message),
            },
        }
    }
}

#[instrument(skip_all)]
async fn find_transaction(
    State(AppState { gate, .. }): State<AppState>,
    Path(reference): Path<String>,
) -> Result<ApiResponse<LookupResponse>> {
    let mut span = InteractionSpan::enter();
    match gate.find_transaction(&reference, &mut span).await {
        Ok(lookup) => {
            let log = span.interaction_log("find");
            tracing::info!(%reference, "Dispatched transaction lookup");
            Ok(ApiResponse::new(lookup.into(), vec![log]))
        }
        Err(e) => {
            tracing::error!("Failed to look up transaction: {e}");
            let log = span.interaction_log("find");
            Err(SubscriptionErrorResponse::new(e.to_string(), vec![log]))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    result: bool,
    logs: Vec<InteractionLog>,
    #[serde(flatten)]
    data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, logs: Vec<InteractionLog>) -> Self {
        Self {
            result: true,
            logs,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let value = serde_json::to_value(self).unwrap();
        tracing::debug!(data = %crate::gateway::mask::secure_value(&value), "Connector API response payload");
        axum::Json(value).into_response()
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/subscriptions", post(subscribe))
        .route("/disbursements", post(disburse))
        .route("/transactions/{reference}", get(find_transaction))
}

/// `Json` extractor wrapper that customizes the error from `axum::extract::Json`
pub struct Json<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = axum::Json<SubscriptionErrorResponse>;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let rejection = match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => return Ok(Self(value)),
            Err(e) => e.to_string(),
        };
        Err(axum::Json(SubscriptionErrorResponse::new(rejection, vec![])))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::{
        gateway::testing::MockProvider,
        state::AppState,
        subscription::processor::Processor,
    };

    async fn start_connector(provider: &MockProvider) -> String {
        let gate = provider.gateway();
        let processor = Processor::new(
            gate.clone(),
            Duration::from_millis(5),
            Duration::from_millis(200),
        );
        let state = AppState::new(gate, Arc::new(processor));
        let app = super::router().with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        base_url
    }

    #[tokio::test]
    async fn subscription_round_trip_masks_requisites_in_logs() {
        let provider = MockProvider::start().await;
        provider.set_find(
            200,
            json!({
                "ref": "dbed4dbb-f1bd-433d-ba57-e383c5faa96b",
                "status": "success",
                "amount": 1000.0,
                "kind": "CASHIN",
                "provider": "mtn",
                "timestamp": "2026-05-14T09:30:00Z",
            }),
        );
        let base_url = start_connector(&provider).await;

        let response: Value = reqwest::Client::new()
            .post(format!("{base_url}/subscriptions"))
            .json(&json!({ "number": "250788123456", "amount": 1000.0 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"], true);
        assert_eq!(response["found"], true);
        assert_eq!(response["ref"], "dbed4dbb-f1bd-433d-ba57-e383c5faa96b");
        assert_eq!(response["status"], "success");

        let logs = response["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["kind"], "cashin");
        assert_eq!(logs[0]["request"]["params"]["number"], "********3456");
        assert_eq!(logs[1]["kind"], "find");
    }

    #[tokio::test]
    async fn malformed_body_yields_error_envelope() {
        let provider = MockProvider::start().await;
        let base_url = start_connector(&provider).await;

        let response: Value = reqwest::Client::new()
            .post(format!("{base_url}/subscriptions"))
            .header("content-type", "application/json")
            .body("{\"number\":")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"], false);
        assert!(response["error"].as_str().is_some());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn disbursement_passes_through_to_cash_out() {
        let provider = MockProvider::start().await;
        let base_url = start_connector(&provider).await;

        let response: Value = reqwest::Client::new()
            .post(format!("{base_url}/disbursements"))
            .json(&json!({ "number": "250788123456", "amount": 750.0 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"], true);
        assert_eq!(response["ref"], "dbed4dbb-f1bd-433d-ba57-e383c5faa96b");
        let calls = provider.calls();
        assert_eq!(calls.last().unwrap().path, "/api/transactions/cashout");
    }

    #[tokio::test]
    async fn lookup_route_reports_misses() {
        let provider = MockProvider::start().await;
        provider.set_find(404, json!({ "message": "transaction not found" }));
        let base_url = start_connector(&provider).await;

        let response: Value = reqwest::Client::new()
            .get(format!("{base_url}/transactions/unknown-ref"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"], true);
        assert_eq!(response["found"], false);
        assert_eq!(response["message"], "transaction not found");
    }

    #[tokio::test]
    async fn lookup_route_wraps_gateway_failures() {
        let provider = MockProvider::start().await;
        provider.set_find(500, json!({ "message": "boom" }));
        let base_url = start_connector(&provider).await;

        let response: Value = reqwest::Client::new()
            .get(format!("{base_url}/transactions/some-ref"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"], false);
        assert!(
            response["error"]
                .as_str()
                .unwrap()
                .contains("gateway api error")
        );
        assert_eq!(response["logs"].as_array().unwrap().len(), 1);
    }
}
