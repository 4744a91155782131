use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    gateway::{self, PaypackGateway, Transaction, TransactionLookup, mask::MaskPolicy},
    subscription::{
        SubscriptionErrorResponse,
        callback::CallbackSender,
        interaction_log::{InteractionLog, InteractionSpan},
    },
};

/// The subset of the Paypack client the processor drives.
pub trait PaymentApi: Send + Sync {
    fn cash_in(
        &self,
        number: &str,
        amount: f64,
        span: &mut InteractionSpan,
    ) -> impl Future<Output = gateway::Result<Transaction>> + Send;

    fn find_transaction(
        &self,
        reference: &str,
        span: &mut InteractionSpan,
    ) -> impl Future<Output = gateway::Result<TransactionLookup>> + Send;
}

impl PaymentApi for PaypackGateway {
    async fn cash_in(
        &self,
        number: &str,
        amount: f64,
        span: &mut InteractionSpan,
    ) -> gateway::Result<Transaction> {
        PaypackGateway::cash_in(self, number, amount, span).await
    }

    async fn find_transaction(
        &self,
        reference: &str,
        span: &mut InteractionSpan,
    ) -> gateway::Result<TransactionLookup> {
        PaypackGateway::find_transaction(self, reference, span).await
    }
}

/// The payload accepted by the subscription route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub number: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// The outcome emitted once processing concludes, both as the route response
/// and as the callback payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionResponse {
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub request: SubscriptionEvent,
}

/// Coordinates cash-in and confirmation polling.
#[derive(Debug)]
pub struct Processor<C> {
    client: C,
    poll_interval: Duration,
    poll_timeout: Duration,
    callback: Option<Arc<dyn CallbackSender>>,
}

impl<C: PaymentApi> Processor<C> {
    pub fn new(client: C, poll_interval: Duration, poll_timeout: Duration) -> Self {
        Self {
            client,
            poll_interval,
            poll_timeout,
            callback: None,
        }
    }

    /// Wire a callback destination invoked after processing concludes.
    pub fn with_callback(mut self, callback: Arc<dyn CallbackSender>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub async fn handle(
        &self,
        event: SubscriptionEvent,
    ) -> Result<(SubscriptionResponse, Vec<InteractionLog>), SubscriptionErrorResponse> {
        if let Err(reason) = validate(&event) {
            return Err(SubscriptionErrorResponse::new(reason.to_string(), vec![]));
        }

        let mut logs = Vec::new();
        tracing::info!(
            number = %crate::gateway::mask::Masked::mask(&event.number),
            amount = event.amount,
            "Initiating cash-in"
        );
        let mut span = InteractionSpan::enter();
        let transaction = match self.client.cash_in(&event.number, event.amount, &mut span).await {
            Ok(transaction) => {
                logs.push(span.interaction_log("cashin"));
                transaction
            }
            Err(e) => {
                tracing::error!("Cash-in failed: {e}");
                logs.push(span.interaction_log("cashin"));
                return Err(SubscriptionErrorResponse::new(
                    format!("cash-in failed: {e}"),
                    logs,
                ));
            }
        };

        let reference = transaction.reference.clone();
        tracing::info!(%reference, "Cash-in accepted; polling for confirmation");
        match self.poll(&reference, &mut logs).await {
            Ok(Some(confirmed)) => {
                tracing::info!(%reference, status = %confirmed.status, "Transaction confirmed");
                let response = SubscriptionResponse {
                    reference,
                    status: confirmed.status.clone(),
                    found: true,
                    transaction: Some(confirmed),
                    message: None,
                    request: event,
                };
                self.emit_callback(&response).await;
                Ok((response, logs))
            }
            Ok(None) => {
                tracing::warn!(%reference, "Transaction not confirmed before timeout");
                let response = SubscriptionResponse {
                    reference,
                    status: "failed".to_string(),
                    found: false,
                    transaction: None,
                    message: Some(format!(
                        "transaction not confirmed within {}s",
                        self.poll_timeout.as_secs()
                    )),
                    request: event,
                };
                self.emit_callback(&response).await;
                Ok((response, logs))
            }
            Err(e) => {
                tracing::error!("Transaction polling failed: {e}");
                Err(SubscriptionErrorResponse::new(
                    format!("transaction lookup failed: {e}"),
                    logs,
                ))
            }
        }
    }

    /// Poll the lookup endpoint until the transaction appears or the
    /// deadline passes; only the concluding exchange is kept in `logs`.
    async fn poll(
        &self,
        reference: &str,
        logs: &mut Vec<InteractionLog>,
    ) -> gateway::Result<Option<Transaction>> {
        let deadline = Instant::now() + self.poll_timeout;
        let mut last_miss = None;
        loop {
            let mut span = InteractionSpan::enter();
            match self.client.find_transaction(reference, &mut span).await {
                Ok(TransactionLookup::Found(transaction)) => {
                    logs.push(span.interaction_log("find"));
                    return Ok(Some(transaction));
                }
                Ok(TransactionLookup::NotFound { message }) => {
                    tracing::debug!(%reference, %message, "Transaction not ready; waiting");
                    last_miss = Some(span.interaction_log("find"));
                }
                Err(e) => {
                    logs.push(span.interaction_log("find"));
                    return Err(e);
                }
            }
            if Instant::now() + self.poll_interval >= deadline {
                logs.extend(last_miss);
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn emit_callback(&self, response: &SubscriptionResponse) {
        let Some(callback) = &self.callback else {
            return;
        };
        if let Err(e) = callback.deliver(response).await {
            tracing::error!("Callback delivery failed: {e}");
        }
    }
}

fn validate(event: &SubscriptionEvent) -> Result<(), &'static str> {
    if event.number.trim().is_empty() {
        return Err("number is required");
    }
    if event.amount <= 0.0 {
        return Err("amount must be positive");
    }
    Ok(())
}
