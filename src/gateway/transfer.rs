use std::fmt::Display;

use serde::Serialize;

use crate::{
    gateway::{GatewayError, PaypackGateway, Result, Transaction, mask},
    subscription::interaction_log::InteractionSpan,
};

#[derive(Debug, Clone, Copy)]
enum TransferKind {
    CashIn,
    CashOut,
}

impl Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashIn => f.write_str("cashin"),
            Self::CashOut => f.write_str("cashout"),
        }
    }
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    amount: f64,
    number: &'a str,
}

impl PaypackGateway {
    /// Collect `amount` from the subscriber's mobile-money account.
    pub async fn cash_in(
        &self,
        number: &str,
        amount: f64,
        span: &mut InteractionSpan,
    ) -> Result<Transaction> {
        self.transfer(TransferKind::CashIn, number, amount, span)
            .await
    }

    /// Disburse `amount` to the subscriber's mobile-money account.
    pub async fn cash_out(
        &self,
        number: &str,
        amount: f64,
        span: &mut InteractionSpan,
    ) -> Result<Transaction> {
        self.transfer(TransferKind::CashOut, number, amount, span)
            .await
    }

    async fn transfer(
        &self,
        kind: TransferKind,
        number: &str,
        amount: f64,
        span: &mut InteractionSpan,
    ) -> Result<Transaction> {
        if number.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("number is required"));
        }
        if amount <= 0.0 {
            return Err(GatewayError::InvalidRequest("amount must be positive"));
        }

        let token = self.access_token().await?;
        let request = TransferRequest { amount, number };
        let url = self.url(&format!("/api/transactions/{kind}"));
        let secured_request = mask::secure_serializable(&request);
        tracing::debug!(%url, data = %secured_request, "Gateway {kind} request");
        span.set_request(url.clone(), &secured_request);

        let body = self
            .exchange(
                self.client.post(&url).bearer_auth(&token).json(&request),
                span,
            )
            .await?;
        let response: serde_json::Value = serde_json::from_str(&body)?;
        let secured_response = mask::secure_value(&response);
        span.set_response(&secured_response);
        tracing::debug!(data = %secured_response, "Gateway {kind} response");

        let transaction: Transaction = serde_json::from_value(response)?;
        if transaction.reference.is_empty() {
            return Err(GatewayError::unexpected_payload(&body));
        }
        Ok(transaction)
    }
}
