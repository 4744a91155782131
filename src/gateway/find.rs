use serde::{Deserialize, Serialize};

use crate::{
    gateway::{GatewayError, PaypackGateway, Result, Transaction, mask},
    subscription::interaction_log::InteractionSpan,
};

/// Classified outcome of a find-by-reference call.
///
/// The provider answers a miss either with a 404 or with a 200 carrying a
/// message-only body, so the classification looks at both: a body decoding
/// into a [Transaction] with a non-empty `ref` is a hit, a message-only body
/// or a 404 is a miss, anything else is a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransactionLookup {
    Found(Transaction),
    NotFound { message: String },
}

#[derive(Debug, Deserialize)]
struct TransactionNotFound {
    #[serde(default)]
    message: String,
}

impl PaypackGateway {
    /// Fetch a transaction by its provider-assigned reference.
    pub async fn find_transaction(
        &self,
        reference: &str,
        span: &mut InteractionSpan,
    ) -> Result<TransactionLookup> {
        if reference.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("reference is required"));
        }

        let token = self.access_token().await?;
        let url = self.url(&format!("/api/transactions/find/{reference}"));
        tracing::debug!(%url, "Gateway find request");
        span.set_request(url.clone(), &serde_json::Value::Null);

        let body = match self
            .exchange(self.client.get(&url).bearer_auth(&token), span)
            .await
        {
            Ok(body) => body,
            Err(GatewayError::Upstream { status: 404, body }) => {
                let message = serde_json::from_str::<TransactionNotFound>(&body)
                    .map(|miss| miss.message)
                    .ok()
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "transaction not found".to_string());
                tracing::debug!(%message, "Gateway find miss");
                return Ok(TransactionLookup::NotFound { message });
            }
            Err(e) => return Err(e),
        };

        let response: serde_json::Value = serde_json::from_str(&body)?;
        let secured_response = mask::secure_value(&response);
        span.set_response(&secured_response);
        tracing::debug!(data = %secured_response, "Gateway find response");

        if let Ok(transaction) = serde_json::from_value::<Transaction>(response.clone()) {
            if !transaction.reference.is_empty() {
                return Ok(TransactionLookup::Found(transaction));
            }
        }
        if let Ok(miss) = serde_json::from_value::<TransactionNotFound>(response) {
            if !miss.message.is_empty() {
                return Ok(TransactionLookup::NotFound {
                    message: miss.message,
                });
            }
        }
        Err(GatewayError::unexpected_payload(&body))
    }
}
