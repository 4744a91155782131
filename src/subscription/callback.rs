use std::pin::Pin;
use std::time::Duration;

use base64::{Engine, prelude::BASE64_STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::{config::CallbackConfig, subscription::processor::SubscriptionResponse};

const RETRY_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(3);
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

const SIGNATURE_HEADER: &str = "x-callback-signature";

/// Delivers subscription outcomes to downstream systems.
pub trait CallbackSender: std::fmt::Debug + Send + Sync {
    fn deliver<'a>(
        &'a self,
        outcome: &'a SubscriptionResponse,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

/// Posts subscription outcomes as JSON to an HTTPS endpoint, signing the
/// body with the shared callback secret when one is configured.
#[derive(Debug, Clone)]
pub struct HttpsCallback {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl HttpsCallback {
    pub fn new(config: &CallbackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .expect("reqwest client is buildable");
        Self {
            client,
            url: config.url.clone(),
            secret: config.secret.clone(),
        }
    }

    fn signature(secret: &str, body: &[u8]) -> String {
        let mut mac: Hmac<Sha512> =
            Hmac::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(body);
        BASE64_STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl CallbackSender for HttpsCallback {
    fn deliver<'a>(
        &'a self,
        outcome: &'a SubscriptionResponse,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let body = serde_json::to_vec(outcome)?;

            for attempt in 0..RETRY_ATTEMPTS {
                let mut request = self
                    .client
                    .post(&self.url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body.clone());
                if let Some(secret) = &self.secret {
                    request = request.header(SIGNATURE_HEADER, Self::signature(secret, &body));
                }

                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(_) => return Ok(()),
                    Err(e) => {
                        tracing::error!(
                            attempt = attempt + 1,
                            "Failed to deliver subscription callback: {e}"
                        );
                        if attempt + 1 < RETRY_ATTEMPTS {
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                    }
                }
            }
            Err(anyhow::anyhow!("max attempts exceeded"))
        })
    }
}
