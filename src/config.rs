use std::time::Duration;

use anyhow::Context;

use crate::gateway::PaypackGateway;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_PORT: u16 = 3030;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub callback: CallbackConfig,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub port: u16,
}

/// Paypack application credentials and endpoint.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
}

/// Destination for subscription outcome callbacks.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub url: String,
    pub secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let gateway = GatewayConfig {
            app_id: require("PAYPACK_APP_ID")?,
            app_secret: require("PAYPACK_APP_SECRET")?,
            base_url: optional("PAYPACK_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| PaypackGateway::DEFAULT_BASE_URL.to_string()),
        };
        let callback = CallbackConfig {
            url: require("SUBSCRIPTION_CALLBACK_URL")?,
            secret: optional("SUBSCRIPTION_CALLBACK_SECRET"),
        };
        Ok(Self {
            gateway,
            callback,
            poll_interval: duration_var("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL)?,
            poll_timeout: duration_var("POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT)?,
            port: match optional("PORT") {
                Some(port) => port.parse().context("PORT must be a port number")?,
                None => DEFAULT_PORT,
            },
        })
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{key} must be set"))
}

fn duration_var(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match optional(key) {
        Some(secs) => {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("{key} must be a number of seconds"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}
