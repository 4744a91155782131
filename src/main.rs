//! This project is split in 2 main modules:
//!
//! - [gateway] (Paypack API client)
//! - [subscription] (connector API surface)
#![doc = include_str!("../README.md")]

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use axum::Router;
use tracing_subscriber::EnvFilter;

mod config;
/// Paypack integration implementation
///
/// This module defines the types and methods to communicate with the Paypack
/// mobile-money gateway.
mod gateway;
mod state;
/// Subscription processing surface
///
/// This module defines the connector's own API: subscription intake,
/// disbursements, transaction lookups and outcome callbacks.
mod subscription;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };

    let config = config::Config::from_env().expect("configuration is incomplete");
    let gate = gateway::PaypackGateway::new(&config.gateway);
    let callback = subscription::callback::HttpsCallback::new(&config.callback);
    let processor = subscription::processor::Processor::new(
        gate.clone(),
        config.poll_interval,
        config.poll_timeout,
    )
    .with_callback(Arc::new(callback));
    let state = state::AppState::new(gate, Arc::new(processor));

    let app = Router::new()
        .merge(subscription::api::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .await
        .unwrap();

    tracing::info!("Serving on port {port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();
}
