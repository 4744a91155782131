use std::sync::Arc;

use crate::{gateway::PaypackGateway, subscription::processor::Processor};

#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub gate: PaypackGateway,
    pub processor: Arc<Processor<PaypackGateway>>,
}

impl AppState {
    pub fn new(gate: PaypackGateway, processor: Arc<Processor<PaypackGateway>>) -> Self {
        Self { gate, processor }
    }
}
