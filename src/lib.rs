pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod services;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::ports::TransactionStore;
use crate::services::TransactionProcessor;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub processor: TransactionProcessor,
}

impl AppState {
    pub fn new(store: Arc<dyn TransactionStore>, rules: config::RulesConfig) -> Self {
        let processor = TransactionProcessor::new(store.clone(), rules);
        Self { store, processor }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/transactions",
            post(handlers::transactions::create_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/transactions/fraud",
            get(handlers::transactions::list_fraud_transactions),
        )
        .route(
            "/api/transactions/success",
            get(handlers::transactions::list_successful),
        )
        .route(
            "/api/transactions/failed",
            get(handlers::transactions::list_failed),
        )
        .route(
            "/api/transactions/pending",
            get(handlers::transactions::list_pending),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
