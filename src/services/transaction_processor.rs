//! Screening pipeline for a single transaction.
//!
//! RECEIVED -> VALIDATED -> EVALUATED -> {SUCCESS | FAILED | PENDING} -> PERSISTED.
//! Structurally invalid input skips straight to FAILED without reading the store.
//! Every completed pass performs exactly one insert; store errors abort the pass
//! before anything is written.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RulesConfig;
use crate::domain::{Outcome, RiskSignal, Transaction};
use crate::ports::{StoreError, TransactionStore};
use crate::services::fraud_rules::{Aggregates, FraudRuleEngine};
use crate::services::sender_locks::SenderLocks;
use crate::validation::validate_structure;

pub const NO_FRAUD_MESSAGE: &str = "No fraud detected";

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Aggregate query failed: {0}")]
    AggregateQuery(#[source] StoreError),

    #[error("Persisting transaction failed: {0}")]
    Persistence(#[source] StoreError),
}

/// A transaction as persisted, with the outcome that decorated it.
#[derive(Debug, Clone)]
pub struct ProcessedTransaction {
    pub transaction: Transaction,
    pub outcome: Outcome,
}

impl ProcessedTransaction {
    /// Human-readable summary of the screening result.
    pub fn summary(&self) -> String {
        match &self.outcome {
            Outcome::Accepted => NO_FRAUD_MESSAGE.to_string(),
            other => other.fraud_reason(),
        }
    }
}

#[derive(Clone)]
pub struct TransactionProcessor {
    store: Arc<dyn TransactionStore>,
    engine: Arc<FraudRuleEngine>,
    sender_locks: Option<SenderLocks>,
}

impl TransactionProcessor {
    pub fn new(store: Arc<dyn TransactionStore>, rules: RulesConfig) -> Self {
        let sender_locks = rules.serialize_per_sender.then(SenderLocks::new);
        Self {
            store,
            engine: Arc::new(FraudRuleEngine::new(rules)),
            sender_locks,
        }
    }

    pub async fn process(&self, mut tx: Transaction) -> Result<ProcessedTransaction, ProcessingError> {
        let _sender_guard = match &self.sender_locks {
            Some(locks) => Some(locks.lock(&tx.sender_account).await),
            None => None,
        };

        tx.timestamp = Some(Utc::now());
        debug!(transaction_id = %tx.transaction_id, stage = "received", "Screening transaction");

        let outcome = match validate_structure(&tx) {
            Err(rejection) => {
                warn!(
                    transaction_id = %tx.transaction_id,
                    reason = %rejection,
                    "Transaction failed structural validation"
                );
                Outcome::Rejected(rejection)
            }
            Ok(()) => {
                debug!(transaction_id = %tx.transaction_id, stage = "validated");
                let aggregates = self
                    .fetch_aggregates(&tx.sender_account)
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            transaction_id = %tx.transaction_id,
                            error = %e,
                            "Aggregate query failed, aborting without persisting"
                        );
                        ProcessingError::AggregateQuery(e)
                    })?;

                let signals = self.engine.evaluate(&tx, &aggregates);
                debug!(
                    transaction_id = %tx.transaction_id,
                    stage = "evaluated",
                    signals = signals.len()
                );

                if signals.is_empty() {
                    Outcome::Accepted
                } else {
                    Outcome::Flagged(signals)
                }
            }
        };

        tx.settle(&outcome);

        let stored = self.store.insert(&tx).await.map_err(|e| {
            tracing::error!(
                transaction_id = %tx.transaction_id,
                error = %e,
                "Failed to persist screened transaction"
            );
            ProcessingError::Persistence(e)
        })?;

        info!(
            transaction_id = %stored.transaction_id,
            sender = %stored.sender_account,
            status = %outcome.status(),
            fraud_flag = stored.fraud_flag,
            "Transaction persisted"
        );

        Ok(ProcessedTransaction {
            transaction: stored,
            outcome,
        })
    }

    /// Queries only the aggregates some enabled rule consumes.
    async fn fetch_aggregates(&self, sender_account: &str) -> Result<Aggregates, StoreError> {
        let rules = self.engine.rules();
        let mut aggregates = Aggregates::default();

        if rules.is_enabled(RiskSignal::HighVelocity) {
            aggregates.recent_count = self
                .store
                .count_recent(sender_account, rules.velocity_window)
                .await?;
        }
        if rules.is_enabled(RiskSignal::AmountSpike) {
            aggregates.recent_avg_amount = self
                .store
                .avg_amount_recent(sender_account, rules.velocity_window)
                .await?;
        }
        // Every transaction reaching this point is a well-formed attempt.
        if rules.is_enabled(RiskSignal::RepeatedFailures) {
            aggregates.recent_failed_count = self
                .store
                .count_recent_failed(sender_account, rules.failed_window)
                .await?;
        }

        Ok(aggregates)
    }
}
