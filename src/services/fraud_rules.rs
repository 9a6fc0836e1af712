//! Heuristic fraud rules.
//!
//! The engine never touches the store. Sender history arrives pre-fetched as
//! [`Aggregates`], so evaluation is a pure function of the transaction, the
//! aggregates and the rule configuration.

use crate::config::RulesConfig;
use crate::domain::{AmountAverage, RiskSignal, Transaction};

/// Sender-scoped history summaries over the configured windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    /// Prior transactions in the velocity window.
    pub recent_count: i64,
    /// Mean prior amount in the velocity window; `None` without history.
    pub recent_avg_amount: Option<AmountAverage>,
    /// Prior FAILED transactions in the failed-attempt window.
    pub recent_failed_count: i64,
}

#[derive(Debug, Clone)]
pub struct FraudRuleEngine {
    rules: RulesConfig,
}

impl FraudRuleEngine {
    pub fn new(rules: RulesConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Returns every enabled rule that fires, in evaluation order.
    pub fn evaluate(&self, tx: &Transaction, aggregates: &Aggregates) -> Vec<RiskSignal> {
        RiskSignal::ALL
            .into_iter()
            .filter(|signal| self.rules.is_enabled(*signal))
            .filter(|signal| self.fires(*signal, tx, aggregates))
            .collect()
    }

    fn fires(&self, signal: RiskSignal, tx: &Transaction, aggregates: &Aggregates) -> bool {
        match signal {
            RiskSignal::HighAmount => tx.amount > self.rules.high_amount_threshold,
            RiskSignal::SuspiciousIp => tx
                .ip_address
                .as_deref()
                .map_or(false, |ip| self.rules.is_suspicious_origin(ip)),
            RiskSignal::HighVelocity => aggregates.recent_count >= self.rules.velocity_threshold,
            RiskSignal::AmountSpike => match &aggregates.recent_avg_amount {
                Some(avg) if avg.is_positive() => {
                    avg.exceeded_by(&tx.amount, &self.rules.spike_multiplier)
                }
                _ => false,
            },
            RiskSignal::RepeatedFailures => {
                aggregates.recent_failed_count >= self.rules.failed_attempts_threshold
            }
        }
    }
}
