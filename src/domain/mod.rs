//! Domain types shared by the screening pipeline and the stores.

pub mod transaction;

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub use transaction::{Currency, Outcome, Transaction, TransactionStatus, NO_FRAUD_REASON};

/// A fraud heuristic that fired for a transaction.
///
/// Variants are declared in evaluation order; that order is the order reasons are
/// concatenated into the persisted fraud reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSignal {
    HighAmount,
    SuspiciousIp,
    HighVelocity,
    AmountSpike,
    RepeatedFailures,
}

impl RiskSignal {
    pub const ALL: [RiskSignal; 5] = [
        RiskSignal::HighAmount,
        RiskSignal::SuspiciousIp,
        RiskSignal::HighVelocity,
        RiskSignal::AmountSpike,
        RiskSignal::RepeatedFailures,
    ];

    /// Configuration key of the rule producing this signal.
    pub fn key(&self) -> &'static str {
        match self {
            RiskSignal::HighAmount => "high_amount",
            RiskSignal::SuspiciousIp => "suspicious_ip",
            RiskSignal::HighVelocity => "velocity",
            RiskSignal::AmountSpike => "amount_spike",
            RiskSignal::RepeatedFailures => "failed_attempts",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RiskSignal::HighAmount => "High amount.",
            RiskSignal::SuspiciousIp => "Suspicious IP.",
            RiskSignal::HighVelocity => "High transaction velocity.",
            RiskSignal::AmountSpike => "Rapid amount spike.",
            RiskSignal::RepeatedFailures => "Multiple failed attempts before success.",
        }
    }
}

impl fmt::Display for RiskSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl FromStr for RiskSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        RiskSignal::ALL
            .into_iter()
            .find(|signal| signal.key() == key)
            .ok_or_else(|| format!("unknown fraud rule '{}'", s.trim()))
    }
}

/// Mean of a sender's recent amounts, kept as an exact sum and count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountAverage {
    pub total: BigDecimal,
    pub count: i64,
}

impl AmountAverage {
    /// `None` for an empty window.
    pub fn new(total: BigDecimal, count: i64) -> Option<Self> {
        (count > 0).then_some(Self { total, count })
    }

    pub fn is_positive(&self) -> bool {
        self.total > BigDecimal::from(0)
    }

    /// `amount > mean * multiplier`, compared without dividing.
    pub fn exceeded_by(&self, amount: &BigDecimal, multiplier: &BigDecimal) -> bool {
        amount * &BigDecimal::from(self.count) > &self.total * multiplier
    }
}
