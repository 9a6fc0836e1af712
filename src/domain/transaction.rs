//! Transaction domain entity.
//! Framework-agnostic representation of a payment attempt and its screening outcome.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::RiskSignal;
use crate::validation::StructuralRejection;

/// Reason recorded for transactions that passed every enabled rule.
pub const NO_FRAUD_REASON: &str = "NONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Inr, Currency::Usd, Currency::Eur, Currency::Gbp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown currency '{}'", s))
    }
}

/// Terminal classification of a processed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Pending => "PENDING",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(TransactionStatus::Success),
            "FAILED" => Ok(TransactionStatus::Failed),
            "PENDING" => Ok(TransactionStatus::Pending),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// How processing concluded for a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Structurally impossible; recorded as FAILED without rule evaluation.
    Rejected(StructuralRejection),
    /// At least one rule fired; recorded as PENDING for review.
    Flagged(Vec<RiskSignal>),
    /// No rule fired.
    Accepted,
}

impl Outcome {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Outcome::Rejected(_) => TransactionStatus::Failed,
            Outcome::Flagged(_) => TransactionStatus::Pending,
            Outcome::Accepted => TransactionStatus::Success,
        }
    }

    pub fn fraud_flag(&self) -> bool {
        matches!(self, Outcome::Flagged(_))
    }

    pub fn fraud_reason(&self) -> String {
        match self {
            Outcome::Rejected(rejection) => rejection.to_string(),
            Outcome::Flagged(signals) => signals
                .iter()
                .map(RiskSignal::reason)
                .collect::<Vec<_>>()
                .join(" "),
            Outcome::Accepted => NO_FRAUD_REASON.to_string(),
        }
    }
}

/// Domain entity representing a transaction.
///
/// `status`, `fraud_flag` and `fraud_reason` stay unset until [`Transaction::settle`]
/// is called once by the processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub currency: Currency,
    pub amount: BigDecimal,
    pub sender_account: String,
    pub receiver_account: String,
    pub transaction_type: Option<String>,
    pub channel: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub status: Option<TransactionStatus>,
    pub fraud_flag: bool,
    pub fraud_reason: Option<String>,
}

impl Transaction {
    pub fn new(
        transaction_id: String,
        currency: Currency,
        amount: BigDecimal,
        sender_account: String,
        receiver_account: String,
    ) -> Self {
        Self {
            transaction_id,
            timestamp: None,
            currency,
            amount,
            sender_account,
            receiver_account,
            transaction_type: None,
            channel: None,
            ip_address: None,
            location: None,
            status: None,
            fraud_flag: false,
            fraud_reason: None,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_some()
    }

    /// Records the outcome on the transaction's decision fields.
    pub fn settle(&mut self, outcome: &Outcome) {
        debug_assert!(!self.is_settled(), "transaction outcome assigned twice");
        self.status = Some(outcome.status());
        self.fraud_flag = outcome.fraud_flag();
        self.fraud_reason = Some(outcome.fraud_reason());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new(
            "tx-1".to_string(),
            Currency::Usd,
            BigDecimal::from(100),
            "ACC-A".to_string(),
            "ACC-B".to_string(),
        )
    }

    #[test]
    fn currency_parses_only_known_codes() {
        assert_eq!("GBP".parse::<Currency>(), Ok(Currency::Gbp));
        assert!("gbp".parse::<Currency>().is_err());
        assert!("JPY".parse::<Currency>().is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Pending,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>(), Ok(status));
        }
        assert!("COMPLETED".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn accepted_outcome_clears_flag() {
        let mut tx = sample();
        tx.settle(&Outcome::Accepted);

        assert_eq!(tx.status, Some(TransactionStatus::Success));
        assert!(!tx.fraud_flag);
        assert_eq!(tx.fraud_reason.as_deref(), Some(NO_FRAUD_REASON));
    }

    #[test]
    fn flagged_outcome_joins_reasons_in_order() {
        let mut tx = sample();
        tx.settle(&Outcome::Flagged(vec![
            RiskSignal::HighAmount,
            RiskSignal::HighVelocity,
        ]));

        assert_eq!(tx.status, Some(TransactionStatus::Pending));
        assert!(tx.fraud_flag);
        assert_eq!(
            tx.fraud_reason.as_deref(),
            Some("High amount. High transaction velocity.")
        );
    }

    #[test]
    fn rejected_outcome_records_reason_without_flag() {
        let mut tx = sample();
        tx.settle(&Outcome::Rejected(StructuralRejection::SameAccount));

        assert_eq!(tx.status, Some(TransactionStatus::Failed));
        assert!(!tx.fraud_flag);
        assert_eq!(tx.fraud_reason.as_deref(), Some("Sender and receiver same"));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut tx = sample().with_ip_address("10.0.0.1");
        tx.settle(&Outcome::Accepted);
        let json = serde_json::to_value(&tx).expect("serializable");

        assert_eq!(json["transactionId"], "tx-1");
        assert_eq!(json["senderAccount"], "ACC-A");
        assert_eq!(json["ipAddress"], "10.0.0.1");
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["fraudFlag"], false);
        assert_eq!(json["fraudReason"], "NONE");
    }
}
