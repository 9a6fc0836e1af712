use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::Transaction;

/// A transaction that cannot be screened at all. Persisted as FAILED.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralRejection {
    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Sender and receiver same")]
    SameAccount,
}

/// Checks run before any rule evaluation, in order, stopping at the first failure.
pub fn validate_structure(tx: &Transaction) -> Result<(), StructuralRejection> {
    if tx.amount <= BigDecimal::from(0) {
        return Err(StructuralRejection::InvalidAmount);
    }

    if tx.sender_account == tx.receiver_account {
        return Err(StructuralRejection::SameAccount);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;
    use std::str::FromStr;

    fn tx(amount: &str, sender: &str, receiver: &str) -> Transaction {
        Transaction::new(
            "tx".to_string(),
            Currency::Eur,
            BigDecimal::from_str(amount).expect("valid decimal"),
            sender.to_string(),
            receiver.to_string(),
        )
    }

    #[test]
    fn accepts_positive_amount_between_distinct_accounts() {
        assert_eq!(validate_structure(&tx("0.01", "A", "B")), Ok(()));
    }

    #[test]
    fn rejects_zero_and_negative_amounts() {
        for amount in ["0", "0.00", "-1", "-0.01"] {
            assert_eq!(
                validate_structure(&tx(amount, "A", "B")),
                Err(StructuralRejection::InvalidAmount),
                "amount {}",
                amount
            );
        }
    }

    #[test]
    fn rejects_self_transfer() {
        assert_eq!(
            validate_structure(&tx("20", "A", "A")),
            Err(StructuralRejection::SameAccount)
        );
    }

    #[test]
    fn amount_check_runs_first() {
        assert_eq!(
            validate_structure(&tx("0", "A", "A")),
            Err(StructuralRejection::InvalidAmount)
        );
    }

    #[test]
    fn rejection_text_matches_recorded_reason() {
        assert_eq!(StructuralRejection::InvalidAmount.to_string(), "Invalid amount");
        assert_eq!(
            StructuralRejection::SameAccount.to_string(),
            "Sender and receiver same"
        );
    }
}
