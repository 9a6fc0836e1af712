//! Store port consumed by the screening core.
//! Implementations live in `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::domain::{AmountAverage, Transaction, TransactionStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The backing store cannot be reached right now (pool exhausted or closed, I/O).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction {0} has no outcome assigned")]
    Unsettled(String),

    #[error("Window of {0} is out of range")]
    InvalidWindow(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lower bound of the window `[now - window, now)`.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> StoreResult<DateTime<Utc>> {
    now.checked_sub_signed(window)
        .ok_or(StoreError::InvalidWindow(window))
}

/// Append-only transaction record with sender-scoped windowed aggregates.
///
/// Windows cover `[now - window, now)` where `now` is the store's clock.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Appends one record and returns it as stored. Fills in the timestamp when absent.
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction>;

    async fn count_recent(&self, sender_account: &str, window: Duration) -> StoreResult<i64>;

    /// Exact sum and count of the sender's amounts; `None` when the window is empty.
    async fn avg_amount_recent(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<Option<AmountAverage>>;

    async fn count_recent_failed(&self, sender_account: &str, window: Duration)
        -> StoreResult<i64>;

    async fn find_all(&self) -> StoreResult<Vec<Transaction>>;

    async fn find_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>>;

    /// Fraud-flagged records, newest first.
    async fn find_fraud_flagged(&self) -> StoreResult<Vec<Transaction>>;

    async fn health_check(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn window_start_rejects_unrepresentable_window() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::minutes(5)).unwrap(), now - Duration::minutes(5));

        let result = window_start(now, Duration::milliseconds(i64::MAX));
        assert!(matches!(result, Err(StoreError::InvalidWindow(_))));
    }
}
