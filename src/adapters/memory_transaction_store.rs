//! In-memory implementation of TransactionStore.
//! Backs `STORE_BACKEND=memory` and the test suites.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{AmountAverage, Transaction, TransactionStatus};
use crate::ports::{window_start, StoreError, StoreResult, TransactionStore};

#[derive(Clone, Default)]
pub struct MemoryTransactionStore {
    records: Arc<RwLock<Vec<Transaction>>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sender_window(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<Vec<Transaction>> {
        let now = Utc::now();
        let since = window_start(now, window)?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|tx| tx.sender_account == sender_account)
            .filter(|tx| tx.timestamp.map_or(false, |ts| in_window(ts, since, now)))
            .cloned()
            .collect())
    }
}

fn in_window(ts: DateTime<Utc>, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    ts >= since && ts < now
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        if !tx.is_settled() || tx.fraud_reason.is_none() {
            return Err(StoreError::Unsettled(tx.transaction_id.clone()));
        }

        let mut stored = tx.clone();
        stored.timestamp.get_or_insert_with(Utc::now);
        self.records.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn count_recent(&self, sender_account: &str, window: Duration) -> StoreResult<i64> {
        Ok(self.sender_window(sender_account, window).await?.len() as i64)
    }

    async fn avg_amount_recent(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<Option<AmountAverage>> {
        let recent = self.sender_window(sender_account, window).await?;
        let total = recent
            .iter()
            .fold(BigDecimal::from(0), |acc, tx| acc + &tx.amount);
        Ok(AmountAverage::new(total, recent.len() as i64))
    }

    async fn count_recent_failed(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<i64> {
        let failed = self
            .sender_window(sender_account, window)
            .await?
            .iter()
            .filter(|tx| tx.status == Some(TransactionStatus::Failed))
            .count();
        Ok(failed as i64)
    }

    async fn find_all(&self) -> StoreResult<Vec<Transaction>> {
        Ok(self.records.read().await.clone())
    }

    async fn find_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|tx| tx.status == Some(status))
            .cloned()
            .collect())
    }

    async fn find_fraud_flagged(&self) -> StoreResult<Vec<Transaction>> {
        let mut flagged: Vec<Transaction> = self
            .records
            .read()
            .await
            .iter()
            .filter(|tx| tx.fraud_flag)
            .cloned()
            .collect();
        // latest insert first among equal timestamps
        flagged.reverse();
        flagged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(flagged)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, Outcome, RiskSignal};
    use crate::validation::StructuralRejection;

    fn settled(id: &str, sender: &str, amount: i64, outcome: Outcome, age: Duration) -> Transaction {
        let mut tx = Transaction::new(
            id.to_string(),
            Currency::Inr,
            BigDecimal::from(amount),
            sender.to_string(),
            "RECV".to_string(),
        )
        .with_timestamp(Utc::now() - age);
        tx.settle(&outcome);
        tx
    }

    #[tokio::test]
    async fn insert_rejects_unsettled_transaction() {
        let store = MemoryTransactionStore::new();
        let tx = Transaction::new(
            "tx-1".to_string(),
            Currency::Usd,
            BigDecimal::from(10),
            "A".to_string(),
            "B".to_string(),
        );

        let result = store.insert(&tx).await;
        assert!(matches!(result, Err(StoreError::Unsettled(id)) if id == "tx-1"));
    }

    #[tokio::test]
    async fn insert_assigns_missing_timestamp() {
        let store = MemoryTransactionStore::new();
        let mut tx = Transaction::new(
            "tx-1".to_string(),
            Currency::Usd,
            BigDecimal::from(10),
            "A".to_string(),
            "B".to_string(),
        );
        tx.settle(&Outcome::Accepted);

        let stored = store.insert(&tx).await.unwrap();
        assert!(stored.timestamp.is_some());
    }

    #[tokio::test]
    async fn aggregates_only_cover_sender_window() {
        let store = MemoryTransactionStore::new();
        let window = Duration::minutes(5);
        for tx in [
            settled("1", "A", 100, Outcome::Accepted, Duration::minutes(1)),
            settled("2", "A", 300, Outcome::Accepted, Duration::minutes(4)),
            settled("3", "A", 9_000, Outcome::Accepted, Duration::minutes(6)),
            settled("4", "B", 700, Outcome::Accepted, Duration::minutes(1)),
        ] {
            store.insert(&tx).await.unwrap();
        }

        assert_eq!(store.count_recent("A", window).await.unwrap(), 2);
        assert_eq!(
            store.avg_amount_recent("A", window).await.unwrap(),
            AmountAverage::new(BigDecimal::from(400), 2)
        );
    }

    #[tokio::test]
    async fn average_is_undefined_without_history() {
        let store = MemoryTransactionStore::new();
        let avg = store
            .avg_amount_recent("nobody", Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(avg, None);
    }

    #[tokio::test]
    async fn counts_failed_attempts_in_window() {
        let store = MemoryTransactionStore::new();
        let failed = Outcome::Rejected(StructuralRejection::InvalidAmount);
        for tx in [
            settled("1", "A", 0, failed.clone(), Duration::minutes(2)),
            settled("2", "A", 0, failed.clone(), Duration::minutes(9)),
            settled("3", "A", 0, failed, Duration::minutes(11)),
            settled("4", "A", 50, Outcome::Accepted, Duration::minutes(1)),
        ] {
            store.insert(&tx).await.unwrap();
        }

        assert_eq!(
            store
                .count_recent_failed("A", Duration::minutes(10))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn lists_flagged_newest_first() {
        let store = MemoryTransactionStore::new();
        let flagged = Outcome::Flagged(vec![RiskSignal::HighAmount]);
        for tx in [
            settled("old", "A", 60_000, flagged.clone(), Duration::minutes(30)),
            settled("ok", "A", 10, Outcome::Accepted, Duration::minutes(20)),
            settled("new", "A", 70_000, flagged, Duration::minutes(1)),
        ] {
            store.insert(&tx).await.unwrap();
        }

        let ids: Vec<String> = store
            .find_fraud_flagged()
            .await
            .unwrap()
            .into_iter()
            .map(|tx| tx.transaction_id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);

        let successes = store
            .find_by_status(TransactionStatus::Success)
            .await
            .unwrap();
        assert_eq!(successes.len(), 1);
        assert_eq!(store.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unrepresentable_window_is_an_error() {
        let store = MemoryTransactionStore::new();
        let result = store
            .count_recent("A", Duration::milliseconds(i64::MAX))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidWindow(_))));
    }
}
