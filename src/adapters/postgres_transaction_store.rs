//! Postgres implementation of TransactionStore.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::domain::{AmountAverage, Currency, Transaction, TransactionStatus};
use crate::ports::{window_start, StoreError, StoreResult, TransactionStore};

const SELECT_COLUMNS: &str = r#"
    SELECT transaction_id, recorded_at, currency, amount, sender_account, receiver_account,
           transaction_type, channel, status, ip_address, location, fraud_flag, fraud_reason
    FROM transactions
"#;

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn window_bounds(window: Duration) -> StoreResult<(DateTime<Utc>, DateTime<Utc>)> {
        let now = Utc::now();
        Ok((window_start(now, window)?, now))
    }

    async fn fetch_rows(&self, sql: &str) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let (status, fraud_reason) = match (tx.status, tx.fraud_reason.as_deref()) {
            (Some(status), Some(reason)) => (status, reason),
            _ => return Err(StoreError::Unsettled(tx.transaction_id.clone())),
        };

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                transaction_id, recorded_at, currency, amount, sender_account,
                receiver_account, transaction_type, channel, status, ip_address,
                location, fraud_flag, fraud_reason
            ) VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING transaction_id, recorded_at, currency, amount, sender_account,
                receiver_account, transaction_type, channel, status, ip_address,
                location, fraud_flag, fraud_reason
            "#,
        )
        .bind(&tx.transaction_id)
        .bind(tx.timestamp)
        .bind(tx.currency.as_str())
        .bind(&tx.amount)
        .bind(&tx.sender_account)
        .bind(&tx.receiver_account)
        .bind(&tx.transaction_type)
        .bind(&tx.channel)
        .bind(status.as_str())
        .bind(&tx.ip_address)
        .bind(&tx.location)
        .bind(tx.fraud_flag)
        .bind(fraud_reason)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn count_recent(&self, sender_account: &str, window: Duration) -> StoreResult<i64> {
        let (since, now) = Self::window_bounds(window)?;
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE sender_account = $1 AND recorded_at >= $2 AND recorded_at < $3
            "#,
        )
        .bind(sender_account)
        .bind(since)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn avg_amount_recent(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<Option<AmountAverage>> {
        let (since, now) = Self::window_bounds(window)?;
        let (total, count) = sqlx::query_as::<_, (BigDecimal, i64)>(
            r#"
            SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM transactions
            WHERE sender_account = $1 AND recorded_at >= $2 AND recorded_at < $3
            "#,
        )
        .bind(sender_account)
        .bind(since)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(AmountAverage::new(total, count))
    }

    async fn count_recent_failed(
        &self,
        sender_account: &str,
        window: Duration,
    ) -> StoreResult<i64> {
        let (since, now) = Self::window_bounds(window)?;
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE sender_account = $1 AND status = 'FAILED'
              AND recorded_at >= $2 AND recorded_at < $3
            "#,
        )
        .bind(sender_account)
        .bind(since)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_all(&self) -> StoreResult<Vec<Transaction>> {
        self.fetch_rows(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .await
    }

    async fn find_by_status(&self, status: TransactionStatus) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{} WHERE status = $1 ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn find_fraud_flagged(&self) -> StoreResult<Vec<Transaction>> {
        self.fetch_rows(&format!(
            "{} WHERE fraud_flag ORDER BY recorded_at DESC, id DESC",
            SELECT_COLUMNS
        ))
        .await
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    transaction_id: String,
    recorded_at: DateTime<Utc>,
    currency: String,
    amount: BigDecimal,
    sender_account: String,
    receiver_account: String,
    transaction_type: Option<String>,
    channel: Option<String>,
    status: String,
    ip_address: Option<String>,
    location: Option<String>,
    fraud_flag: bool,
    fraud_reason: String,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let currency = self.currency.parse::<Currency>().map_err(StoreError::Corrupt)?;
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(StoreError::Corrupt)?;

        Ok(Transaction {
            transaction_id: self.transaction_id,
            timestamp: Some(self.recorded_at),
            currency,
            amount: self.amount,
            sender_account: self.sender_account,
            receiver_account: self.receiver_account,
            transaction_type: self.transaction_type,
            channel: self.channel,
            ip_address: self.ip_address,
            location: self.location,
            status: Some(status),
            fraud_flag: self.fraud_flag,
            fraud_reason: Some(self.fraud_reason),
        })
    }
}
