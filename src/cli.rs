use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{MemoryTransactionStore, PostgresTransactionStore};
use crate::config::{Config, StoreBackend, SuspiciousOrigin};
use crate::domain::{RiskSignal, Transaction, TransactionStatus};
use crate::ports::TransactionStore;

#[derive(Parser)]
#[command(name = "sentinel-core")]
#[command(about = "Sentinel Core - transaction fraud screening service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction reporting commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// List recorded transactions
    List {
        /// Only transactions with this status (SUCCESS, FAILED, PENDING)
        #[arg(short, long, conflicts_with = "flagged")]
        status: Option<TransactionStatus>,

        /// Only fraud-flagged transactions, newest first
        #[arg(short, long)]
        flagged: bool,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

/// Builds the store selected by `STORE_BACKEND`.
pub async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TransactionStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = crate::db::create_pool(config).await?;
            crate::db::run_migrations(&pool, Path::new(crate::db::MIGRATIONS_DIR)).await?;
            Ok(Arc::new(PostgresTransactionStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; records are lost on shutdown");
            Ok(Arc::new(MemoryTransactionStore::new()))
        }
    }
}

pub async fn handle_tx_list(
    store: &dyn TransactionStore,
    status: Option<TransactionStatus>,
    flagged: bool,
) -> anyhow::Result<()> {
    let transactions = match (status, flagged) {
        (_, true) => store.find_fraud_flagged().await?,
        (Some(status), false) => store.find_by_status(status).await?,
        (None, false) => store.find_all().await?,
    };

    if transactions.is_empty() {
        println!("No transactions found");
        return Ok(());
    }

    println!(
        "{:<20} {:<20} {:>14} {:<4} {:<8} {}",
        "Transaction", "Recorded", "Amount", "Ccy", "Status", "Reason"
    );
    println!("{}", "-".repeat(100));
    for tx in &transactions {
        println!("{}", format_row(tx));
    }

    Ok(())
}

fn format_row(tx: &Transaction) -> String {
    format!(
        "{:<20} {:<20} {:>14} {:<4} {:<8} {}",
        tx.transaction_id,
        tx.timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        tx.amount.to_string(),
        tx.currency.as_str(),
        tx.status.map(|s| s.as_str()).unwrap_or("-"),
        tx.fraud_reason.as_deref().unwrap_or("-"),
    )
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool, Path::new(crate::db::MIGRATIONS_DIR)).await?;

    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    let rules = &config.rules;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Store Backend: {}", config.store_backend);
    if let Some(url) = &config.database_url {
        println!("  Database URL: {}", mask_password(url));
    }
    println!("Fraud rules:");
    println!("  Enabled: {}", describe_rules(rules.enabled_rules.iter().copied()));
    println!("  High amount threshold: {}", rules.high_amount_threshold);
    println!(
        "  Suspicious IPs: {}",
        rules
            .suspicious_origins
            .iter()
            .map(describe_origin)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  Velocity: >= {} in {}s",
        rules.velocity_threshold,
        rules.velocity_window.num_seconds()
    );
    println!("  Spike multiplier: {}", rules.spike_multiplier);
    println!(
        "  Failed attempts: >= {} in {}s",
        rules.failed_attempts_threshold,
        rules.failed_window.num_seconds()
    );
    println!("  Serialize per sender: {}", rules.serialize_per_sender);

    println!("✓ Configuration is valid");

    Ok(())
}

fn describe_rules(rules: impl Iterator<Item = RiskSignal>) -> String {
    let keys: Vec<&str> = rules.map(|rule| rule.key()).collect();
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.join(", ")
    }
}

fn describe_origin(origin: &SuspiciousOrigin) -> String {
    match origin {
        SuspiciousOrigin::Prefix(prefix) => format!("{}*", prefix),
        SuspiciousOrigin::Network(net) => net.to_string(),
    }
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, Outcome};
    use bigdecimal::BigDecimal;

    #[test]
    fn masks_database_password() {
        assert_eq!(
            mask_password("postgres://sentinel:s3cret@db:5432/sentinel"),
            "postgres://sentinel:****@db:5432/sentinel"
        );
        assert_eq!(mask_password("postgres://db/sentinel"), "postgres://db/sentinel");
    }

    #[test]
    fn parses_list_filters() {
        let cli = Cli::try_parse_from(["sentinel-core", "tx", "list", "--status", "pending"]).unwrap();
        match cli.command {
            Some(Commands::Tx(TxCommands::List { status, flagged })) => {
                assert_eq!(status, Some(TransactionStatus::Pending));
                assert!(!flagged);
            }
            _ => panic!("expected tx list"),
        }

        assert!(
            Cli::try_parse_from(["sentinel-core", "tx", "list", "--status", "FAILED", "--flagged"])
                .is_err()
        );
    }

    #[test]
    fn formats_settled_row() {
        let mut tx = Transaction::new(
            "TXN-9".to_string(),
            Currency::Inr,
            BigDecimal::from(42),
            "A".to_string(),
            "B".to_string(),
        );
        tx.settle(&Outcome::Accepted);

        let row = format_row(&tx);
        assert!(row.starts_with("TXN-9"));
        assert!(row.contains("SUCCESS"));
        assert!(row.ends_with("NONE"));
    }

    #[test]
    fn describes_rule_sets() {
        assert_eq!(describe_rules(std::iter::empty()), "none");
        assert_eq!(
            describe_rules([RiskSignal::HighAmount, RiskSignal::HighVelocity].into_iter()),
            "high_amount, velocity"
        );
    }
}
