pub mod fraud_rules;
pub mod sender_locks;
pub mod transaction_processor;

pub use fraud_rules::{Aggregates, FraudRuleEngine};
pub use sender_locks::SenderLocks;
pub use transaction_processor::{ProcessedTransaction, ProcessingError, TransactionProcessor};
