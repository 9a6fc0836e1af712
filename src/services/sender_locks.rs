//! Optional per-sender serialization of screening.
//!
//! Without it two concurrent transactions from one sender can read the same
//! aggregates before either insert lands. Holding a sender's lock across the
//! aggregate reads and the insert closes that window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

#[derive(Clone, Default)]
pub struct SenderLocks {
    table: LockTable,
}

impl SenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, sender_account: &str) -> SenderGuard {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table
                .entry(sender_account.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        SenderGuard {
            guard: Some(entry.lock_owned().await),
            sender_account: sender_account.to_string(),
            table: self.table.clone(),
        }
    }

    /// Number of senders currently holding or waiting on a lock.
    pub fn active_senders(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct SenderGuard {
    guard: Option<OwnedMutexGuard<()>>,
    sender_account: String,
    table: LockTable,
}

impl Drop for SenderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Clones are only handed out under the table lock, so a count of one
        // means nobody else holds or awaits this sender's mutex.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = table.get(&self.sender_account) {
            if Arc::strong_count(entry) == 1 {
                table.remove(&self.sender_account);
            }
        }
    }
}
