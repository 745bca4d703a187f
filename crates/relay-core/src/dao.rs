use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token usage of one completed call, as reported by the upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Backend name (key in the provider configuration)
    pub provider: String,
    /// Model the call was made against
    pub model: String,
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Whether the call was streamed
    pub streamed: bool,
}

impl UsageRecord {
    /// Prompt plus completion tokens
    pub const fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Failure reported by a persistence backend
#[derive(Debug, Error)]
#[error("persistence error: {0}")]
pub struct DaoError(pub String);

/// Persistence capability handed to adapters for usage logging
///
/// Implemented outside the core. Adapters never fail a call because the
/// store did; they log and move on.
#[async_trait]
pub trait Dao: Send + Sync {
    /// Persist the usage of one call
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), DaoError>;
}

/// In-process store, used when no external persistence is wired in
#[derive(Debug, Default)]
pub struct MemoryDao {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Dao for MemoryDao {
    async fn record_usage(&self, record: &UsageRecord) -> Result<(), DaoError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| DaoError("usage store lock poisoned".to_owned()))?;
        records.push(record.clone());
        drop(records);
        Ok(())
    }
}
