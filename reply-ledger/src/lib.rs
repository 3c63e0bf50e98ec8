//! Durable per-thread reply counters.

#![allow(async_fn_in_trait)]

pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use snapshot::SnapshotLedger;
pub use sqlite::SqliteLedger;
pub use store::{AnyObjectStore, FileObjectStore, HttpObjectStore, MemoryObjectStore, ObjectStore};

use bot_core::{CoreError, LedgerBackend, LedgerConfig};
use tracing::info;

/// How many replies the bot has posted per thread.
pub trait ReplyLedger {
    /// Current count, 0 for threads never incremented.
    async fn get(&self, thread_id: &str) -> Result<u32, CoreError>;
    /// Adds one and returns the new count.
    async fn increment(&self, thread_id: &str) -> Result<u32, CoreError>;
}

impl<L: ReplyLedger> ReplyLedger for &L {
    async fn get(&self, thread_id: &str) -> Result<u32, CoreError> {
        (**self).get(thread_id).await
    }

    async fn increment(&self, thread_id: &str) -> Result<u32, CoreError> {
        (**self).increment(thread_id).await
    }
}

/// Ledger backend selected at runtime.
#[derive(Debug)]
pub enum AnyLedger {
    Snapshot(SnapshotLedger<AnyObjectStore>),
    Sqlite(SqliteLedger),
}

impl AnyLedger {
    pub async fn from_config(config: &LedgerConfig) -> Result<Self, CoreError> {
        let store = match config.backend {
            LedgerBackend::Sqlite => {
                return Ok(AnyLedger::Sqlite(
                    SqliteLedger::connect(&config.database_url).await?,
                ));
            }
            LedgerBackend::File => {
                AnyObjectStore::File(FileObjectStore::new(config.root.clone()))
            }
            LedgerBackend::Http => {
                let base_url = config.base_url.as_deref().ok_or_else(|| {
                    bot_core::ConfigError::MissingField {
                        field: "ledger.base_url".to_string(),
                    }
                })?;
                AnyObjectStore::Http(HttpObjectStore::new(base_url, config.token.clone())?)
            }
            LedgerBackend::Memory => AnyObjectStore::Memory(MemoryObjectStore::new()),
        };

        info!(
            "Using {:?} reply ledger {}/{}",
            config.backend, config.bucket, config.key
        );
        Ok(AnyLedger::Snapshot(SnapshotLedger::new(
            store,
            config.bucket.clone(),
            config.key.clone(),
        )))
    }
}

impl ReplyLedger for AnyLedger {
    async fn get(&self, thread_id: &str) -> Result<u32, CoreError> {
        match self {
            AnyLedger::Snapshot(ledger) => ledger.get(thread_id).await,
            AnyLedger::Sqlite(ledger) => ledger.get(thread_id).await,
        }
    }

    async fn increment(&self, thread_id: &str) -> Result<u32, CoreError> {
        match self {
            AnyLedger::Snapshot(ledger) => ledger.increment(thread_id).await,
            AnyLedger::Sqlite(ledger) => ledger.increment(thread_id).await,
        }
    }
}
