use crate::store::ObjectStore;
use crate::ReplyLedger;
use bot_core::{CoreError, StorageError};
use std::collections::BTreeMap;
use tracing::debug;

pub const COUNTER_PREFIX: &str = "replies_per_submission:";

pub fn counter_key(thread_id: &str) -> String {
    format!("{}{}", COUNTER_PREFIX, thread_id)
}

/// Reply counters kept as one JSON document, read and rewritten whole on
/// every call. Two processes sharing a document can lose increments.
#[derive(Debug)]
pub struct SnapshotLedger<S> {
    store: S,
    bucket: String,
    key: String,
}

impl<S: ObjectStore> SnapshotLedger<S> {
    pub fn new(store: S, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The whole counter map; empty when the document does not exist yet.
    pub async fn snapshot(&self) -> Result<BTreeMap<String, u32>, CoreError> {
        let Some(bytes) = self.store.get_object(&self.bucket, &self.key).await? else {
            debug!("Ledger {}/{} not found, starting empty", self.bucket, self.key);
            return Ok(BTreeMap::new());
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::CorruptSnapshot {
                location: format!("{}/{}", self.bucket, self.key),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn write_snapshot(&self, snapshot: &BTreeMap<String, u32>) -> Result<(), CoreError> {
        let body = serde_json::to_vec(snapshot)?;
        self.store.put_object(&self.bucket, &self.key, body).await
    }
}

impl<S: ObjectStore> ReplyLedger for SnapshotLedger<S> {
    async fn get(&self, thread_id: &str) -> Result<u32, CoreError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.get(&counter_key(thread_id)).copied().unwrap_or(0))
    }

    async fn increment(&self, thread_id: &str) -> Result<u32, CoreError> {
        let mut snapshot = self.snapshot().await?;
        let counter = snapshot.entry(counter_key(thread_id)).or_insert(0);
        *counter += 1;
        let replies = *counter;

        self.write_snapshot(&snapshot).await?;
        debug!("Thread {} now has {} replies", thread_id, replies);
        Ok(replies)
    }
}
