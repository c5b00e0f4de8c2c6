//! In-memory store.
//!
//! Records are kept in insertion order. Saving an existing uid replaces the
//! record in place, so it keeps its position in `load_all` output.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smd_core::{Identified, Uid};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{ResourceStore, StorageError, StorageResult};

pub struct InMemoryStore<R> {
    records: Arc<RwLock<Vec<R>>>,
}

impl<R> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed the store. Later records with a duplicate uid replace earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self
    where
        R: Identified,
    {
        let mut seeded: Vec<R> = Vec::new();
        for record in records {
            match seeded.iter_mut().find(|r| r.uid() == record.uid()) {
                Some(slot) => *slot = record,
                None => seeded.push(record),
            }
        }
        Self {
            records: Arc::new(RwLock::new(seeded)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl<R> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for InMemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

#[async_trait]
impl<R> ResourceStore<R> for InMemoryStore<R>
where
    R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn load_all(&self) -> StorageResult<Vec<R>> {
        Ok(self.records.read().await.clone())
    }

    async fn save(&self, record: &R) -> StorageResult<()> {
        if record.uid().is_empty() {
            return Err(StorageError::MissingUid);
        }
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.uid() == record.uid()) {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn delete_by_uid(&self, uid: &Uid) -> StorageResult<()> {
        self.records.write().await.retain(|r| r.uid() != uid);
        Ok(())
    }
}
