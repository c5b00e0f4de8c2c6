//! SMD2 Storage - persistence collaborator
//!
//! The lifecycle manager only ever needs three operations from a store:
//! load the whole collection, upsert a record keyed by uid, and delete by uid.
//! There is no secondary index, so any lookup by a domain field (such as a
//! Component `ID`) is a full scan over [`ResourceStore::load_all`] and costs
//! O(n) in the number of stored records.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smd_core::{Identified, Uid};

/// Durable store of resource records of a single kind.
#[async_trait]
pub trait ResourceStore<R>: Send + Sync
where
    R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Every stored record, in the store's natural order.
    async fn load_all(&self) -> StorageResult<Vec<R>>;

    /// Insert or replace the record with the same uid.
    async fn save(&self, record: &R) -> StorageResult<()>;

    /// Remove the record with `uid`. Removing an absent uid succeeds.
    async fn delete_by_uid(&self, uid: &Uid) -> StorageResult<()>;
}
