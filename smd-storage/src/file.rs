//! File-backed store.
//!
//! One pretty-printed JSON document per record at
//! `<root>/<kind-lowercase>/<uid>.json`. Writes go to a sibling temp file that
//! is then renamed over the target, so a crash never leaves a partial record.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smd_core::{Identified, Uid};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ResourceStore, StorageError, StorageResult};

const RECORD_EXT: &str = "json";
const TEMP_EXT: &str = "json.tmp";

pub struct FileStore<R> {
    dir: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> FileStore<R> {
    /// Open (creating if needed) the directory for `kind` under `root`.
    pub async fn open(root: impl AsRef<Path>, kind: &str) -> StorageResult<Self> {
        let dir = root.as_ref().join(kind.to_lowercase());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, uid: &Uid) -> StorageResult<PathBuf> {
        let key = uid.as_str();
        if key.is_empty() {
            return Err(StorageError::MissingUid);
        }
        if key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(StorageError::InvalidUid {
                uid: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.{}", key, RECORD_EXT)))
    }
}

#[async_trait]
impl<R> ResourceStore<R> for FileStore<R>
where
    R: Identified + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn load_all(&self) -> StorageResult<Vec<R>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                // removed between listing and reading
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            };
            let record = serde_json::from_slice(&bytes).map_err(|source| StorageError::Decode {
                path: path.display().to_string(),
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    async fn save(&self, record: &R) -> StorageResult<()> {
        let path = self.record_path(record.uid())?;
        let body = serde_json::to_vec_pretty(record).map_err(|source| StorageError::Encode {
            uid: record.uid().to_string(),
            source,
        })?;

        let _guard = self.write_lock.lock().await;
        let tmp = path.with_extension(TEMP_EXT);
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }

    async fn delete_by_uid(&self, uid: &Uid) -> StorageResult<()> {
        let path = self.record_path(uid)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
