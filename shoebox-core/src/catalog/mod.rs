//! The authoritative record store.
//!
//! All media records persist as one JSON array in `photos.json` under the
//! storage root. Mutations take the advisory lock, re-read the document,
//! apply the change, and write back through a temp file + rename so a crash
//! mid-write never leaves a torn document behind.

mod lock;

pub use lock::CatalogLock;

use crate::model::MediaRecord;
use crate::storage_dir::StorageDir;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Photo not found: {0}")]
    NotFound(String),
    #[error("Catalog is busy")]
    Busy,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-id result of a batch delete.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub id: String,
    pub result: Result<MediaRecord, CatalogError>,
}

/// Append/find/delete store over the catalog document.
///
/// Cheap to clone; holds only the storage-root handle. Reads are lock-free
/// (a torn read is impossible thanks to the rename-based writes); every
/// read-modify-write cycle runs under [`CatalogLock`].
#[derive(Clone, Debug)]
pub struct Catalog {
    dir: StorageDir,
}

impl Catalog {
    pub fn new(dir: StorageDir) -> Self {
        Self { dir }
    }

    /// All records, in append order.
    ///
    /// A missing or unparsable document reads as empty rather than failing:
    /// the catalog is self-healing, at the cost of possibly re-admitting a
    /// duplicate after corruption.
    pub async fn list_all(&self) -> Vec<MediaRecord> {
        let path = self.dir.catalog_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "Catalog document {} is unreadable ({}), treating as empty",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Option<MediaRecord> {
        self.list_all().await.into_iter().find(|r| r.id == id)
    }

    /// Linear scan for a content hash. The first and only definition of
    /// "duplicate" is hash equality.
    pub async fn contains_hash(&self, hash: &str) -> bool {
        self.list_all().await.iter().any(|r| r.hash == hash)
    }

    /// Commit a new record. Atomic with respect to other appends and
    /// deletes system-wide via the lock protocol.
    pub async fn append(&self, record: MediaRecord) -> Result<(), CatalogError> {
        let _lock = CatalogLock::acquire(&self.dir).await?;
        let mut records = self.list_all().await;
        records.push(record);
        self.write_records(&records).await
    }

    /// Remove a record and return it so the caller can clean up its files.
    pub async fn delete(&self, id: &str) -> Result<MediaRecord, CatalogError> {
        let _lock = CatalogLock::acquire(&self.dir).await?;
        let mut records = self.list_all().await;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        let removed = records.remove(index);
        self.write_records(&records).await?;
        Ok(removed)
    }

    /// Delete several records, one at a time. Each id gets its own outcome;
    /// one failure never aborts the rest.
    pub async fn delete_many(&self, ids: &[String]) -> Vec<DeleteOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            outcomes.push(DeleteOutcome {
                id: id.clone(),
                result: self.delete(id).await,
            });
        }
        outcomes
    }

    /// Crash-safe document write: serialize to a temp file, then rename
    /// over the live document.
    async fn write_records(&self, records: &[MediaRecord]) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(records)?;
        let temp = self.dir.catalog_temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, self.dir.catalog_path()).await?;
        Ok(())
    }
}
