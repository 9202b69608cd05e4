use super::CatalogError;
use crate::storage_dir::StorageDir;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempts before giving up with [`CatalogError::Busy`].
const MAX_ATTEMPTS: u32 = 5;

/// Backoff between acquisition attempts.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Exclusive marker over the catalog document.
///
/// Holds the `.photos.lock` sentinel in the storage root while a
/// read-modify-write cycle is in flight. The marker is removed on drop, so
/// every exit path of a guarded section releases it, error paths included.
///
/// Advisory only: serializes processes sharing one machine's filesystem; it
/// provides no cross-machine exclusion.
#[derive(Debug)]
pub struct CatalogLock {
    path: PathBuf,
}

impl CatalogLock {
    /// Acquire the lock, backing off and retrying while another holder has
    /// the marker.
    pub async fn acquire(dir: &StorageDir) -> Result<Self, CatalogError> {
        let path = dir.lock_path();
        for attempt in 1..=MAX_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(
                        "Catalog lock held, attempt {}/{}, retrying in {:?}",
                        attempt, MAX_ATTEMPTS, RETRY_DELAY
                    );
                    sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CatalogError::Busy)
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to release catalog lock {}: {}", self.path.display(), e);
            }
        }
    }
}
