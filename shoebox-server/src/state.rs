//! Shared server state.
//!
//! The storage root is resolved from configuration once, not per request.
//! Settings handlers that change the effective root rebuild the whole
//! [`App`] so the catalog and pipeline always agree on one directory.

use shoebox_core::{artifacts, Catalog, Config, IngestionPipeline, StorageDir};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

pub struct App {
    pub config: Config,
    pub dir: StorageDir,
    pub catalog: Catalog,
    pub pipeline: IngestionPipeline,
}

impl App {
    /// Wire up catalog and pipeline against the config's storage root.
    pub async fn from_config(config: Config) -> Result<Self, std::io::Error> {
        let dir = StorageDir::new(config.storage_root());
        dir.ensure_layout().await?;
        if let Err(e) = artifacts::ensure_placeholder_thumbnail(&dir).await {
            // Degraded video records would 404 on their thumbnail; the
            // server itself still works.
            warn!("Could not create placeholder thumbnail: {}", e);
        }
        let catalog = Catalog::new(dir.clone());
        let pipeline = IngestionPipeline::new(dir.clone(), catalog.clone());
        Ok(Self {
            config,
            dir,
            catalog,
            pipeline,
        })
    }

    /// Re-resolve the storage root after a config change.
    pub async fn rebuild(&mut self) -> Result<(), std::io::Error> {
        *self = Self::from_config(self.config.clone()).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<App>>,
}

impl AppState {
    pub fn new(app: App) -> Self {
        Self {
            inner: Arc::new(RwLock::new(app)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, App> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, App> {
        self.inner.write().await
    }
}
