//! The per-upload ingestion pipeline.
//!
//! One file at a time: hash, duplicate check, classify, persist the raw
//! copy, branch on image/video, assemble the record, commit under the
//! catalog lock, clean up the temp buffer. Batches run strictly
//! sequentially and collect one outcome per file in input order.

use crate::artifacts::{self, ArtifactError, PLACEHOLDER_VIDEO_THUMB};
use crate::catalog::{Catalog, CatalogError};
use crate::content_type::ContentType;
use crate::hash;
use crate::live_photo;
use crate::metadata::{self, Extraction, FfprobeProber, VideoProber};
use crate::model::{MediaMetadata, MediaRecord, VideoMetadata};
use crate::storage_dir::{self, StorageDir};
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The content hash is already cataloged. A recognized outcome, not a
    /// processing failure; the message doubles as the client-facing error.
    #[error("Duplicate photo")]
    Duplicate,
    #[error("Artifact generation failed: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// One raw file handed to the pipeline: a temp buffer plus the name the
/// uploader supplied.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub temp_path: PathBuf,
    pub original_name: String,
}

/// Terminal state of one file's run through the pipeline.
#[derive(Debug)]
pub enum UploadOutcome {
    Stored(MediaRecord),
    Duplicate { original_name: String },
    Failed { original_name: String, error: String },
}

/// Per-id result of a batch removal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrates ingestion and removal against one storage root.
#[derive(Clone)]
pub struct IngestionPipeline {
    dir: StorageDir,
    catalog: Catalog,
    prober: Arc<dyn VideoProber>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    pub fn new(dir: StorageDir, catalog: Catalog) -> Self {
        Self::with_prober(dir, catalog, Arc::new(FfprobeProber))
    }

    /// Construct with an injected probe collaborator (for testing).
    pub fn with_prober(dir: StorageDir, catalog: Catalog, prober: Arc<dyn VideoProber>) -> Self {
        Self { dir, catalog, prober }
    }

    /// Run a batch of uploads through the pipeline, strictly one at a time.
    ///
    /// Output order matches input order; one file's rejection or failure
    /// never affects its siblings. Temp buffers are removed after the whole
    /// batch so a still can pair with a motion companion regardless of the
    /// order the two arrived in.
    pub async fn ingest_batch(&self, files: &[UploadedFile]) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let outcome = match self.ingest(file).await {
                Ok(record) => UploadOutcome::Stored(record),
                Err(PipelineError::Duplicate) => {
                    info!("Rejected duplicate upload {}", file.original_name);
                    UploadOutcome::Duplicate {
                        original_name: file.original_name.clone(),
                    }
                }
                Err(e) => {
                    warn!("Failed to ingest {}: {}", file.original_name, e);
                    UploadOutcome::Failed {
                        original_name: file.original_name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        for file in files {
            remove_quietly(&file.temp_path).await;
        }
        outcomes
    }

    /// Ingest a single raw file. Does not touch the temp buffer; callers
    /// (or [`Self::ingest_batch`]) clean it up whatever the outcome.
    pub async fn ingest(&self, file: &UploadedFile) -> Result<MediaRecord, PipelineError> {
        let hash = hash::hash_file(&file.temp_path).await?;
        if self.catalog.contains_hash(&hash).await {
            return Err(PipelineError::Duplicate);
        }

        let content_type = ContentType::from_filename(&file.original_name);
        let is_video = content_type.is_video();
        let filename = unique_filename(&file.original_name);
        let id = storage_dir::file_stem(&filename).to_string();

        // The untouched copy lands first: lossless downloads must never
        // depend on what the transcode steps do afterwards.
        let original_filename = storage_dir::original_name(&filename);
        tokio::fs::copy(&file.temp_path, self.dir.media_path(&original_filename)).await?;

        let (metadata, thumbnail, motion_filename) = if is_video {
            self.process_video(file, &filename, &content_type).await?
        } else {
            self.process_image(file, &filename).await?
        };

        let record = MediaRecord {
            id,
            filename,
            original_filename,
            original_name: file.original_name.clone(),
            thumbnail,
            motion_filename,
            metadata,
            hash,
            is_video,
            created_at: Utc::now(),
        };

        // Lock contention that outlasts the retries fails the upload; the
        // artifacts written above stay behind as orphans rather than
        // attempting a rollback.
        self.catalog.append(record.clone()).await?;
        info!("Stored {} as {}", record.original_name, record.filename);
        Ok(record)
    }

    async fn process_image(
        &self,
        file: &UploadedFile,
        filename: &str,
    ) -> Result<(MediaMetadata, String, Option<String>), PipelineError> {
        let source = file.temp_path.clone();
        let extraction = tokio::task::spawn_blocking(move || {
            metadata::extract_image_metadata(&source)
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Metadata task panicked for {}: {}", file.original_name, e);
            Extraction::Empty {
                metadata: Default::default(),
                parse_failed: true,
            }
        });
        if extraction.is_degraded() {
            warn!(
                "Metadata extraction degraded for {}, storing anyway",
                file.original_name
            );
        }
        let mut meta = extraction.into_metadata();

        artifacts::normalize_image(
            &file.temp_path,
            &self.dir.media_path(filename),
            meta.orientation,
        )
        .await?;

        let thumbnail = storage_dir::thumbnail_name(filename);
        artifacts::image_thumbnail(
            &file.temp_path,
            &self.dir.media_path(&thumbnail),
            meta.orientation,
        )
        .await?;

        let mut motion_filename = None;
        if live_photo::is_pairable_still(&file.original_name) {
            if let Some(source_dir) = file.temp_path.parent() {
                if let Some(companion) =
                    live_photo::find_companion(source_dir, &file.original_name).await
                {
                    let motion = storage_dir::motion_name(filename);
                    tokio::fs::copy(&companion, self.dir.media_path(&motion)).await?;
                    meta.is_live_photo = true;
                    motion_filename = Some(motion);
                }
            }
        }

        Ok((MediaMetadata::Image(meta), thumbnail, motion_filename))
    }

    async fn process_video(
        &self,
        file: &UploadedFile,
        filename: &str,
        content_type: &ContentType,
    ) -> Result<(MediaMetadata, String, Option<String>), PipelineError> {
        // Served copy is the verbatim container
        tokio::fs::copy(&file.temp_path, self.dir.media_path(filename)).await?;

        let (metadata, thumbnail) = match self.prober.probe(&file.temp_path).await {
            Ok(probe) => {
                let thumbnail = storage_dir::video_thumbnail_name(filename);
                let thumbnail = match artifacts::video_poster(
                    &file.temp_path,
                    &self.dir.media_path(&thumbnail),
                )
                .await
                {
                    Ok(()) => thumbnail,
                    Err(e) => {
                        warn!("Poster frame failed for {}: {}", file.original_name, e);
                        PLACEHOLDER_VIDEO_THUMB.to_string()
                    }
                };
                (probe.into_metadata(content_type.clone()), thumbnail)
            }
            Err(e) => {
                warn!("Probe failed for {}: {}", file.original_name, e);
                let metadata = VideoMetadata {
                    mime_type: content_type.clone(),
                    error: Some("Failed to process video metadata".to_string()),
                    ..Default::default()
                };
                (metadata, PLACEHOLDER_VIDEO_THUMB.to_string())
            }
        };

        Ok((MediaMetadata::Video(metadata), thumbnail, None))
    }

    /// Delete one record and every file it owns.
    pub async fn remove(&self, id: &str) -> Result<MediaRecord, CatalogError> {
        let record = self.catalog.delete(id).await?;
        self.remove_artifacts(&record).await;
        Ok(record)
    }

    /// Delete several records, collecting per-id outcomes.
    pub async fn remove_many(&self, ids: &[String]) -> Vec<RemovalOutcome> {
        let mut results = Vec::with_capacity(ids.len());
        for outcome in self.catalog.delete_many(ids).await {
            let result = match outcome.result {
                Ok(record) => {
                    self.remove_artifacts(&record).await;
                    RemovalOutcome {
                        id: outcome.id,
                        success: true,
                        error: None,
                    }
                }
                Err(e) => RemovalOutcome {
                    id: outcome.id,
                    success: false,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }
        results
    }

    async fn remove_artifacts(&self, record: &MediaRecord) {
        for name in record.owned_files() {
            let path = self.dir.media_path(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }
    }
}

/// Generated unique filename: epoch millis, a random suffix, and the
/// original extension. The stem doubles as the record id.
fn unique_filename(original_name: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{timestamp}-{suffix}.{}", ext.to_lowercase()),
        None => format!("{timestamp}-{suffix}"),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove temp file {}: {}", path.display(), e);
        }
    }
}
