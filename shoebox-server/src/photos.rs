//! Photo routes: listing, serving, uploading, deleting.

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use shoebox_core::{
    hash, ContentType, MediaRecord, StorageDir, UploadOutcome, UploadedFile,
};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_photos).delete(delete_many))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/check-duplicate",
            post(check_duplicate).layer(DefaultBodyLimit::disable()),
        )
        .route("/:id", get(get_photo).delete(delete_one))
        .route("/:id/file", get(serve_file))
        .route("/:id/thumbnail", get(serve_thumbnail))
        .route("/:id/motion", get(serve_motion))
        .route("/:id/download", get(download))
}

async fn list_photos(State(state): State<AppState>) -> Json<Vec<MediaRecord>> {
    Json(state.read().await.catalog.list_all().await)
}

async fn get_photo(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.read().await.catalog.find_by_id(&id).await {
        Some(record) => Json(record).into_response(),
        None => not_found("Photo not found"),
    }
}

async fn serve_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let app = state.read().await;
    match app.catalog.find_by_id(&id).await {
        Some(record) => serve_media(&app.dir, &record.filename).await,
        None => not_found("Photo not found"),
    }
}

async fn serve_thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let app = state.read().await;
    match app.catalog.find_by_id(&id).await {
        Some(record) => serve_media(&app.dir, &record.thumbnail).await,
        None => not_found("Photo not found"),
    }
}

async fn serve_motion(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let app = state.read().await;
    let Some(record) = app.catalog.find_by_id(&id).await else {
        return not_found("Photo not found");
    };
    match (&record.motion_filename, record.metadata.is_live_photo()) {
        (Some(motion), true) => serve_media(&app.dir, motion).await,
        _ => not_found("Not a Live Photo or no motion data available"),
    }
}

/// The lossless original, with the uploader's filename attached.
async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let app = state.read().await;
    let Some(record) = app.catalog.find_by_id(&id).await else {
        return not_found("Photo not found");
    };

    let path = app.dir.media_path(&record.original_filename);
    match tokio::fs::read(&path).await {
        Ok(data) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                urlencoding::encode(&record.original_name)
            );
            (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        ContentType::from_filename(&record.original_name)
                            .as_str()
                            .to_string(),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                data,
            )
                .into_response()
        }
        Err(e) => {
            warn!("Failed to read original for {}: {}", id, e);
            not_found("Photo not found")
        }
    }
}

/// Buffer the multipart files, then run the batch through the pipeline.
async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let app = state.read().await;
    let (files, batch_dir) = match buffer_batch(&app.dir, multipart).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let outcomes = app.pipeline.ingest_batch(&files).await;
    cleanup_batch_dir(&batch_dir).await;

    let results: Vec<serde_json::Value> = outcomes.iter().map(outcome_json).collect();
    Json(results).into_response()
}

/// Hash a single file and report whether the catalog already has it.
async fn check_duplicate(State(state): State<AppState>, multipart: Multipart) -> Response {
    let app = state.read().await;
    let (files, batch_dir) = match buffer_batch(&app.dir, multipart).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };

    let Some(file) = files.first() else {
        cleanup_batch_dir(&batch_dir).await;
        return bad_request("A file is required");
    };

    let result = match hash::hash_file(&file.temp_path).await {
        Ok(digest) => {
            let is_duplicate = app.catalog.contains_hash(&digest).await;
            Json(json!({ "isDuplicate": is_duplicate })).into_response()
        }
        Err(e) => internal_error(&e.to_string()),
    };

    cleanup_batch_dir(&batch_dir).await;
    result
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let app = state.read().await;
    match app.pipeline.remove(&id).await {
        Ok(record) => Json(json!({ "success": true, "id": record.id })).into_response(),
        Err(shoebox_core::CatalogError::NotFound(_)) => not_found("Photo not found"),
        Err(e) => internal_error(&e.to_string()),
    }
}

#[derive(Deserialize)]
struct DeleteManyRequest {
    ids: Vec<String>,
}

async fn delete_many(
    State(state): State<AppState>,
    Json(request): Json<DeleteManyRequest>,
) -> Response {
    if request.ids.is_empty() {
        return bad_request("Photo IDs array is required");
    }
    let app = state.read().await;
    Json(app.pipeline.remove_many(&request.ids).await).into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// Stream every multipart file into a per-batch temp directory.
///
/// Files keep the uploader's basename so Live Photo companions sit next to
/// their stills; the batch directory isolates concurrent uploads from each
/// other.
async fn buffer_batch(
    dir: &StorageDir,
    mut multipart: Multipart,
) -> Result<(Vec<UploadedFile>, PathBuf), Response> {
    let batch_dir = dir.uploads_dir().join(uuid::Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&batch_dir)
        .await
        .map_err(|e| internal_error(&e.to_string()))?;

    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Multipart error: {}", e);
                cleanup_batch_dir(&batch_dir).await;
                return Err(bad_request(&e.to_string()));
            }
        };

        let Some(original_name) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        if original_name.is_empty() {
            continue;
        }

        let temp_path = batch_dir.join(&original_name);
        debug!("Buffering upload {} -> {}", original_name, temp_path.display());

        if let Err(e) = write_field(&temp_path, field).await {
            warn!("Failed to buffer {}: {}", original_name, e);
            cleanup_batch_dir(&batch_dir).await;
            return Err(internal_error(&e.to_string()));
        }

        files.push(UploadedFile {
            temp_path,
            original_name,
        });
    }

    Ok((files, batch_dir))
}

async fn write_field(
    temp_path: &std::path::Path,
    mut field: axum::extract::multipart::Field<'_>,
) -> Result<(), std::io::Error> {
    let mut out = tokio::fs::File::create(temp_path).await?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
    {
        out.write_all(&chunk).await?;
    }
    out.flush().await?;
    Ok(())
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

async fn cleanup_batch_dir(batch_dir: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_dir_all(batch_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove batch dir {}: {}", batch_dir.display(), e);
        }
    }
}

/// Per-file upload result in the shape clients reconcile against.
fn outcome_json(outcome: &UploadOutcome) -> serde_json::Value {
    match outcome {
        UploadOutcome::Stored(record) => serde_json::to_value(record).unwrap_or_else(|e| {
            json!({ "error": e.to_string(), "originalName": record.original_name })
        }),
        UploadOutcome::Duplicate { original_name } => {
            json!({ "error": "Duplicate photo", "originalName": original_name })
        }
        UploadOutcome::Failed {
            original_name,
            error,
        } => json!({ "error": error, "originalName": original_name }),
    }
}

async fn serve_media(dir: &StorageDir, filename: &str) -> Response {
    let path = dir.media_path(filename);
    match tokio::fs::read(&path).await {
        Ok(data) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                ContentType::from_filename(filename).as_str().to_string(),
            )],
            data,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            not_found("File not found")
        }
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shoebox_core::model::{ImageMetadata, MediaMetadata};

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("IMG_0001.jpg"), "IMG_0001.jpg");
        assert_eq!(sanitize_filename("dir/photo.heic"), "photo.heic");
    }

    #[test]
    fn duplicate_outcome_uses_client_error_shape() {
        let value = outcome_json(&UploadOutcome::Duplicate {
            original_name: "IMG_1.jpg".to_string(),
        });
        assert_eq!(value["error"], "Duplicate photo");
        assert_eq!(value["originalName"], "IMG_1.jpg");
    }

    #[test]
    fn stored_outcome_serializes_the_record() {
        let record = MediaRecord {
            id: "x".to_string(),
            filename: "x.jpg".to_string(),
            original_filename: "original_x.jpg".to_string(),
            original_name: "IMG_2.jpg".to_string(),
            thumbnail: "thumb_x.jpg".to_string(),
            motion_filename: None,
            metadata: MediaMetadata::Image(ImageMetadata::default()),
            hash: "h".to_string(),
            is_video: false,
            created_at: Utc::now(),
        };
        let value = outcome_json(&UploadOutcome::Stored(record));
        assert_eq!(value["id"], "x");
        assert_eq!(value["originalName"], "IMG_2.jpg");
        assert!(value.get("error").is_none());
    }
}
