//! Settings routes: backup drive, storage root, main-computer designation.

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shoebox_core::{machine, MainComputer};
use std::path::PathBuf;
use tracing::{info, warn};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/computer", get(computer_info))
        .route("/main-computer", post(set_main_computer))
        .route("/backup", post(set_backup_drive))
        .route("/storage-path", post(set_storage_path))
        .route("/config", get(get_configuration))
}

async fn computer_info(State(state): State<AppState>) -> Response {
    let app = state.read().await;
    let id = match machine::machine_id(app.config.config_dir()).await {
        Ok(id) => id,
        Err(e) => return internal_error(&format!("Failed to get computer ID: {e}")),
    };
    let name = machine::computer_name().await;
    let is_main = app
        .config
        .main_computer
        .as_ref()
        .is_some_and(|main| main.id == id);

    Json(json!({ "id": id, "name": name, "isMainComputer": is_main })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetMainComputerRequest {
    #[serde(default = "default_true")]
    is_main: bool,
}

fn default_true() -> bool {
    true
}

async fn set_main_computer(
    State(state): State<AppState>,
    Json(request): Json<SetMainComputerRequest>,
) -> Response {
    let mut app = state.write().await;

    if request.is_main {
        let id = match machine::machine_id(app.config.config_dir()).await {
            Ok(id) => id,
            Err(e) => return internal_error(&format!("Failed to get computer ID: {e}")),
        };
        let name = machine::computer_name().await;
        app.config.main_computer = Some(MainComputer {
            id: id.clone(),
            name: name.clone(),
            set_at: Utc::now(),
        });
        if let Err(e) = app.config.save() {
            return internal_error(&format!("Failed to set main computer status: {e}"));
        }
        info!("This machine is now the main computer ({})", name);
        Json(json!({ "success": true, "isMainComputer": true, "id": id, "name": name }))
            .into_response()
    } else {
        app.config.main_computer = None;
        if let Err(e) = app.config.save() {
            return internal_error(&format!("Failed to set main computer status: {e}"));
        }
        Json(json!({ "success": true, "isMainComputer": false })).into_response()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetBackupDriveRequest {
    drive_path: Option<PathBuf>,
}

async fn set_backup_drive(
    State(state): State<AppState>,
    Json(request): Json<SetBackupDriveRequest>,
) -> Response {
    let Some(drive_path) = request.drive_path else {
        return bad_request("Drive path is required");
    };

    // The drive must already be mounted; the photos subdir is ours to make.
    if !tokio::fs::try_exists(&drive_path).await.unwrap_or(false) {
        return internal_error("Failed to set backup drive");
    }
    if let Err(e) = tokio::fs::create_dir_all(drive_path.join("Photos")).await {
        warn!("Could not prepare backup dir on {}: {}", drive_path.display(), e);
        return internal_error("Failed to set backup drive");
    }

    let mut app = state.write().await;
    app.config.backup_drive = Some(drive_path.clone());
    if let Err(e) = app.config.save() {
        return internal_error(&format!("Failed to set backup drive: {e}"));
    }
    Json(json!({ "success": true, "path": drive_path })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetStoragePathRequest {
    storage_path: Option<PathBuf>,
}

async fn set_storage_path(
    State(state): State<AppState>,
    Json(request): Json<SetStoragePathRequest>,
) -> Response {
    let Some(storage_path) = request.storage_path else {
        return bad_request("Storage path is required");
    };

    if let Err(e) = tokio::fs::create_dir_all(&storage_path).await {
        warn!("Could not create storage path {}: {}", storage_path.display(), e);
        return internal_error("Failed to set custom storage path");
    }

    let mut app = state.write().await;
    app.config.custom_storage_path = Some(storage_path.clone());
    if let Err(e) = app.config.save() {
        return internal_error(&format!("Failed to set custom storage path: {e}"));
    }
    // The catalog and pipeline must follow the new root immediately.
    if let Err(e) = app.rebuild().await {
        return internal_error(&format!("Failed to switch storage path: {e}"));
    }
    info!("Storage root moved to {}", storage_path.display());
    Json(json!({ "success": true, "path": storage_path })).into_response()
}

/// The merged configuration view: persisted settings plus this machine's
/// identity.
async fn get_configuration(State(state): State<AppState>) -> Response {
    let app = state.read().await;
    let id = match machine::machine_id(app.config.config_dir()).await {
        Ok(id) => id,
        Err(e) => return internal_error(&format!("Failed to get configuration: {e}")),
    };
    let name = machine::computer_name().await;
    let is_main = app
        .config
        .main_computer
        .as_ref()
        .is_some_and(|main| main.id == id);

    Json(json!({
        "backupDrive": app.config.backup_drive,
        "customStoragePath": app.config.custom_storage_path,
        "mainComputer": app.config.main_computer,
        "currentComputer": { "id": id, "name": name, "isMainComputer": is_main },
    }))
    .into_response()
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
