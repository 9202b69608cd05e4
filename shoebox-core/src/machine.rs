//! Machine identity for the main-computer designation.

use std::path::Path;
use tokio::process::Command;
use tracing::info;
use uuid::Uuid;

const MACHINE_ID_FILE: &str = "machine-id";

/// Stable opaque id for this machine.
///
/// Generated once and persisted in the config directory; every later call
/// returns the stored value. Identifies the machine across restarts, not
/// across reinstalls, which is all the main-computer designation needs.
pub async fn machine_id(config_dir: &Path) -> Result<String, std::io::Error> {
    let path = config_dir.join(MACHINE_ID_FILE);
    if let Ok(existing) = tokio::fs::read_to_string(&path).await {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let id = Uuid::new_v4().to_string();
    tokio::fs::create_dir_all(config_dir).await?;
    tokio::fs::write(&path, &id).await?;
    info!("Generated machine id {}", id);
    Ok(id)
}

/// Human-readable machine name from the `hostname` tool.
pub async fn computer_name() -> String {
    match Command::new("hostname").output().await {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if name.is_empty() {
                "Unknown Computer".to_string()
            } else {
                name
            }
        }
        _ => "Unknown Computer".to_string(),
    }
}
