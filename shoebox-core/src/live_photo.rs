//! Live Photo companion pairing.
//!
//! Apple Live Photos arrive as a still plus a same-basename `.mov` in the
//! same upload batch. Companions are searched in the upload's source
//! directory under the basename the uploader supplied, so temp-buffer
//! naming never affects pairing.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Still-image extensions that can carry a motion companion.
const LIVE_PHOTO_STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic"];

/// Companion extensions, checked in this order.
const MOTION_EXTENSIONS: &[&str] = &["mov", "MOV"];

/// Check if an uploaded filename is eligible for Live Photo pairing.
pub fn is_pairable_still(original_name: &str) -> bool {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| LIVE_PHOTO_STILL_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Look for a same-basename motion companion in the upload source dir.
///
/// Returns the companion path when one exists. Absence is the common case,
/// not an error. Exact extension variants are checked explicitly; nothing
/// else counts as a companion.
pub async fn find_companion(source_dir: &Path, original_name: &str) -> Option<PathBuf> {
    let stem = Path::new(original_name).file_stem()?.to_str()?;

    for ext in MOTION_EXTENSIONS {
        let candidate = source_dir.join(format!("{stem}.{ext}"));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            debug!("Found motion companion {}", candidate.display());
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pairable_extensions() {
        assert!(is_pairable_still("IMG_0001.jpg"));
        assert!(is_pairable_still("IMG_0001.JPEG"));
        assert!(is_pairable_still("IMG_0001.heic"));
        assert!(!is_pairable_still("IMG_0001.png"));
        assert!(!is_pairable_still("IMG_0001.mp4"));
        assert!(!is_pairable_still("no_extension"));
    }

    #[tokio::test]
    async fn finds_lowercase_companion() {
        let tmp = TempDir::new().unwrap();
        let motion = tmp.path().join("IMG_0001.mov");
        tokio::fs::write(&motion, b"motion").await.unwrap();

        let found = find_companion(tmp.path(), "IMG_0001.jpg").await;
        assert_eq!(found, Some(motion));
    }

    #[tokio::test]
    async fn finds_uppercase_companion() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("IMG_0002.MOV"), b"motion")
            .await
            .unwrap();

        let found = find_companion(tmp.path(), "IMG_0002.jpg").await.unwrap();
        assert_eq!(found.file_name().unwrap(), "IMG_0002.MOV");
    }

    #[tokio::test]
    async fn no_companion_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_companion(tmp.path(), "IMG_0003.jpg").await, None);
    }

    #[tokio::test]
    async fn unrelated_files_are_not_companions() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("IMG_9999.mov"), b"motion")
            .await
            .unwrap();
        tokio::fs::write(tmp.path().join("IMG_0004.mp4"), b"video")
            .await
            .unwrap();

        assert_eq!(find_companion(tmp.path(), "IMG_0004.jpg").await, None);
    }
}
