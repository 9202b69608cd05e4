use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Typed wrapper for the storage root directory.
///
/// Centralizes the on-disk layout so callers use methods instead of
/// ad-hoc `path.join("photos.json")` etc. The root holds the catalog
/// document, the lock marker, a temp dir for upload buffers, and all
/// media files (served copy, `thumb_`/`original_`/`motion_` variants).
#[derive(Clone, Debug)]
pub struct StorageDir {
    path: PathBuf,
}

impl StorageDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The catalog document: a JSON array of media records.
    pub fn catalog_path(&self) -> PathBuf {
        self.path.join("photos.json")
    }

    /// Scratch file for crash-safe catalog writes (write, then rename).
    pub fn catalog_temp_path(&self) -> PathBuf {
        self.path.join("photos.json.tmp")
    }

    /// Sentinel marking an in-progress catalog mutation.
    pub fn lock_path(&self) -> PathBuf {
        self.path.join(".photos.lock")
    }

    /// Buffer directory for in-flight multipart uploads.
    pub fn uploads_dir(&self) -> PathBuf {
        self.path.join("uploads")
    }

    pub fn media_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// Create the root and uploads directories if missing.
    pub async fn ensure_layout(&self) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(&self.path).await?;
        tokio::fs::create_dir_all(self.uploads_dir()).await?;
        Ok(())
    }
}

/// Thumbnail name for a stored image filename.
pub fn thumbnail_name(filename: &str) -> String {
    format!("thumb_{filename}")
}

/// Poster-frame thumbnail name for a stored video filename (always JPEG).
pub fn video_thumbnail_name(filename: &str) -> String {
    format!("thumb_{}.jpg", file_stem(filename))
}

/// Name of the untouched full-fidelity copy.
pub fn original_name(filename: &str) -> String {
    format!("original_{filename}")
}

/// Name of the Live Photo motion companion for a stored filename.
pub fn motion_name(filename: &str) -> String {
    format!("motion_{}.mov", file_stem(filename))
}

/// Filename without its final extension. Doubles as the record id for
/// generated unique filenames.
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

impl Deref for StorageDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for StorageDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for StorageDir {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_under_root() {
        let dir = StorageDir::new("/data/photos");
        assert_eq!(dir.catalog_path(), Path::new("/data/photos/photos.json"));
        assert_eq!(dir.lock_path(), Path::new("/data/photos/.photos.lock"));
        assert_eq!(
            dir.media_path("17000-abc123.jpg"),
            Path::new("/data/photos/17000-abc123.jpg")
        );
    }

    #[test]
    fn derived_names_keep_prefixes() {
        assert_eq!(thumbnail_name("17000-abc123.jpg"), "thumb_17000-abc123.jpg");
        assert_eq!(original_name("17000-abc123.jpg"), "original_17000-abc123.jpg");
        assert_eq!(motion_name("17000-abc123.jpg"), "motion_17000-abc123.mov");
    }

    #[test]
    fn video_thumbnail_is_always_jpeg() {
        assert_eq!(video_thumbnail_name("17000-abc123.mp4"), "thumb_17000-abc123.jpg");
        assert_eq!(video_thumbnail_name("17000-abc123.mov"), "thumb_17000-abc123.jpg");
    }

    #[test]
    fn file_stem_strips_one_extension() {
        assert_eq!(file_stem("17000-abc123.jpg"), "17000-abc123");
        assert_eq!(file_stem("no_extension"), "no_extension");
    }
}
