//! Derived artifact generation.
//!
//! Produces the served copy (orientation-corrected for images, verbatim for
//! video), the 300x300 thumbnail, and the video poster frame. Image work
//! runs on blocking tasks; video frames come from the external ffmpeg
//! collaborator. Inputs are never mutated.

use crate::storage_dir::StorageDir;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

/// Thumbnails are square covers of this size.
pub const THUMBNAIL_SIZE: u32 = 300;

/// Poster frames are captured this far into playback.
const POSTER_FRAME_OFFSET: &str = "00:00:01.000";

/// Cover-crop filter matching the image thumbnail geometry.
const POSTER_SCALE_FILTER: &str =
    "scale=300:300:force_original_aspect_ratio=increase,crop=300:300";

/// Shared thumbnail substituted when video frame extraction fails.
pub const PLACEHOLDER_VIDEO_THUMB: &str = "default_video_thumb.png";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("ffmpeg exited with an error: {0}")]
    Ffmpeg(String),
}

/// Write the orientation-corrected served copy of an image.
///
/// The correction is baked into the pixels; the full-fidelity original is
/// stored separately, so failure here is fatal for the upload rather than
/// silently serving a sideways photo.
pub async fn normalize_image(
    src: &Path,
    dest: &Path,
    orientation: u32,
) -> Result<(), ArtifactError> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), ArtifactError> {
        let img = image::open(&src)?;
        apply_orientation(img, orientation).save(&dest)?;
        Ok(())
    })
    .await?
}

/// Write a square cover thumbnail for an image.
///
/// Images already within the thumbnail box are re-encoded at their own size
/// rather than enlarged.
pub async fn image_thumbnail(
    src: &Path,
    dest: &Path,
    orientation: u32,
) -> Result<(), ArtifactError> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), ArtifactError> {
        let img = apply_orientation(image::open(&src)?, orientation);
        let thumb = if img.width() <= THUMBNAIL_SIZE && img.height() <= THUMBNAIL_SIZE {
            img
        } else {
            img.resize_to_fill(
                THUMBNAIL_SIZE,
                THUMBNAIL_SIZE,
                image::imageops::FilterType::Lanczos3,
            )
        };
        thumb.save(&dest)?;
        Ok(())
    })
    .await?
}

/// Capture a poster frame one second into a video, cover-cropped to the
/// thumbnail geometry. The caller substitutes [`PLACEHOLDER_VIDEO_THUMB`]
/// when this fails.
pub async fn video_poster(src: &Path, dest: &Path) -> Result<(), ArtifactError> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", POSTER_FRAME_OFFSET, "-i"])
        .arg(src)
        .args(["-frames:v", "1", "-vf", POSTER_SCALE_FILTER, "-y"])
        .arg(dest)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ArtifactError::Ffmpeg(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// Apply an EXIF orientation value (1-8) so the image displays upright.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.fliph().rotate270(),
        6 => img.rotate90(),
        7 => img.fliph().rotate90(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Create the shared placeholder video thumbnail if it is missing.
///
/// Called once at startup so records degraded by poster failures always
/// have a servable thumbnail file.
pub async fn ensure_placeholder_thumbnail(dir: &StorageDir) -> Result<(), ArtifactError> {
    let path = dir.media_path(PLACEHOLDER_VIDEO_THUMB);
    if tokio::fs::try_exists(&path).await? {
        return Ok(());
    }
    info!("Creating placeholder video thumbnail at {}", path.display());
    tokio::task::spawn_blocking(move || -> Result<(), ArtifactError> {
        let gray = image::RgbImage::from_pixel(
            THUMBNAIL_SIZE,
            THUMBNAIL_SIZE,
            image::Rgb([40, 40, 40]),
        );
        DynamicImage::ImageRgb8(gray).save(&path)?;
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_image(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 60, 30]));
        DynamicImage::ImageRgb8(img).save(path).unwrap();
    }

    #[tokio::test]
    async fn normalize_bakes_in_rotation() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("in.png");
        let dest = tmp.path().join("out.png");
        write_test_image(&src, 400, 200);

        // Orientation 6 is a 90° clockwise rotation
        normalize_image(&src, &dest, 6).await.unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (200, 400));
        // Source untouched
        let original = image::open(&src).unwrap();
        assert_eq!((original.width(), original.height()), (400, 200));
    }

    #[tokio::test]
    async fn normalize_without_correction_keeps_dimensions() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("in.png");
        let dest = tmp.path().join("out.png");
        write_test_image(&src, 640, 480);

        normalize_image(&src, &dest, 1).await.unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!((out.width(), out.height()), (640, 480));
    }

    #[tokio::test]
    async fn thumbnail_is_square_cover() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("in.png");
        let dest = tmp.path().join("thumb.png");
        write_test_image(&src, 1200, 800);

        image_thumbnail(&src, &dest, 1).await.unwrap();

        let thumb = image::open(&dest).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
    }

    #[tokio::test]
    async fn small_images_are_not_enlarged() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("in.png");
        let dest = tmp.path().join("thumb.png");
        write_test_image(&src, 120, 90);

        image_thumbnail(&src, &dest, 1).await.unwrap();

        let thumb = image::open(&dest).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (120, 90));
    }

    #[tokio::test]
    async fn normalize_fails_on_undecodable_input() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("junk.jpg");
        let dest = tmp.path().join("out.jpg");
        tokio::fs::write(&src, b"not an image").await.unwrap();

        let result = normalize_image(&src, &dest, 1).await;
        assert!(matches!(result, Err(ArtifactError::Image(_))));
    }

    #[tokio::test]
    async fn placeholder_created_once() {
        let tmp = TempDir::new().unwrap();
        let dir = StorageDir::new(tmp.path());

        ensure_placeholder_thumbnail(&dir).await.unwrap();
        let path = dir.media_path(PLACEHOLDER_VIDEO_THUMB);
        assert!(path.exists());

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));

        // Second call is a no-op, not an error
        ensure_placeholder_thumbnail(&dir).await.unwrap();
    }
}
