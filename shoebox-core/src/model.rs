//! Catalog record types.
//!
//! Field names serialize in camelCase so the catalog document and API
//! payloads use the same spelling the clients already expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::artifacts::PLACEHOLDER_VIDEO_THUMB;
use crate::content_type::ContentType;

/// GPS position in signed decimal degrees.
///
/// Always stored as decimals; degree/minute/second display formatting is a
/// presentation concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

fn default_orientation() -> u32 {
    1
}

/// Metadata extracted from a still image at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// EXIF capture time as written by the camera (no timezone attached).
    pub date_taken: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub gps: Option<GpsCoordinates>,
    #[serde(default)]
    pub is_live_photo: bool,
    /// EXIF orientation value, 1-8. 1 means no correction needed.
    #[serde(default = "default_orientation")]
    pub orientation: u32,
    /// Every parsed EXIF field by name, preserved for display.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub original_metadata: BTreeMap<String, String>,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            date_taken: None,
            make: None,
            model: None,
            gps: None,
            is_live_photo: false,
            orientation: 1,
            original_metadata: BTreeMap::new(),
        }
    }
}

/// Technical metadata probed from a video container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub mime_type: ContentType,
    pub duration_seconds: Option<f64>,
    pub byte_size: Option<u64>,
    pub bitrate: Option<u64>,
    pub container_format: Option<String>,
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    #[serde(default)]
    pub has_audio_track: bool,
    /// Set when the probe collaborator failed; the record is stored anyway
    /// with the placeholder thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Variant metadata payload, tagged by media kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaMetadata {
    #[serde(rename = "image")]
    Image(ImageMetadata),
    #[serde(rename = "video")]
    Video(VideoMetadata),
}

impl MediaMetadata {
    pub fn is_live_photo(&self) -> bool {
        matches!(self, Self::Image(m) if m.is_live_photo)
    }
}

/// One stored photo or video: the authoritative catalog entry.
///
/// Created exactly once by the ingestion pipeline after every artifact is on
/// disk; never updated in place; destroyed only by delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Unique id, the stored filename without its extension.
    pub id: String,
    /// The served copy (normalized image, or verbatim video).
    pub filename: String,
    /// The untouched full-fidelity copy (`original_` prefix).
    pub original_filename: String,
    /// Filename supplied by the uploader, preserved for downloads.
    pub original_name: String,
    pub thumbnail: String,
    /// Live Photo motion companion (`motion_` prefix), when paired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_filename: Option<String>,
    pub metadata: MediaMetadata,
    /// SHA-256 of the raw uploaded bytes, hex-encoded.
    pub hash: String,
    pub is_video: bool,
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    /// All files in the storage root owned by this record.
    ///
    /// Excludes the shared placeholder video thumbnail, which is not
    /// per-record and must survive deletes.
    pub fn owned_files(&self) -> Vec<&str> {
        let mut files = vec![self.filename.as_str(), self.original_filename.as_str()];
        if self.thumbnail != PLACEHOLDER_VIDEO_THUMB {
            files.push(self.thumbnail.as_str());
        }
        if let Some(motion) = &self.motion_filename {
            files.push(motion.as_str());
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_record() -> MediaRecord {
        MediaRecord {
            id: "1700000000000-abc123".to_string(),
            filename: "1700000000000-abc123.jpg".to_string(),
            original_filename: "original_1700000000000-abc123.jpg".to_string(),
            original_name: "IMG_0001.jpg".to_string(),
            thumbnail: "thumb_1700000000000-abc123.jpg".to_string(),
            motion_filename: None,
            metadata: MediaMetadata::Image(ImageMetadata::default()),
            hash: "deadbeef".to_string(),
            is_video: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(image_record()).unwrap();
        assert!(json.get("originalFilename").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["metadata"]["type"], "image");
        // No motion file, no key
        assert!(json.get("motionFilename").is_none());
    }

    #[test]
    fn metadata_variant_roundtrip() {
        let video = MediaMetadata::Video(VideoMetadata {
            mime_type: ContentType::Mp4,
            duration_seconds: Some(12.5),
            has_audio_track: true,
            ..Default::default()
        });
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["mimeType"], "video/mp4");
        let back: MediaMetadata = serde_json::from_value(json).unwrap();
        match back {
            MediaMetadata::Video(v) => {
                assert_eq!(v.mime_type, ContentType::Mp4);
                assert_eq!(v.duration_seconds, Some(12.5));
                assert!(v.has_audio_track);
                assert!(v.error.is_none());
            }
            MediaMetadata::Image(_) => panic!("expected video variant"),
        }
    }

    #[test]
    fn owned_files_includes_motion_companion() {
        let mut record = image_record();
        record.motion_filename = Some("motion_1700000000000-abc123.mov".to_string());
        let files = record.owned_files();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&"motion_1700000000000-abc123.mov"));
    }

    #[test]
    fn owned_files_skips_shared_placeholder_thumbnail() {
        let mut record = image_record();
        record.thumbnail = PLACEHOLDER_VIDEO_THUMB.to_string();
        assert!(!record.owned_files().contains(&PLACEHOLDER_VIDEO_THUMB));
    }

    #[test]
    fn missing_live_photo_flag_defaults_false() {
        let json = r#"{"type":"image","dateTaken":null,"make":null,"model":null,"gps":null,"orientation":6}"#;
        let meta: MediaMetadata = serde_json::from_str(json).unwrap();
        assert!(!meta.is_live_photo());
        match meta {
            MediaMetadata::Image(m) => assert_eq!(m.orientation, 6),
            MediaMetadata::Video(_) => panic!("expected image variant"),
        }
    }
}
