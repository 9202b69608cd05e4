use crate::content_type::ContentType;
use crate::model::VideoMetadata;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe exited with an error: {0}")]
    Failed(String),
    #[error("Failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Stream and container facts probed from one video file.
#[derive(Debug, Clone, Default)]
pub struct VideoProbe {
    pub duration_seconds: Option<f64>,
    pub byte_size: Option<u64>,
    pub bitrate: Option<u64>,
    pub container_format: Option<String>,
    pub codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub has_audio_track: bool,
}

impl VideoProbe {
    /// Attach the probed facts to a record-ready metadata object.
    pub fn into_metadata(self, mime_type: ContentType) -> VideoMetadata {
        VideoMetadata {
            mime_type,
            duration_seconds: self.duration_seconds,
            byte_size: self.byte_size,
            bitrate: self.bitrate,
            container_format: self.container_format,
            codec: self.codec,
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            has_audio_track: self.has_audio_track,
            error: None,
        }
    }
}

/// External probe collaborator for video files.
///
/// A trait so tests can inject a stub instead of requiring ffprobe on the
/// test machine.
#[async_trait]
pub trait VideoProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError>;
}

/// Probes by shelling out to the `ffprobe` binary with JSON output.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber;

#[async_trait]
impl VideoProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
        Ok(parsed.into_probe())
    }
}

// ffprobe prints numeric fields as strings; parse after the fact.

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

impl FfprobeOutput {
    fn into_probe(self) -> VideoProbe {
        let video = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let has_audio_track = self
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));
        let format = self.format.unwrap_or_default();

        VideoProbe {
            duration_seconds: format.duration.as_deref().and_then(|s| s.parse().ok()),
            byte_size: format.size.as_deref().and_then(|s| s.parse().ok()),
            bitrate: format.bit_rate.as_deref().and_then(|s| s.parse().ok()),
            container_format: format.format_name,
            codec: video.and_then(|s| s.codec_name.clone()),
            width: video.and_then(|s| s.width),
            height: video.and_then(|s| s.height),
            frame_rate: video
                .and_then(|s| s.r_frame_rate.as_deref())
                .and_then(parse_frame_rate),
            has_audio_track,
        }
    }
}

/// Parse ffprobe's fractional frame rate ("30000/1001") or a plain number.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, denom)) => {
            let num: f64 = num.trim().parse().ok()?;
            let denom: f64 = denom.trim().parse().ok()?;
            if denom == 0.0 {
                None
            } else {
                Some(num / denom)
            }
        }
        None => raw.trim().parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30000/1001"
            },
            {
                "codec_type": "audio",
                "codec_name": "aac"
            }
        ],
        "format": {
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "12.345000",
            "size": "1048576",
            "bit_rate": "679400"
        }
    }"#;

    #[test]
    fn parses_ffprobe_json() {
        let output: FfprobeOutput = serde_json::from_str(SAMPLE).unwrap();
        let probe = output.into_probe();
        assert_eq!(probe.codec.as_deref(), Some("h264"));
        assert_eq!(probe.width, Some(1920));
        assert_eq!(probe.height, Some(1080));
        assert_eq!(probe.byte_size, Some(1_048_576));
        assert_eq!(probe.bitrate, Some(679_400));
        assert!(probe.has_audio_track);
        assert!((probe.duration_seconds.unwrap() - 12.345).abs() < 1e-9);
        assert!((probe.frame_rate.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn missing_streams_probe_to_defaults() {
        let output: FfprobeOutput = serde_json::from_str(r#"{"format":{}}"#).unwrap();
        let probe = output.into_probe();
        assert!(probe.codec.is_none());
        assert!(!probe.has_audio_track);
        assert!(probe.duration_seconds.is_none());
    }

    #[test]
    fn frame_rate_fraction_and_plain() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    #[test]
    fn probe_attaches_mime_type() {
        let meta = VideoProbe {
            duration_seconds: Some(3.0),
            has_audio_track: true,
            ..Default::default()
        }
        .into_metadata(ContentType::Mp4);
        assert_eq!(meta.mime_type, ContentType::Mp4);
        assert!(meta.error.is_none());
        assert!(meta.has_audio_track);
    }
}
