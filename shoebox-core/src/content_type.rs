use serde::{Deserialize, Serialize};

/// Content type for media files in the storage root.
///
/// Wraps MIME types as an enum for type-safe comparisons. The `is_video`
/// check doubles as the pipeline's image/video classification, so the
/// variant set is exactly the extension table the upload path accepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    // Images
    Jpeg,
    Png,
    Gif,
    Webp,
    Heic,
    Heif,
    // RAW images
    CanonRaw,
    NikonRaw,
    SonyRaw,
    AdobeDng,
    // Video
    QuickTime,
    Mp4,
    M4v,
    Avi,
    Wmv,
    Flv,
    WebmVideo,
    Matroska,
    ThreeGp,
    // Other
    #[default]
    OctetStream,
}

impl ContentType {
    /// MIME type string (e.g., "image/jpeg", "video/quicktime").
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
            Self::CanonRaw => "image/x-canon-cr2",
            Self::NikonRaw => "image/x-nikon-nef",
            Self::SonyRaw => "image/x-sony-arw",
            Self::AdobeDng => "image/x-adobe-dng",
            Self::QuickTime => "video/quicktime",
            Self::Mp4 => "video/mp4",
            Self::M4v => "video/x-m4v",
            Self::Avi => "video/x-msvideo",
            Self::Wmv => "video/x-ms-wmv",
            Self::Flv => "video/x-flv",
            Self::WebmVideo => "video/webm",
            Self::Matroska => "video/x-matroska",
            Self::ThreeGp => "video/3gpp",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Map a file extension to its content type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "heic" => Self::Heic,
            "heif" => Self::Heif,
            "cr2" => Self::CanonRaw,
            "nef" => Self::NikonRaw,
            "arw" => Self::SonyRaw,
            "dng" => Self::AdobeDng,
            "mov" => Self::QuickTime,
            "mp4" => Self::Mp4,
            "m4v" => Self::M4v,
            "avi" => Self::Avi,
            "wmv" => Self::Wmv,
            "flv" => Self::Flv,
            "webm" => Self::WebmVideo,
            "mkv" => Self::Matroska,
            "3gp" => Self::ThreeGp,
            _ => Self::OctetStream,
        }
    }

    /// Content type for a filename, falling back to octet-stream when the
    /// extension is missing or unknown.
    pub fn from_filename(name: &str) -> Self {
        std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::OctetStream)
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Self::QuickTime
                | Self::Mp4
                | Self::M4v
                | Self::Avi
                | Self::Wmv
                | Self::Flv
                | Self::WebmVideo
                | Self::Matroska
                | Self::ThreeGp
        )
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Jpeg
                | Self::Png
                | Self::Gif
                | Self::Webp
                | Self::Heic
                | Self::Heif
                | Self::CanonRaw
                | Self::NikonRaw
                | Self::SonyRaw
                | Self::AdobeDng
        )
    }
}

impl Serialize for ContentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "image/jpeg" => Self::Jpeg,
            "image/png" => Self::Png,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "image/heic" => Self::Heic,
            "image/heif" => Self::Heif,
            "image/x-canon-cr2" => Self::CanonRaw,
            "image/x-nikon-nef" => Self::NikonRaw,
            "image/x-sony-arw" => Self::SonyRaw,
            "image/x-adobe-dng" => Self::AdobeDng,
            "video/quicktime" => Self::QuickTime,
            "video/mp4" => Self::Mp4,
            "video/x-m4v" => Self::M4v,
            "video/x-msvideo" => Self::Avi,
            "video/x-ms-wmv" => Self::Wmv,
            "video/x-flv" => Self::Flv,
            "video/webm" => Self::WebmVideo,
            "video/x-matroska" => Self::Matroska,
            "video/3gpp" => Self::ThreeGp,
            _ => Self::OctetStream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(ContentType::from_extension("JPG"), ContentType::Jpeg);
        assert_eq!(ContentType::from_extension("MoV"), ContentType::QuickTime);
    }

    #[test]
    fn video_extensions_classify_as_video() {
        for ext in ["mp4", "mov", "m4v", "avi", "wmv", "flv", "webm", "mkv", "3gp"] {
            assert!(
                ContentType::from_extension(ext).is_video(),
                "{ext} should classify as video"
            );
        }
    }

    #[test]
    fn image_extensions_classify_as_image() {
        for ext in ["jpg", "jpeg", "png", "heic", "cr2", "dng"] {
            assert!(
                ContentType::from_extension(ext).is_image(),
                "{ext} should classify as image"
            );
        }
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(ContentType::from_extension("exe"), ContentType::OctetStream);
        assert!(!ContentType::from_extension("exe").is_video());
    }

    #[test]
    fn from_filename_without_extension() {
        assert_eq!(ContentType::from_filename("noext"), ContentType::OctetStream);
        assert_eq!(ContentType::from_filename("a.HEIC"), ContentType::Heic);
    }

    #[test]
    fn mime_roundtrip() {
        let json = serde_json::to_string(&ContentType::QuickTime).unwrap();
        assert_eq!(json, "\"video/quicktime\"");
        let back: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentType::QuickTime);
    }
}
