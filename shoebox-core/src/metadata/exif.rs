use crate::model::{GpsCoordinates, ImageMetadata};
use exif::{In, Tag, Value};
use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

/// Degrees/minutes/seconds divisors for GPS rational triplets.
const DMS_DIVISORS: [f64; 3] = [1.0, 60.0, 3600.0];

const LAT_MAX: f64 = 90.0;
const LONG_MAX: f64 = 180.0;

/// Tag names and values that mark a motion-photo still.
///
/// Only these two signals may flag a Live Photo: an embedded motion
/// indicator, or (checked by the caller) a same-basename `.mov` sibling.
/// False negatives are fine; anything looser produces false positives.
const MOTION_MARKERS: &[&str] = &["MotionPhoto", "MicroVideo", "LivePhoto", "ContentIdentifier"];

/// How much of the embedded metadata survived extraction.
///
/// Callers can tell "the photo had no metadata" from "the parser failed",
/// but every variant still carries a usable [`ImageMetadata`] so ingestion
/// proceeds regardless.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Metadata parsed cleanly.
    Full(ImageMetadata),
    /// Metadata parsed, but one or more fields could not be converted.
    Partial(ImageMetadata),
    /// Nothing extracted.
    Empty {
        metadata: ImageMetadata,
        /// true when the parser failed, false when the file simply carries
        /// no embedded metadata.
        parse_failed: bool,
    },
}

impl Extraction {
    pub fn into_metadata(self) -> ImageMetadata {
        match self {
            Self::Full(m) | Self::Partial(m) | Self::Empty { metadata: m, .. } => m,
        }
    }

    /// True when extraction lost information it should have had.
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Full(_) => false,
            Self::Partial(_) => true,
            Self::Empty { parse_failed, .. } => *parse_failed,
        }
    }
}

/// Parse embedded metadata from an image file.
///
/// Never fails: parse errors degrade to `Empty { parse_failed: true }` so a
/// photo with unreadable metadata is still stored. Blocking; run it on a
/// blocking task from async contexts.
pub fn extract_image_metadata(path: &Path) -> Extraction {
    let empty = |parse_failed: bool| Extraction::Empty {
        metadata: ImageMetadata::default(),
        parse_failed,
    };

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Could not open {} for metadata: {}", path.display(), e);
            return empty(true);
        }
    };

    let parsed = match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(parsed) => parsed,
        Err(exif::Error::NotFound(_)) => return empty(false),
        Err(e) => {
            warn!("Failed to parse metadata in {}: {}", path.display(), e);
            return empty(true);
        }
    };

    let mut partial = false;

    let original_metadata: BTreeMap<String, String> = parsed
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .map(|f| (f.tag.to_string(), clean_display(&f.display_value().to_string())))
        .collect();

    let date_taken = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
        .iter()
        .find_map(|&tag| display_string(&parsed, tag));

    let orientation = parsed
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .filter(|v| (1..=8).contains(v))
        .unwrap_or(1);

    let gps = match extract_gps(&parsed) {
        GpsOutcome::Present(coords) => Some(coords),
        GpsOutcome::Absent => None,
        GpsOutcome::Malformed => {
            partial = true;
            None
        }
    };

    let metadata = ImageMetadata {
        date_taken,
        make: display_string(&parsed, Tag::Make),
        model: display_string(&parsed, Tag::Model),
        gps,
        is_live_photo: has_motion_marker(&original_metadata),
        orientation,
        original_metadata,
    };

    if partial {
        Extraction::Partial(metadata)
    } else {
        Extraction::Full(metadata)
    }
}

/// Check parsed tag names and values for motion-photo indicators.
fn has_motion_marker(tags: &BTreeMap<String, String>) -> bool {
    tags.iter().any(|(name, value)| {
        MOTION_MARKERS
            .iter()
            .any(|marker| name.contains(marker) || value.contains(marker))
    })
}

fn display_string(parsed: &exif::Exif, tag: Tag) -> Option<String> {
    parsed
        .get_field(tag, In::PRIMARY)
        .map(|f| clean_display(&f.display_value().to_string()))
        .filter(|s| !s.is_empty())
}

/// Strip the quoting the display formatter adds around ASCII values.
fn clean_display(value: &str) -> String {
    value.replace(['"', '\\'], "").trim().to_string()
}

enum GpsOutcome {
    Present(GpsCoordinates),
    Absent,
    Malformed,
}

/// Convert the GPS rational tags to signed decimal degrees.
///
/// South latitudes and west longitudes are negative. Conversion happens at
/// ingestion; the catalog never stores DMS.
fn extract_gps(parsed: &exif::Exif) -> GpsOutcome {
    let lat_field = parsed.get_field(Tag::GPSLatitude, In::PRIMARY);
    let long_field = parsed.get_field(Tag::GPSLongitude, In::PRIMARY);

    let (lat_field, long_field) = match (lat_field, long_field) {
        (Some(lat), Some(long)) => (lat, long),
        (None, None) => return GpsOutcome::Absent,
        _ => return GpsOutcome::Malformed,
    };

    let south = ref_matches(parsed, Tag::GPSLatitudeRef, 'S');
    let west = ref_matches(parsed, Tag::GPSLongitudeRef, 'W');

    match (
        dms_to_decimal(&lat_field.value, south, LAT_MAX),
        dms_to_decimal(&long_field.value, west, LONG_MAX),
    ) {
        (Some(latitude), Some(longitude)) => GpsOutcome::Present(GpsCoordinates {
            latitude,
            longitude,
        }),
        _ => GpsOutcome::Malformed,
    }
}

fn ref_matches(parsed: &exif::Exif, tag: Tag, negative_ref: char) -> bool {
    parsed
        .get_field(tag, In::PRIMARY)
        .map(|f| {
            f.display_value()
                .to_string()
                .to_uppercase()
                .contains(negative_ref)
        })
        .unwrap_or(false)
}

/// Sum a degree/minute/second rational triplet into decimal degrees.
fn dms_to_decimal(value: &Value, negative: bool, max: f64) -> Option<f64> {
    let rationals = match value {
        Value::Rational(r) if r.len() == 3 => r,
        _ => return None,
    };
    let degrees: f64 = rationals
        .iter()
        .zip(DMS_DIVISORS.iter())
        .map(|(r, div)| r.to_f64() / div)
        .sum();
    if !degrees.is_finite() {
        return None;
    }
    let degrees = degrees.clamp(0.0, max);
    Some(if negative { -degrees } else { degrees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::Rational;
    use tempfile::TempDir;

    fn rational(num: u32, denom: u32) -> Rational {
        Rational { num, denom }
    }

    #[test]
    fn dms_conversion_matches_decimal_degrees() {
        // 38° 53' 23.16" -> 38.8897666...
        let value = Value::Rational(vec![rational(38, 1), rational(53, 1), rational(2316, 100)]);
        let decimal = dms_to_decimal(&value, false, LAT_MAX).unwrap();
        assert!((decimal - 38.8897666).abs() < 1e-5);
    }

    #[test]
    fn southern_latitude_is_negative() {
        let value = Value::Rational(vec![rational(33, 1), rational(51, 1), rational(0, 1)]);
        let decimal = dms_to_decimal(&value, true, LAT_MAX).unwrap();
        assert!(decimal < 0.0);
        assert!((decimal + 33.85).abs() < 1e-6);
    }

    #[test]
    fn malformed_dms_is_rejected() {
        // Two components instead of three
        let short = Value::Rational(vec![rational(38, 1), rational(53, 1)]);
        assert!(dms_to_decimal(&short, false, LAT_MAX).is_none());
        // Zero denominator produces a non-finite sum
        let div_zero = Value::Rational(vec![rational(38, 0), rational(0, 1), rational(0, 1)]);
        assert!(dms_to_decimal(&div_zero, false, LAT_MAX).is_none());
    }

    #[test]
    fn motion_marker_matches_tag_name_or_value() {
        let mut tags = BTreeMap::new();
        tags.insert("Make".to_string(), "Apple".to_string());
        assert!(!has_motion_marker(&tags));

        tags.insert("MicroVideoOffset".to_string(), "12345".to_string());
        assert!(has_motion_marker(&tags));

        let mut by_value = BTreeMap::new();
        by_value.insert(
            "ImageDescription".to_string(),
            "MotionPhoto payload".to_string(),
        );
        assert!(has_motion_marker(&by_value));
    }

    #[test]
    fn unreadable_file_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not_an_image.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let extraction = extract_image_metadata(&path);
        assert!(extraction.is_degraded());
        match extraction {
            Extraction::Empty { parse_failed, metadata } => {
                assert!(parse_failed);
                assert_eq!(metadata.orientation, 1);
                assert!(!metadata.is_live_photo);
            }
            other => panic!("expected Empty, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let extraction = extract_image_metadata(Path::new("/nonexistent/zzz.jpg"));
        assert!(extraction.is_degraded());
    }

    #[test]
    fn clean_display_strips_ascii_quoting() {
        assert_eq!(clean_display("\"Apple\""), "Apple");
        assert_eq!(clean_display(" iPhone 13 "), "iPhone 13");
    }
}
