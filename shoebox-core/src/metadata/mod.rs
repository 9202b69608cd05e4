//! Best-effort metadata extraction.
//!
//! Image files are parsed in-process; video files are probed through the
//! external ffprobe collaborator. Neither path is allowed to fail an upload:
//! image extraction degrades to an empty outcome, video probing degrades to
//! an error-marked metadata object.

mod exif;
mod probe;

pub use self::exif::{extract_image_metadata, Extraction};
pub use self::probe::{FfprobeProber, ProbeError, VideoProbe, VideoProber};
