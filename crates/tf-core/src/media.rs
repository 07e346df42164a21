//! Media-domain constants shared by the downloader and the planner.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions (without the dot) the scanner accepts as batch inputs.
pub const INPUT_EXTENSIONS: &[&str] = &["mkv", "m4a", "mp4", "webm", "mp3"];

/// Extension of converted video output.
pub const VIDEO_OUTPUT_EXTENSION: &str = "mp4";

/// Extension of converted audio output.
pub const AUDIO_OUTPUT_EXTENSION: &str = "mp3";

/// Whether `path` carries an allow-listed input extension.
///
/// Matching is case-sensitive, like the downloader's naming.
pub fn is_input_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| INPUT_EXTENSIONS.contains(&e))
}

/// Subtitle sidecar formats, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    WebVtt,
    Ssa,
    Ass,
    SubRip,
}

impl SubtitleFormat {
    /// Every supported format, highest priority first.
    pub const PRIORITY: [SubtitleFormat; 4] = [
        SubtitleFormat::WebVtt,
        SubtitleFormat::Ssa,
        SubtitleFormat::Ass,
        SubtitleFormat::SubRip,
    ];

    /// File extension of the sidecar.
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::WebVtt => "vtt",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::SubRip => "srt",
        }
    }

    /// Demuxer name ffmpeg expects after `-f`.
    pub fn demuxer(&self) -> &'static str {
        match self {
            SubtitleFormat::WebVtt => "webvtt",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::SubRip => "srt",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.demuxer())
    }
}
