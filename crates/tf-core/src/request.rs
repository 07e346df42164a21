//! Download requests and the track-spec token.
//!
//! A [`TrackSpec`] is the small `a`/`v` token that travels from the intake
//! through the downloader and ends up as the prefix of every staged filename
//! (`{spec}_{title}-{id}.{ext}`), where the conversion planner reads it back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which media tracks were requested for a download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackSpec {
    pub audio: bool,
    pub video: bool,
}

impl TrackSpec {
    pub fn new(audio: bool, video: bool) -> Self {
        Self { audio, video }
    }

    /// Parse a filename prefix token.
    ///
    /// Any token is accepted: the presence of `a` or `v` anywhere in it sets
    /// the corresponding flag, every other character is ignored.
    pub fn from_token(token: &str) -> Self {
        Self {
            audio: token.contains('a'),
            video: token.contains('v'),
        }
    }

    /// The canonical token, audio letter before video letter.
    pub fn as_str(&self) -> &'static str {
        match (self.audio, self.video) {
            (true, true) => "av",
            (true, false) => "a",
            (false, true) => "v",
            (false, false) => "",
        }
    }

    /// `true` when neither track is wanted.
    pub fn is_empty(&self) -> bool {
        !self.audio && !self.video
    }
}

impl fmt::Display for TrackSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single download+convert request accepted at the intake.
///
/// Consumed exactly once by the worker; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Opaque identifier handed to the downloader.
    pub media_id: String,
    pub want_video: bool,
    pub want_audio: bool,
    pub want_subtitles: bool,
}

impl DownloadRequest {
    pub fn new(
        media_id: impl Into<String>,
        want_video: bool,
        want_audio: bool,
        want_subtitles: bool,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            want_video,
            want_audio,
            want_subtitles,
        }
    }

    /// The track-spec token the downloader must tag its output with.
    pub fn track_spec(&self) -> TrackSpec {
        TrackSpec::new(self.want_audio, self.want_video)
    }
}
