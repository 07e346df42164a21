//! Sidecar manifest recording the intent behind a staged download.
//!
//! The downloader writes one manifest per staged media file as
//! `{filename}.manifest.json`. The conversion planner prefers it over parsing
//! the filename prefix; files without one fall back to the prefix token.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::TrackSpec;
use crate::Error;

/// Suffix appended to a staged filename to locate its manifest.
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// What was requested for one staged media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedManifest {
    /// Identifier the file was downloaded for.
    pub media_id: String,
    /// Tracks the requester wants converted.
    pub tracks: TrackSpec,
    /// Language of the requested subtitle sidecar, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_language: Option<String>,
    /// Output basename without extension (e.g. `Title-abc123`).
    pub output_stem: String,
}

impl StagedManifest {
    /// Manifest path for the given staged media file.
    pub fn path_for(media_path: &Path) -> PathBuf {
        let mut name = media_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(MANIFEST_SUFFIX);
        media_path.with_file_name(name)
    }

    /// Load the manifest belonging to `media_path`, if one exists.
    ///
    /// A manifest that exists but cannot be parsed is a validation error.
    /// Callers that can fall back to the filename prefix may ignore it.
    pub fn load_for(media_path: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(media_path);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map(Some).map_err(|e| {
            Error::Validation(format!("invalid manifest {}: {e}", path.display()))
        })
    }

    /// Write this manifest next to `media_path`.
    ///
    /// The JSON goes to a temp file in the same directory which is then
    /// renamed over the manifest path, so readers never see a partial file.
    pub fn write_for(&self, media_path: &Path) -> Result<PathBuf> {
        let path = Self::path_for(media_path);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("manifest serialization: {e}")))?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&path).map_err(|e| Error::from(e.error))?;
        Ok(path)
    }
}
