//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the intake server, directories, tools, conversion and
//! downloading. Every section defaults sensibly so a completely empty `{}`
//! file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: DirsConfig,
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
    pub download: DownloadConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.paths.staging_dir == self.paths.output_dir {
            warnings.push(
                "paths.staging_dir and paths.output_dir are the same; a successful batch \
                 will clear converted output"
                    .into(),
            );
        }

        if self.conversion.subtitle_language.trim().is_empty() {
            warnings.push("conversion.subtitle_language is empty".into());
        }

        if self.download.subtitle_language.trim().is_empty() {
            warnings.push("download.subtitle_language is empty".into());
        }

        if self.conversion.subtitle_language != self.download.subtitle_language {
            warnings.push(format!(
                "conversion.subtitle_language '{}' differs from download.subtitle_language '{}'; \
                 staged files without a manifest will not find their subtitles",
                self.conversion.subtitle_language, self.download.subtitle_language
            ));
        }

        if !self.download.url_template.contains("{id}") {
            warnings.push(format!(
                "download.url_template '{}' has no {{id}} placeholder",
                self.download.url_template
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP intake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8908,
        }
    }
}

/// The two directories the pipeline works on.
///
/// Staging holds downloader output awaiting conversion; output holds the
/// converted artifacts. Nothing else is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirsConfig {
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("./data/downloads"),
            output_dir: PathBuf::from("./data/output"),
        }
    }
}

impl DirsConfig {
    pub fn new(staging_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Resolve both directories against the current working directory.
    pub fn absolutize(&self) -> Result<Self> {
        Ok(Self {
            staging_dir: std::path::absolute(&self.staging_dir)?,
            output_dir: std::path::absolute(&self.output_dir)?,
        })
    }

    /// Create both directories if they do not exist yet.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.staging_dir, &self.output_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                tracing::info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }
}

/// Paths and limits for external CLI tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub yt_dlp_path: Option<PathBuf>,
    /// Upper bound for one batched ffmpeg invocation.
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,
    /// Upper bound for one yt-dlp invocation.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_transcode_timeout() -> u64 {
    6 * 60 * 60
}
fn default_download_timeout() -> u64 {
    60 * 60
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            yt_dlp_path: None,
            transcode_timeout_secs: default_transcode_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

/// Conversion planning policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Skip outputs that already exist instead of overwriting them.
    #[serde(default = "default_true")]
    pub skip_if_output_exists: bool,
    /// Stream-copy video/audio into the video container instead of re-encoding.
    #[serde(default = "default_true")]
    pub remux_only: bool,
    /// Language code used to look up subtitle sidecars for files that carry
    /// no manifest.
    #[serde(default = "default_language")]
    pub subtitle_language: String,
}

fn default_true() -> bool {
    true
}
fn default_language() -> String {
    "en".into()
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            skip_if_output_exists: true,
            remux_only: true,
            subtitle_language: default_language(),
        }
    }
}

/// Downloader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Subtitle language requested when a download wants subtitles.
    #[serde(default = "default_language")]
    pub subtitle_language: String,
    /// URL built for each media id; `{id}` is replaced.
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

fn default_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".into()
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            subtitle_language: default_language(),
            url_template: default_url_template(),
        }
    }
}

impl DownloadConfig {
    /// Build the URL handed to the downloader for a media id.
    pub fn url_for(&self, media_id: &str) -> String {
        self.url_template.replace("{id}", media_id)
    }
}
