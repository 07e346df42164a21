//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools the pipeline shells out to (ffmpeg and yt-dlp) and provides
//! lookup methods for the rest of the workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The transcoder.
pub const FFMPEG: &str = "ffmpeg";

/// The downloader.
pub const YT_DLP: &str = "yt-dlp";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG, YT_DLP];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of its version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`tf_core::config::ToolsConfig`] supplies a
    /// custom path **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are omitted from the registry.
    pub fn discover(tools_config: &tf_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                YT_DLP => tools_config.yt_dlp_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "Configured path for {name} does not exist: {}; searching PATH",
                        p.display()
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths, bypassing discovery.
    pub fn from_paths<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, PathBuf)>,
        S: Into<String>,
    {
        Self {
            tools: entries.into_iter().map(|(n, p)| (n.into(), p)).collect(),
        }
    }

    /// Return the path of the given tool, or an [`tf_core::Error::Tool`] if
    /// it was not found during discovery.
    pub fn require(&self, name: &str) -> tf_core::Result<&Path> {
        self.tools.get(name).map(PathBuf::as_path).ok_or_else(|| {
            tf_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> --version` (`-version` for ffmpeg) and return the first line
/// of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        FFMPEG => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
