//! Unified error type for tubeforged.
//!
//! Every crate funnels its failures into [`Error`]. The intake boundary maps
//! it onto an HTTP status code via [`Error::http_status`]; everywhere else it
//! ends up in a log line.

use std::fmt;

/// Unified error type covering all failure modes in tubeforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file or other entity that must exist could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "source file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request or configuration data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, yt-dlp) failed or exited non-zero.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description, including captured stderr.
        message: String,
    },

    /// Fetching media through the downloader failed.
    #[error("Download error [{media_id}]: {message}")]
    Download {
        /// Media identifier(s) the download was for.
        media_id: String,
        /// Human-readable error description.
        message: String,
    },

    /// A conversion pipeline step failed.
    #[error("Pipeline error [{step}]: {message}")]
    Pipeline {
        /// The pipeline step that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Download { .. } => 502,
            Error::Pipeline { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Download`].
    pub fn download(media_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Download {
            media_id: media_id.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
