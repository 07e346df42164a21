//! # tf-av
//!
//! External tool management for the tubeforged pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and yt-dlp.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Downloading** ([`Downloader`], [`YtDlpDownloader`]) -- fetch media and
//!   subtitle sidecars into the staging directory.

pub mod command;
pub mod downloader;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use downloader::{media_id_from_link, DownloadList, Downloader, YtDlpDownloader};
pub use tools::{ToolInfo, ToolRegistry, FFMPEG, YT_DLP};
