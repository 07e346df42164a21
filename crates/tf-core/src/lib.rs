//! tf-core: shared error type, configuration, request and manifest types.
//!
//! This crate is the foundational dependency for all other tf-* crates. It
//! owns the vocabulary the request intake, the downloader and the conversion
//! planner agree on: [`DownloadRequest`], [`TrackSpec`], [`StagedManifest`]
//! and the media constants in [`media`].

pub mod config;
pub mod error;
pub mod manifest;
pub mod media;
pub mod request;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use manifest::StagedManifest;
pub use media::SubtitleFormat;
pub use request::{DownloadRequest, TrackSpec};
