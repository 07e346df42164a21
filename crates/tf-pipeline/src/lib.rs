//! # tf-pipeline
//!
//! Conversion planning and batching for staged downloads.
//!
//! This crate provides:
//!
//! - **[`scan_staging`]** -- list allow-listed media files in staging, sorted.
//! - **[`ConversionPlan`]** -- per source file: wanted outputs, matching
//!   subtitle sidecar, destination paths, and its share of the ffmpeg command.
//! - **[`BatchCommand`]** -- folds many plans into one multi-input,
//!   multi-output ffmpeg invocation.
//! - **[`BatchExecutor`]** -- runs that invocation once and clears staging on
//!   success.
//! - **[`request_queue`]** / **[`Worker`]** -- the single-consumer queue of
//!   download requests and the loop that drains it.

pub mod batch;
pub mod executor;
pub mod plan;
pub mod queue;
pub mod scanner;
pub mod worker;

// Re-export key types at the crate root.
pub use batch::{BatchCommand, SlotAssignment, GLOBAL_FLAGS};
pub use executor::{clear_staging, BatchExecutor, BatchOutcome};
pub use plan::{ConversionPlan, OutputPaths, ResolvedSource, SubtitleTrack};
pub use queue::{request_queue, RequestReceiver, RequestSender};
pub use scanner::scan_staging;
pub use worker::Worker;
