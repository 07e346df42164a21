//! Batch executor: run the assembled ffmpeg command once, then clear staging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tf_core::config::{ConversionConfig, DirsConfig};
use tf_core::Error;

use crate::batch::BatchCommand;
use crate::plan::ConversionPlan;

/// Default upper bound for one batched ffmpeg run: 6 hours.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// What a batch run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing needed converting; ffmpeg was not invoked.
    Skipped,
    /// ffmpeg succeeded and staging was cleared.
    Converted {
        /// Output files written.
        outputs: usize,
        /// Staging entries removed afterwards.
        cleared: usize,
    },
}

/// Runs batched conversions over the staging directory.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    program: PathBuf,
    dirs: DirsConfig,
    timeout: Duration,
}

impl BatchExecutor {
    /// Create an executor invoking `program` (normally ffmpeg).
    pub fn new(program: impl Into<PathBuf>, dirs: DirsConfig) -> Self {
        Self {
            program: program.into(),
            dirs,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: cap the run time of the batched invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dirs(&self) -> &DirsConfig {
        &self.dirs
    }

    /// Scan staging, plan every file and execute the batch.
    ///
    /// Scanning or planning failures abort the pass before anything runs.
    pub async fn run_pass(&self, policy: &ConversionConfig) -> tf_core::Result<BatchOutcome> {
        let plans = ConversionPlan::plan_staging(&self.dirs, policy)?;
        self.execute(&plans).await
    }

    /// Build and run one ffmpeg invocation covering `plans`.
    ///
    /// Returns [`BatchOutcome::Skipped`] without invoking anything when no
    /// plan contributes an output. On a zero exit status every entry in
    /// staging is removed; on failure staging is left untouched and the
    /// captured stderr is returned in an [`Error::Tool`].
    pub async fn execute(&self, plans: &[ConversionPlan]) -> tf_core::Result<BatchOutcome> {
        let batch = BatchCommand::build(plans)?;
        if batch.is_empty() {
            tracing::info!(plans = plans.len(), "Nothing to convert");
            return Ok(BatchOutcome::Skipped);
        }

        std::fs::create_dir_all(&self.dirs.output_dir)?;

        let cmd = batch.to_tool_command(self.program.clone(), self.timeout);
        tracing::info!(
            inputs = batch.input_count(),
            outputs = batch.output_count(),
            "Starting batch conversion"
        );
        tracing::debug!("Batch command: {}", cmd.display());

        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = output.stderr.trim();
            tracing::error!(status = %output.status, "Batch conversion failed:\n{stderr}");
            return Err(Error::tool(
                self.program_name(),
                format!("exited with status {}: {stderr}", output.status),
            ));
        }

        tracing::info!("Batch conversion succeeded; clearing staging");
        let cleared = clear_staging(&self.dirs.staging_dir)?;
        Ok(BatchOutcome::Converted {
            outputs: batch.output_count(),
            cleared,
        })
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}

/// Remove every file in `staging_dir`, not only the ones just converted.
///
/// Failures on individual entries are logged and skipped. Returns how many
/// entries were removed.
///
/// # Errors
///
/// [`Error::Io`] only if the directory itself cannot be listed.
pub fn clear_staging(staging_dir: &Path) -> tf_core::Result<usize> {
    let mut removed = 0;

    for entry in std::fs::read_dir(staging_dir)? {
        let path = match entry {
            Ok(e) => e.path(),
            Err(e) => {
                tracing::warn!("Couldn't read staging entry: {e}");
                continue;
            }
        };
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Couldn't clean {}: {e}", path.display()),
        }
    }

    Ok(removed)
}
