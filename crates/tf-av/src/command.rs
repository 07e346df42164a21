//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use tf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> tf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-y")
///     .arg("-i").arg("/staging/v_Clip-xyz.mkv")
///     .arg("/output/Clip-xyz.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stderr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run the process from the given working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Render the full command line for logging.
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command and return its output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns [`tf_core::Error::Tool`] if spawning fails, waiting fails, or
    /// the timeout expires (the child is killed in that case).
    pub async fn output(&self) -> tf_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| tf_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(tf_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // The wait future owned the child; dropping it kills the process.
            Err(_elapsed) => Err(tf_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Everything [`output`](Self::output) returns, plus
    /// [`tf_core::Error::Tool`] when the process exits with a non-zero status
    /// (message includes the trimmed stderr).
    pub async fn execute(&self) -> tf_core::Result<ToolOutput> {
        let output = self.output().await?;
        if !output.status.success() {
            return Err(tf_core::Error::tool(
                self.program_name(),
                format!(
                    "exited with status {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            ));
        }
        Ok(output)
    }
}
