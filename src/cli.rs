use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tubeforged")]
#[command(author, version, about = "Download queue and batched ffmpeg conversion for online video")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory downloads land in (overrides the config file)
    #[arg(long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Directory converted files are written to (overrides the config file)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the download request intake and the conversion worker
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert everything currently in the staging directory
    Convert {
        /// Re-encode video instead of copying streams
        #[arg(long)]
        recode: bool,
    },

    /// Download every link listed in a file into the staging directory
    Download {
        /// File with one `[a|v|av] <link>` per line
        #[arg(required = true)]
        file: PathBuf,

        /// Treat bare links as audio-only instead of video-only
        #[arg(long)]
        audio: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
