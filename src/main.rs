mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use tf_av::{DownloadList, ToolRegistry, YtDlpDownloader, FFMPEG, YT_DLP};
use tf_core::config::Config;
use tf_pipeline::{BatchExecutor, BatchOutcome};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tubeforged=trace,tf_core=debug,tf_av=debug,tf_pipeline=debug,tf_server=debug,tower_http=debug".to_string()
        } else {
            "tubeforged=info,tf_core=info,tf_av=info,tf_pipeline=info,tf_server=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { ref host, port } => {
            let mut config = load_config(&cli);
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(tf_server::start(config))?;
            Ok(())
        }
        Commands::Convert { recode } => {
            let mut config = load_config(&cli);
            if recode {
                config.conversion.remux_only = false;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_staged(config))
        }
        Commands::Download { ref file, audio } => {
            let config = load_config(&cli);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(download_list(config, file, audio))
        }
        Commands::CheckTools => check_tools(&load_config(&cli)),
        Commands::Validate {
            config: ref config_path,
        } => {
            let path = config_path.as_ref().or(cli.config.as_ref());
            validate_config(path.map(|p| p.as_path()))
        }
        Commands::Version => {
            println!("tubeforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Config file (or defaults) with the global directory flags applied.
fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(ref dir) = cli.staging_dir {
        config.paths.staging_dir = dir.clone();
    }
    if let Some(ref dir) = cli.output_dir {
        config.paths.output_dir = dir.clone();
    }
    config
}

async fn convert_staged(config: Config) -> Result<()> {
    let dirs = config.paths.absolutize()?;
    dirs.ensure()?;

    let tools = ToolRegistry::discover(&config.tools);
    let ffmpeg = tools.require(FFMPEG)?;

    tracing::info!("Converting staged files in {}", dirs.staging_dir.display());
    let executor = BatchExecutor::new(ffmpeg, dirs)
        .with_timeout(Duration::from_secs(config.tools.transcode_timeout_secs));

    match executor.run_pass(&config.conversion).await? {
        BatchOutcome::Skipped => println!("Nothing to convert"),
        BatchOutcome::Converted { outputs, cleared } => {
            println!("Converted {outputs} output(s); removed {cleared} staged file(s)");
        }
    }
    Ok(())
}

async fn download_list(config: Config, file: &Path, default_to_audio: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Cannot read download list {}: {e}", file.display()))?;
    let list = DownloadList::parse(&contents, default_to_audio)?;
    if list.is_empty() {
        println!("No links found in {}", file.display());
        return Ok(());
    }

    let dirs = config.paths.absolutize()?;
    dirs.ensure()?;

    let tools = ToolRegistry::discover(&config.tools);
    let yt_dlp = tools.require(YT_DLP)?;

    let downloader = YtDlpDownloader::new(yt_dlp, &dirs.staging_dir, config.download.clone())
        .with_timeout(Duration::from_secs(config.tools.download_timeout_secs));

    tracing::info!("Downloading {} item(s) from {}", list.len(), file.display());
    let lang = Some(config.download.subtitle_language.as_str()).filter(|l| !l.is_empty());
    let failed = list.download_all(&downloader, lang).await;
    if failed > 0 {
        anyhow::bail!("{failed} download group(s) failed");
    }

    println!(
        "Downloaded {} item(s) into {}",
        list.len(),
        dirs.staging_dir.display()
    );
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Both ffmpeg and yt-dlp are needed to run the service.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Staging dir: {}", config.paths.staging_dir.display());
    println!("  Output dir: {}", config.paths.output_dir.display());
    println!(
        "  Conversion: remux_only={}, skip_if_output_exists={}, subtitles={}",
        config.conversion.remux_only,
        config.conversion.skip_if_output_exists,
        config.conversion.subtitle_language
    );

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
