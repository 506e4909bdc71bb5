//! CLI parsing and orchestration. Parses args, prepares the output root and runs the download.
//! Maps errors to exit codes.

use crate::config;
use crate::crop::{BlankCropper, DEFAULT_CROP_FACTOR, DEFAULT_CROP_MAX_SIZE};
use crate::download::{DownloadError, DownloadOptions, Downloader, WorkspaceManager, DEFAULT_RETRIES};
use crate::http::{Fetcher, DEFAULT_MAX_REDIRECTS};
use crate::model::ContentSource;
use crate::provider::{ProviderError, ProviderRegistry};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Download(#[from] DownloadError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Provider(_) => 1,
            CliRunError::Download(e) => match e {
                DownloadError::EmptyArchiveName { .. }
                | DownloadError::NoVolumes
                | DownloadError::DestinationNotDirectory { .. }
                | DownloadError::CreateDestination { .. } => 1,
                DownloadError::Bootstrap { .. } | DownloadError::Provider(_) => 2,
                DownloadError::Workspace(_) | DownloadError::Archive(_) => 3,
            },
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "manga-dl")]
#[command(about = "Download manga volumes and pack each one into a zip archive")]
#[command(
    after_help = "Config file keys (destination, user_agent, timeout_secs, retry_count, max_redirects, allow_webp) are read from ./manga-dl.toml or ~/.config/manga-dl/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Manga URL. Prompted for when omitted.
    #[arg(short, long)]
    pub url: Option<String>,

    /// Manga name. Resolved from the site when omitted.
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Destination folder. Default: ./manga
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Report skips, retries and failures while downloading.
    #[arg(short, long)]
    pub info: bool,

    /// Show a progress bar per volume.
    #[arg(short, long)]
    pub progress: bool,

    /// Skip this many volumes (counted after ordering).
    #[arg(short, long, default_value_t = 0)]
    pub skip_volumes: usize,

    /// Don't add the manga name to the destination path.
    #[arg(long)]
    pub no_name: bool,

    /// Allow downloading webp images.
    #[arg(long)]
    pub allow_webp: bool,

    /// Keep the site's volume order (usually newest first).
    #[arg(long)]
    pub reverse_downloading: bool,

    /// Download volumes even if their archive already exists.
    #[arg(long)]
    pub rewrite_exists_archives: bool,

    /// Crop white borders from images.
    #[arg(long)]
    pub crop_blank: bool,

    /// Lightness tolerance 0..255 for --crop-blank.
    #[arg(long, default_value_t = DEFAULT_CROP_FACTOR)]
    pub crop_blank_factor: u8,

    /// Maximum crop per edge in pixels for --crop-blank.
    #[arg(long, default_value_t = DEFAULT_CROP_MAX_SIZE)]
    pub crop_blank_max_size: u32,
}

/// Install the stderr subscriber. `RUST_LOG` overrides the level chosen by --info.
fn init_logging(info_mode: bool) {
    let default = if info_mode { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print `message` and read one line. Returns None when the user types `q`.
fn prompt(message: &str, input: &mut impl BufRead) -> Result<Option<String>, CliRunError> {
    println!("{}", message);
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| CliRunError::InvalidInput(format!("Cannot read input: {}", e)))?;
    let line = line.trim();
    if line == "q" {
        return Ok(None);
    }
    Ok(Some(line.to_string()))
}

/// Create the output root if needed and check that it is a writable directory.
fn ensure_output_root(path: &Path) -> Result<(), CliRunError> {
    if !path.exists() {
        return std::fs::create_dir_all(path).map_err(|e| {
            CliRunError::InvalidInput(format!(
                "Cannot create destination directory {}: {}",
                path.display(),
                e
            ))
        });
    }
    if !path.is_dir() {
        return Err(CliRunError::InvalidInput(format!(
            "Destination not exist or not directory: {}",
            path.display()
        )));
    }
    tempfile::tempfile_in(path).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Destination directory not writable: {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success or user quit; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    init_logging(args.info);

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;

    let destination = match args
        .destination
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.destination.clone()))
    {
        Some(d) => d,
        None => std::env::current_dir()
            .map_err(|e| CliRunError::InvalidInput(format!("Cannot determine current directory: {}", e)))?
            .join("manga"),
    };
    ensure_output_root(&destination)?;

    let attach_name = !args.no_name;
    let mut stdin = std::io::stdin().lock();
    let mut name = args.name.clone();
    let url = match &args.url {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => {
            let Some(url) = prompt("Please, paste manga url.", &mut stdin)? else {
                info!("Quit command. Exit");
                return Ok(());
            };
            if attach_name && name.trim().is_empty() {
                let Some(n) = prompt("Please, paste manga name", &mut stdin)? else {
                    info!("Quit command. Exit");
                    return Ok(());
                };
                name = n;
            }
            url
        }
    };

    let registry = ProviderRegistry::with_defaults();
    let provider = registry.resolve(&url)?;
    info!(provider = provider.name(), "provider selected");

    let user_agent = config.as_ref().and_then(|c| c.user_agent.clone());
    let timeout_secs = config.as_ref().and_then(|c| c.timeout_secs);
    let max_redirects = config
        .as_ref()
        .and_then(|c| c.max_redirects)
        .unwrap_or(DEFAULT_MAX_REDIRECTS);
    let retries = config
        .as_ref()
        .and_then(|c| c.retry_count)
        .unwrap_or(DEFAULT_RETRIES)
        .max(1);
    let allow_webp =
        args.allow_webp || config.as_ref().and_then(|c| c.allow_webp).unwrap_or(false);

    let mut builder = Fetcher::builder()
        .max_redirects(max_redirects)
        .allow_webp(allow_webp);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(secs) = timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    let fetcher = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let mut workspaces = WorkspaceManager::new();
    let cleanup = workspaces.cleanup_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        cleanup.cleanup();
        eprintln!("User interrupt. Exit");
        std::process::exit(0);
    }) {
        warn!("Failed to set interrupt handler: {}", e);
    }

    let options = DownloadOptions {
        destination,
        attach_name,
        skip_volumes: args.skip_volumes,
        reverse: args.reverse_downloading,
        rewrite_existing: args.rewrite_exists_archives,
        retries,
        show_progress: args.progress,
    };
    let cropper = BlankCropper::new(args.crop_blank_factor, args.crop_blank_max_size);
    let mut downloader = Downloader::new(&fetcher, &options);
    if args.crop_blank {
        downloader = downloader.post_processor(&cropper);
    }

    let mut source = ContentSource::new(url, name, provider);
    let report = downloader.run(&mut source, &mut workspaces)?;
    info!(
        archives = report.archives_written,
        skipped = report.volumes_skipped,
        empty = report.volumes_empty,
        images = report.images_downloaded,
        failed_images = report.images_failed,
        "Done"
    );
    Ok(())
}
