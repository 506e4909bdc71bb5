//! manga-dl: CLI downloader for manga sites. Each volume is packed into a zip archive.

pub mod archive;
pub mod cli;
pub mod config;
pub mod crop;
pub mod download;
pub mod http;
pub mod model;
pub mod provider;

// Re-exports for CLI and consumers.
pub use archive::{write_archive, ArchiveError};
pub use crop::{BlankCropper, ImagePostProcessor};
pub use download::{
    order_volumes, DownloadError, DownloadOptions, DownloadReport, Downloader, WorkspaceManager,
};
pub use http::{FetchError, Fetcher, FetcherBuilder, Session, SessionRequirements};
pub use model::{ArchiveManifest, ContentSource, Volume};
pub use provider::{Provider, ProviderError, ProviderRegistry, SiteClient};
