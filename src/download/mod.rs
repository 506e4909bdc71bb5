//! Download orchestration: session bootstrap, volume ordering, skip/resume, per-image retries
//! and archive assembly. Site knowledge stays behind [Provider](crate::provider::Provider).

pub mod workspace;

pub use workspace::{CleanupHandle, VolumeWorkspace, WorkspaceManager};

use crate::archive::{partial_path, write_archive, ArchiveError};
use crate::crop::ImagePostProcessor;
use crate::http::{FetchError, FetchRequest, Fetcher, Session};
use crate::model::{
    archive_stem, image_file_name, zip_archive_stem, ArchiveManifest, ContentSource, Volume,
};
use crate::provider::{Provider, ProviderError, SiteClient};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Attempts per image (or prepackaged zip) before it is dropped.
pub const DEFAULT_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Could not establish a session with {url}: {source}")]
    Bootstrap {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Archive name is empty (volume {index}).")]
    EmptyArchiveName { index: usize },

    #[error("Volumes not found.")]
    NoVolumes,

    #[error("Destination not exist or not directory: {path}")]
    DestinationNotDirectory { path: PathBuf },

    #[error("Cannot create destination {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot prepare temporary workspace: {0}")]
    Workspace(#[source] io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// User options for one run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Output root. Archives go to `<destination>/<name>/<archive>.zip`.
    pub destination: PathBuf,
    /// Put archives under a directory named after the manga.
    pub attach_name: bool,
    /// Volumes to drop from the front of the processing order.
    pub skip_volumes: usize,
    /// Keep the provider's native (newest-first) order instead of oldest-first.
    pub reverse: bool,
    /// Download volumes whose archive already exists.
    pub rewrite_existing: bool,
    pub retries: u32,
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("manga"),
            attach_name: true,
            skip_volumes: 0,
            reverse: false,
            rewrite_existing: false,
            retries: DEFAULT_RETRIES,
            show_progress: false,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub archives_written: usize,
    pub archives_failed: usize,
    pub volumes_skipped: usize,
    pub volumes_empty: usize,
    pub volumes_failed: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
}

/// Processing order: oldest-first unless `reverse`, then drop the first `skip`.
pub fn order_volumes<T>(mut items: Vec<T>, reverse: bool, skip: usize) -> Vec<T> {
    if !reverse {
        items.reverse();
    }
    items.into_iter().skip(skip).collect()
}

/// Runs a whole download for one [ContentSource].
pub struct Downloader<'a> {
    fetcher: &'a Fetcher,
    options: &'a DownloadOptions,
    post_processor: Option<&'a dyn ImagePostProcessor>,
}

impl<'a> Downloader<'a> {
    pub fn new(fetcher: &'a Fetcher, options: &'a DownloadOptions) -> Self {
        Self {
            fetcher,
            options,
            post_processor: None,
        }
    }

    /// Run every stored image through `processor` (e.g. blank-border cropping).
    pub fn post_processor(mut self, processor: &'a dyn ImagePostProcessor) -> Self {
        self.post_processor = Some(processor);
        self
    }

    /// Bootstrap the session, resolve the name, fetch the main content, then process volumes.
    ///
    /// Fatal conditions return an error; single image failures are only counted.
    pub fn run(
        &self,
        source: &mut ContentSource<'_>,
        workspaces: &mut WorkspaceManager,
    ) -> Result<DownloadReport, DownloadError> {
        let provider = source.provider();
        let session = Session::bootstrap(
            self.fetcher,
            source.url(),
            &provider.session_requirements(),
        )
        .map_err(|e| DownloadError::Bootstrap {
            url: source.url().to_string(),
            source: e,
        })?;
        let client = SiteClient::new(self.fetcher, &session);

        if self.options.attach_name && source.name().is_empty() {
            let name = provider.manga_name(source.url(), &client)?;
            source.fill_name(&name);
        }
        let dest_dir = self.prepare_destination(source.name())?;
        let content = provider.main_content(source.url(), &client)?;

        let mut job = Job {
            options: self.options,
            fetcher: self.fetcher,
            post_processor: self.post_processor,
            provider,
            session: &session,
            client,
            url: source.url(),
            content,
            dest_dir,
            manifest: ArchiveManifest::new(source.url()),
            cleanup: workspaces.cleanup_handle(),
            report: DownloadReport::default(),
        };
        job.run(workspaces)?;
        Ok(job.report)
    }

    fn prepare_destination(&self, name: &str) -> Result<PathBuf, DownloadError> {
        let dir = if self.options.attach_name && !name.is_empty() {
            self.options.destination.join(name)
        } else {
            self.options.destination.clone()
        };
        if dir.exists() && !dir.is_dir() {
            return Err(DownloadError::DestinationNotDirectory { path: dir });
        }
        fs::create_dir_all(&dir).map_err(|e| DownloadError::CreateDestination {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }
}

/// State for one run after the session and main content are in hand.
struct Job<'j> {
    options: &'j DownloadOptions,
    fetcher: &'j Fetcher,
    post_processor: Option<&'j dyn ImagePostProcessor>,
    provider: &'j dyn Provider,
    session: &'j Session,
    client: SiteClient<'j>,
    url: &'j str,
    content: String,
    dest_dir: PathBuf,
    manifest: ArchiveManifest,
    cleanup: CleanupHandle,
    report: DownloadReport,
}

impl Job<'_> {
    fn run(&mut self, workspaces: &mut WorkspaceManager) -> Result<(), DownloadError> {
        let volumes = self.provider.volumes(&self.content, self.url, &self.client)?;

        if self.provider.download_zip_only() {
            return self.download_prepackaged(volumes);
        }
        if volumes.is_empty() {
            return Err(DownloadError::NoVolumes);
        }

        let ordered = order_volumes(volumes, self.options.reverse, 0);
        if self.options.skip_volumes >= ordered.len() {
            info!(
                skip = self.options.skip_volumes,
                total = ordered.len(),
                "All volumes skipped"
            );
        }
        for (i, volume) in ordered.iter().enumerate().skip(self.options.skip_volumes) {
            self.process_volume(i + 1, volume, workspaces)?;
        }
        Ok(())
    }

    fn archive_destination(&self, archive_name: &str) -> PathBuf {
        self.dest_dir
            .join(format!("{}.zip", archive_stem(archive_name)))
    }

    fn should_skip(&self, destination: &Path, archive_name: &str) -> bool {
        if !self.options.rewrite_existing && destination.is_file() {
            info!("Archive {} exists. Skip", archive_name);
            return true;
        }
        false
    }

    fn process_volume(
        &mut self,
        index: usize,
        volume: &Volume,
        workspaces: &mut WorkspaceManager,
    ) -> Result<(), DownloadError> {
        let archive_name = self.provider.archive_name(volume, index);
        if archive_name.trim().is_empty() {
            info!("Archive name is empty!");
            return Err(DownloadError::EmptyArchiveName { index });
        }
        let destination = self.archive_destination(&archive_name);
        if self.should_skip(&destination, &archive_name) {
            self.report.volumes_skipped += 1;
            return Ok(());
        }

        let images = match self.provider.images(&self.content, volume, &self.client) {
            Ok(images) => images,
            Err(e) => {
                warn!(volume = %volume.handle, error = %e, "could not list images");
                self.report.volumes_failed += 1;
                return Ok(());
            }
        };
        if images.is_empty() {
            info!("Images not found");
        }
        info!("Start downloading {}", archive_name);

        let workspace = workspaces.volume(index).map_err(DownloadError::Workspace)?;
        let progress = self.progress_bar(images.len(), &archive_name);
        let mut stored = 0usize;
        for (n, url) in images.iter().enumerate() {
            let path = workspace.path().join(image_file_name(n + 1, url));
            if self.download_file(url, &path) {
                stored += 1;
                self.report.images_downloaded += 1;
                self.post_process(&path);
            } else {
                self.report.images_failed += 1;
            }
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if stored > 0 {
            self.cleanup.track_partial(Some(&partial_path(&destination)));
            let written = write_archive(workspace.path(), &destination, &self.manifest);
            self.cleanup.track_partial(None);
            written?;
            self.report.archives_written += 1;
        } else {
            warn!("No images downloaded for {}; archive not written", archive_name);
            self.report.volumes_empty += 1;
        }
        drop(workspace);
        Ok(())
    }

    /// Fetch `url` into `path`, retrying transport failures up to the retry ceiling.
    ///
    /// HTTP error statuses are not retried; the item is dropped.
    fn download_file(&self, url: &str, path: &Path) -> bool {
        let resolved = self.session.resolve(url);
        let attempts = self.options.retries.max(1);
        for attempt in 1..=attempts {
            let mode = if attempt < attempts { "Retry" } else { "Skip image" };
            match self.fetcher.fetch(self.session, FetchRequest::get(&resolved)) {
                Ok(response) if response.status.is_success() => {
                    match fs::write(path, &response.body) {
                        Ok(()) => return true,
                        Err(e) => info!(url = %resolved, attempt, error = %e, "Error downloading. {}", mode),
                    }
                }
                Ok(response) => {
                    warn!(url = %resolved, status = response.status.as_u16(), "Skip image");
                    return false;
                }
                Err(e) => info!(url = %resolved, attempt, error = %e, "Error downloading. {}", mode),
            }
        }
        warn!(url = %resolved, attempts, "giving up");
        false
    }

    /// Replace `path` with its processed version when the post-processor succeeds.
    fn post_process(&self, path: &Path) {
        let Some(processor) = self.post_processor else {
            return;
        };
        let processed = processed_path(path);
        if processor.process(path, &processed) {
            if let Err(e) = fs::rename(&processed, path) {
                warn!(path = %path.display(), error = %e, "could not replace processed image");
                let _ = fs::remove_file(&processed);
            }
        } else {
            let _ = fs::remove_file(&processed);
        }
    }

    /// Zip-only providers: fetch each listed archive straight to its destination.
    fn download_prepackaged(&mut self, volumes: Vec<Volume>) -> Result<(), DownloadError> {
        let (reverse, skip) = (self.options.reverse, self.options.skip_volumes);
        let urls = if volumes.is_empty() {
            let zips = self
                .provider
                .prepackaged_zips(&self.content, None, &self.client)?;
            order_volumes(zips, reverse, skip)
        } else {
            let mut urls = Vec::new();
            for volume in order_volumes(volumes, reverse, skip) {
                urls.extend(
                    self.provider
                        .prepackaged_zips(&self.content, Some(&volume), &self.client)?,
                );
            }
            urls
        };

        for (i, url) in urls.iter().enumerate() {
            let archive_name = zip_archive_stem(url);
            if archive_name.is_empty() {
                return Err(DownloadError::EmptyArchiveName { index: i + 1 });
            }
            let destination = self.archive_destination(&archive_name);
            if self.should_skip(&destination, &archive_name) {
                self.report.volumes_skipped += 1;
                continue;
            }
            info!("Downloading archive: {}", archive_name);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|e| DownloadError::CreateDestination {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            let partial = partial_path(&destination);
            self.cleanup.track_partial(Some(&partial));
            let stored =
                self.download_file(url, &partial) && fs::rename(&partial, &destination).is_ok();
            self.cleanup.track_partial(None);
            if stored {
                self.report.archives_written += 1;
            } else {
                let _ = fs::remove_file(&partial);
                self.report.archives_failed += 1;
            }
        }
        Ok(())
    }

    fn progress_bar(&self, len: usize, archive_name: &str) -> Option<indicatif::ProgressBar> {
        if !self.options.show_progress || len == 0 {
            return None;
        }
        let bar = indicatif::ProgressBar::new(len as u64);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
        {
            bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
        }
        bar.set_message(archive_name.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    }
}

/// Sibling path for a processed image: `001_a.jpg` becomes `001_a_.jpg`.
fn processed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let processed = match name.rfind('.') {
        Some(i) => format!("{}_{}", &name[..i], &name[i..]),
        None => format!("{}_", name),
    };
    path.with_file_name(processed)
}
