//! Scratch space for volumes in progress.
//!
//! One randomly named root per run (created on first use, removed on drop or by the
//! interrupt hook) with one subdirectory per volume, removed as soon as the volume is done.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const ROOT_PREFIX: &str = "manga-dl_";

/// Removes the scratch root, and any partial download in flight, from outside the run
/// (e.g. from a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CleanupHandle {
    root: Arc<Mutex<Option<PathBuf>>>,
    partial: Arc<Mutex<Option<PathBuf>>>,
}

impl CleanupHandle {
    /// Remove the scratch root and the in-flight partial file. Safe to call more than once.
    pub fn cleanup(&self) {
        if let Some(path) = take(&self.partial) {
            let _ = fs::remove_file(path);
        }
        if let Some(path) = take(&self.root) {
            let _ = fs::remove_dir_all(path);
        }
    }

    fn set_root(&self, path: Option<PathBuf>) {
        put(&self.root, path);
    }

    /// Record the `.part` file currently being written outside the scratch root.
    pub(crate) fn track_partial(&self, path: Option<&Path>) {
        put(&self.partial, path.map(Path::to_path_buf));
    }
}

fn take(slot: &Mutex<Option<PathBuf>>) -> Option<PathBuf> {
    slot.lock().ok().and_then(|mut p| p.take())
}

fn put(slot: &Mutex<Option<PathBuf>>, value: Option<PathBuf>) {
    if let Ok(mut p) = slot.lock() {
        *p = value;
    }
}

#[derive(Debug)]
pub struct WorkspaceManager {
    base: Option<PathBuf>,
    root: Option<TempDir>,
    cleanup: CleanupHandle,
}

impl WorkspaceManager {
    /// Scratch root under the system temp directory.
    pub fn new() -> Self {
        Self {
            base: None,
            root: None,
            cleanup: CleanupHandle::default(),
        }
    }

    /// Scratch root under `base` instead of the system temp directory.
    pub fn in_dir(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
            root: None,
            cleanup: CleanupHandle::default(),
        }
    }

    pub fn cleanup_handle(&self) -> CleanupHandle {
        self.cleanup.clone()
    }

    /// Scratch root, created on first call.
    pub fn root(&mut self) -> io::Result<&Path> {
        if self.root.is_none() {
            let mut builder = tempfile::Builder::new();
            builder.prefix(ROOT_PREFIX);
            let dir = match &self.base {
                Some(base) => builder.tempdir_in(base)?,
                None => builder.tempdir()?,
            };
            self.cleanup.set_root(Some(dir.path().to_path_buf()));
            self.root = Some(dir);
        }
        match &self.root {
            Some(dir) => Ok(dir.path()),
            None => Err(io::Error::new(io::ErrorKind::Other, "scratch root unavailable")),
        }
    }

    /// Fresh, empty directory for one volume. Removed when the returned value is dropped.
    pub fn volume(&mut self, index: usize) -> io::Result<VolumeWorkspace> {
        let path = self.root()?.join(format!("volume-{:04}", index));
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(VolumeWorkspace { path })
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkspaceManager {
    fn drop(&mut self) {
        self.cleanup.set_root(None);
        self.cleanup.track_partial(None);
    }
}

#[derive(Debug)]
pub struct VolumeWorkspace {
    path: PathBuf,
}

impl VolumeWorkspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

}

impl Drop for VolumeWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
