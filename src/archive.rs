//! Archive writer. Packs a volume workspace into a deflated zip with an `info.txt` manifest.

use crate::model::ArchiveManifest;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Manifest entry name inside every archive.
pub const MANIFEST_NAME: &str = "info.txt";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create archive file: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Zip every regular file in `workspace` (flat, sorted) plus the manifest into `destination`.
///
/// Parent directories are created on demand. The archive is written beside the destination
/// and renamed into place, so a failed write never leaves a file at `destination`.
/// Overwriting is the caller's decision.
pub fn write_archive(
    workspace: &Path,
    destination: &Path,
    manifest: &ArchiveManifest,
) -> Result<(), ArchiveError> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(workspace).map_err(|e| ArchiveError::Read {
        path: workspace.to_path_buf(),
        source: e,
    })? {
        let path = entry?.path();
        if path.is_file() {
            entries.push(path);
        }
    }
    entries.sort();

    let partial = partial_path(destination);
    let result = write_entries(&entries, &partial, manifest);
    if result.is_err() {
        let _ = fs::remove_file(&partial);
        return result;
    }
    fs::rename(&partial, destination).map_err(|e| ArchiveError::CreateFile {
        path: destination.to_path_buf(),
        source: e,
    })
}

fn write_entries(
    entries: &[PathBuf],
    path: &Path,
    manifest: &ArchiveManifest,
) -> Result<(), ArchiveError> {
    let file = File::create(path).map_err(|e| ArchiveError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in entries {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let data = fs::read(entry).map_err(|e| ArchiveError::Read {
            path: entry.clone(),
            source: e,
        })?;
        zip.start_file(name, options)?;
        zip.write_all(&data)?;
    }

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(manifest.render().as_bytes())?;
    zip.finish()?;
    Ok(())
}

/// `<destination>.part`, used while a file is being written.
pub(crate) fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
