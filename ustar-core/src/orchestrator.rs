//! The archive operations exposed to callers: create, append, update, list
//! and extract, each working on an archive path.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::core::file_list::FileList;
use crate::core::identity::{IdentityResolver, SystemIdentity};
use crate::error::{TarError, TarResult};
use crate::formats::ustar::reader::UstarReader;
use crate::formats::ustar::writer::{write_entries, WriteMode};

/// Progress callback: `(current, total, name)`. `total` is 0 when the number
/// of entries is not known in advance (extraction).
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Settings shared by all archive operations.
#[derive(Clone)]
pub struct ArchiveSettings {
    /// Check every header checksum while reading.
    pub verify_checksums: bool,
    /// Resolves owner and group names when writing headers.
    pub identity: Arc<dyn IdentityResolver + Send + Sync>,
    /// Extract beneath this directory instead of at the stored names.
    pub destination: Option<PathBuf>,
    pub progress: Option<ProgressFn>,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            verify_checksums: false,
            identity: Arc::new(SystemIdentity),
            destination: None,
            progress: None,
        }
    }
}

impl fmt::Debug for ArchiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveSettings")
            .field("verify_checksums", &self.verify_checksums)
            .field("destination", &self.destination)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

/// Writes a new archive holding `files`, replacing anything at `archive`.
/// An empty list produces a footer-only archive.
pub fn create_archive(archive: &Path, files: &FileList, settings: &ArchiveSettings) -> TarResult<usize> {
    info!("creating {} with {} file(s)", archive.display(), files.len());
    write_entries(archive, files.as_slice(), WriteMode::Truncate, settings)
}

/// Adds `files` to the end of an existing archive.
pub fn append_to_archive(
    archive: &Path,
    files: &FileList,
    settings: &ArchiveSettings,
) -> TarResult<usize> {
    ensure_exists(archive)?;
    info!("appending {} file(s) to {}", files.len(), archive.display());
    write_entries(archive, files.as_slice(), WriteMode::OverwriteFooter, settings)
}

/// Appends fresh copies of `files`, all of which must already be in the
/// archive. Older copies stay in place and are shadowed by the new ones.
/// Nothing is written when a name is missing.
pub fn update_archive(archive: &Path, files: &FileList, settings: &ArchiveSettings) -> TarResult<usize> {
    let present = list_archive(archive, settings)?;
    if !files.is_subset_of(&present) {
        return Err(TarError::NotInArchive {
            missing: files.missing_from(&present),
        });
    }
    info!("updating {} file(s) in {}", files.len(), archive.display());
    write_entries(archive, files.as_slice(), WriteMode::OverwriteFooter, settings)
}

/// Entry names in archive order.
pub fn list_archive(archive: &Path, settings: &ArchiveSettings) -> TarResult<FileList> {
    let file = open_archive(archive)?;
    UstarReader::new(file, archive)
        .verify_checksums(settings.verify_checksums)
        .list()
}

/// Restores every entry of `archive` at its stored name, or beneath
/// `settings.destination` when set.
pub fn extract_archive(archive: &Path, settings: &ArchiveSettings) -> TarResult<usize> {
    let file = open_archive(archive)?;
    let dest = settings.destination.as_deref();
    if let Some(dest) = dest.filter(|d| !d.is_dir()) {
        info!("{} does not exist yet; it will be created", dest.display());
    }
    UstarReader::new(file, archive)
        .verify_checksums(settings.verify_checksums)
        .extract_to(dest, settings.progress.as_ref())
}

fn open_archive(archive: &Path) -> TarResult<File> {
    File::open(archive).map_err(|source| TarError::ArchiveNotFound {
        path: archive.to_path_buf(),
        source,
    })
}

fn ensure_exists(archive: &Path) -> TarResult<()> {
    open_archive(archive).map(drop)
}
