//! Error types for USTAR archive operations.
//!
//! Every variant names the archive or file that failed and, where the failure
//! came from the operating system, carries the underlying [`io::Error`].

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Which identity lookup failed while building a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Owner,
    Group,
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKind::Owner => f.write_str("owner"),
            IdentityKind::Group => f.write_str("group"),
        }
    }
}

/// Errors produced by the header codec, the archive reader/writer and the
/// orchestrated operations.
#[derive(Debug, Error)]
pub enum TarError {
    #[error("archive {} cannot be opened", .path.display())]
    ArchiveNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open source file {}", .path.display())]
    SourceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {}", .path.display())]
    MetadataUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to look up {kind} name of {} (id {id})", .path.display())]
    IdentityUnresolved {
        path: PathBuf,
        kind: IdentityKind,
        id: u32,
    },

    #[error("failed to build header for {}", .path.display())]
    HeaderEncodeFailed {
        path: PathBuf,
        #[source]
        source: Box<TarError>,
    },

    #[error("short read from {}", .path.display())]
    ShortRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("short write to {}", .path.display())]
    ShortWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("seek failed in {}", .path.display())]
    SeekFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not present in archive: {}", display_paths(.missing))]
    NotInArchive { missing: Vec<PathBuf> },

    #[error("malformed archive {}: {reason}", .path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    /// `path` is empty until the reader attaches its archive name.
    #[error("invalid header field `{field}` in {}: {value:?}", archive_label(.path))]
    InvalidHeader {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error(
        "header checksum mismatch in {} for entry {name:?} (stored {stored:o}, computed {computed:o})",
        .path.display()
    )]
    ChecksumMismatch {
        path: PathBuf,
        name: String,
        stored: u32,
        computed: u32,
    },

    #[error("name {} exceeds {limit} bytes", .path.display())]
    NameTooLong { path: PathBuf, limit: usize },

    #[error("value {value} does not fit the `{field}` header field")]
    FieldOverflow { field: &'static str, value: u64 },

    #[error("{} is not a regular file", .path.display())]
    NotRegularFile { path: PathBuf },

    #[error("refusing to extract unsafe entry path {}", .path.display())]
    UnsafeEntryPath { path: PathBuf },

    #[error("failed to open destination file {}", .path.display())]
    DestinationOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove trailing padding from {}", .path.display())]
    TruncateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type TarResult<T> = Result<T, TarError>;

impl TarError {
    /// Names `archive` in header decoding errors raised while reading it.
    pub fn in_archive(self, archive: &Path) -> Self {
        match self {
            TarError::InvalidHeader { field, value, .. } => TarError::InvalidHeader {
                path: archive.to_path_buf(),
                field,
                value,
            },
            other => other,
        }
    }
}

fn archive_label(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        "header".to_string()
    } else {
        path.display().to_string()
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
