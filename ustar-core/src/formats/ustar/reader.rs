use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};

use crate::core::file_list::FileList;
use crate::error::{TarError, TarResult};
use crate::formats::ustar::constants::{BLOCK_SIZE, FOOTER_SIZE, REGTYPE};
use crate::formats::ustar::header::HeaderBlock;
use crate::formats::ustar::padding::{blocks_for, padded_size, padding_for};
use crate::orchestrator::ProgressFn;

const BLOCK: u64 = BLOCK_SIZE as u64;

/// One header met during a walk, with where its data lives in the stream.
#[derive(Debug, Clone)]
pub struct Entry {
    pub header: HeaderBlock,
    pub name: PathBuf,
    /// Declared content size; the data region is this rounded up to a block.
    pub size: u64,
    pub header_offset: u64,
    pub data_offset: u64,
}

impl Entry {
    pub fn padding(&self) -> u64 {
        padding_for(self.size)
    }

    /// Regular files are typed `'0'`, or NUL in pre-POSIX archives.
    pub fn is_regular_file(&self) -> bool {
        matches!(self.header.entry_type(), REGTYPE | 0)
    }
}

/// Walks an archive header by header, trusting only declared sizes.
pub struct UstarReader<R: Read + Seek> {
    reader: R,
    label: PathBuf,
    verify_checksums: bool,
}

impl<R: Read + Seek> UstarReader<R> {
    pub fn new(reader: R, label: impl Into<PathBuf>) -> Self {
        UstarReader {
            reader,
            label: label.into(),
            verify_checksums: false,
        }
    }

    /// Reject headers whose stored checksum does not match their contents.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Calls `on_entry` for every entry, in archive order, with the stream
    /// positioned at the start of that entry's data. Whatever the callback
    /// consumes, the walk resumes at the next header.
    ///
    /// The end of the archive is the position of the footer
    /// (`stream_length - 1024`); footer contents are never inspected.
    pub fn walk<F>(&mut self, mut on_entry: F) -> TarResult<usize>
    where
        F: FnMut(&Entry, &mut R) -> TarResult<()>,
    {
        let len = self
            .reader
            .seek(SeekFrom::End(0))
            .map_err(|source| self.seek_failed(source))?;
        if len < FOOTER_SIZE as u64 {
            return Err(self.malformed(format!(
                "{len} bytes is shorter than the end-of-archive footer"
            )));
        }
        if len % BLOCK != 0 {
            return Err(self.malformed(format!("length {len} is not a multiple of {BLOCK}")));
        }
        let footer_offset = len - FOOTER_SIZE as u64;

        let mut offset = 0u64;
        let mut count = 0usize;
        let mut block = [0u8; BLOCK_SIZE];
        while offset < footer_offset {
            self.reader
                .seek(SeekFrom::Start(offset))
                .map_err(|source| self.seek_failed(source))?;
            self.reader
                .read_exact(&mut block)
                .map_err(|source| TarError::ShortRead {
                    path: self.label.clone(),
                    source,
                })?;

            let header = HeaderBlock::decode(&block);
            if self.verify_checksums && !header.validate() {
                return Err(TarError::ChecksumMismatch {
                    path: self.label.clone(),
                    name: String::from_utf8_lossy(header.name_bytes()).into_owned(),
                    stored: header.stored_checksum().unwrap_or(0),
                    computed: header.computed_checksum(),
                });
            }

            let size = header.size().map_err(|e| e.in_archive(&self.label))?;
            let data_offset = offset + BLOCK;
            let next = data_offset
                .checked_add(padded_size(size))
                .filter(|&next| next <= footer_offset)
                .ok_or_else(|| {
                    self.malformed(format!(
                        "entry at offset {offset} declares {size} bytes, running past the footer at {footer_offset}"
                    ))
                })?;

            let entry = Entry {
                name: header.path(),
                header,
                size,
                header_offset: offset,
                data_offset,
            };
            on_entry(&entry, &mut self.reader)?;

            count += 1;
            offset = next;
        }

        Ok(count)
    }

    /// Names of all entries in archive order, duplicates included.
    pub fn list(&mut self) -> TarResult<FileList> {
        let mut names = FileList::new();
        self.walk(|entry, _| {
            names.push(entry.name.clone());
            Ok(())
        })?;
        Ok(names)
    }

    /// Restores every regular-file entry at its header name, or beneath
    /// `dest` when one is given (see [`resolve_destination`]). A name that
    /// occurs more than once ends up holding the content of its last
    /// occurrence.
    pub fn extract_to(
        &mut self,
        dest: Option<&Path>,
        progress: Option<&ProgressFn>,
    ) -> TarResult<usize> {
        let label = self.label.clone();
        let mut extracted = 0usize;

        self.walk(|entry, reader| {
            if !entry.is_regular_file() {
                warn!(
                    "skipping {} (unsupported entry type {:?})",
                    entry.name.display(),
                    entry.header.entry_type() as char
                );
                return Ok(());
            }

            let target = match dest {
                Some(dest) => resolve_destination(dest, &entry.name)?,
                None => entry.name.clone(),
            };
            extract_entry(entry, reader, &label, &target)?;
            extracted += 1;

            if let Some(progress) = progress {
                progress(extracted, 0, &entry.name.to_string_lossy());
            }
            Ok(())
        })?;

        info!("extracted {} file(s) from {}", extracted, label.display());
        Ok(extracted)
    }

    fn seek_failed(&self, source: io::Error) -> TarError {
        TarError::SeekFailed {
            path: self.label.clone(),
            source,
        }
    }

    fn malformed(&self, reason: String) -> TarError {
        TarError::MalformedArchive {
            path: self.label.clone(),
            reason,
        }
    }
}

/// Copies the entry's whole data region, padding included, into `target` and
/// then cuts the padding off by truncation.
fn extract_entry<R: Read>(entry: &Entry, reader: &mut R, label: &Path, target: &Path) -> TarResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| TarError::DestinationOpenFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut out = File::create(target).map_err(|source| TarError::DestinationOpenFailed {
        path: target.to_path_buf(),
        source,
    })?;

    let mut block = [0u8; BLOCK_SIZE];
    for _ in 0..blocks_for(entry.size) {
        reader
            .read_exact(&mut block)
            .map_err(|source| TarError::ShortRead {
                path: label.to_path_buf(),
                source,
            })?;
        out.write_all(&block)
            .map_err(|source| TarError::ShortWrite {
                path: target.to_path_buf(),
                source,
            })?;
    }
    drop(out);

    remove_trailing_bytes(target, entry.padding())?;
    debug!("extracted {} ({} bytes)", target.display(), entry.size);
    Ok(())
}

/// Shortens the file at `path` by `nbytes`.
pub fn remove_trailing_bytes(path: &Path, nbytes: u64) -> TarResult<()> {
    let truncate_failed = |source: io::Error| TarError::TruncateFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(truncate_failed)?;
    let len = file.metadata().map_err(truncate_failed)?.len();
    let new_len = len.checked_sub(nbytes).ok_or_else(|| {
        truncate_failed(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot remove {nbytes} bytes from a {len}-byte file"),
        ))
    })?;
    file.set_len(new_len).map_err(truncate_failed)
}

/// Maps an entry name to a path beneath `dest` for `-C` extraction. Leading
/// `/` is dropped and names that climb out with `..` are refused.
pub fn resolve_destination(dest: &Path, name: &Path) -> TarResult<PathBuf> {
    let mut target = dest.to_path_buf();
    let mut pushed = false;
    for component in name.components() {
        match component {
            Component::Normal(part) => {
                target.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(TarError::UnsafeEntryPath {
                    path: name.to_path_buf(),
                })
            }
        }
    }
    if !pushed {
        return Err(TarError::UnsafeEntryPath {
            path: name.to_path_buf(),
        });
    }
    Ok(target)
}
