use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::core::identity::IdentityResolver;
use crate::error::{TarError, TarResult};
use crate::formats::ustar::constants::{BLOCK_SIZE, FOOTER_SIZE, ZERO_BLOCK};
use crate::formats::ustar::header::HeaderBlock;
use crate::orchestrator::ArchiveSettings;

/// How the archive stream is prepared before the first new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Start a fresh archive, discarding any previous content.
    Truncate,
    /// Overwrite the existing footer so new entries follow the last old one.
    OverwriteFooter,
}

/// Writes header + data entries followed by the end-of-archive footer.
pub struct UstarWriter<W: Write + Seek> {
    writer: W,
    // Archive name used in error reports
    label: PathBuf,
    entries: usize,
}

impl<W: Write + Seek> UstarWriter<W> {
    /// Writes a new archive starting at the current position of `writer`.
    pub fn new(writer: W, label: impl Into<PathBuf>) -> Self {
        UstarWriter {
            writer,
            label: label.into(),
            entries: 0,
        }
    }

    /// Positions `writer` on the footer of an existing archive so the next
    /// entry replaces it.
    pub fn resume(mut writer: W, label: impl Into<PathBuf>) -> TarResult<Self> {
        let label = label.into();
        let len = writer
            .seek(SeekFrom::End(0))
            .map_err(|source| TarError::SeekFailed {
                path: label.clone(),
                source,
            })?;
        if len < FOOTER_SIZE as u64 {
            return Err(TarError::MalformedArchive {
                path: label,
                reason: format!("{len} bytes is shorter than the end-of-archive footer"),
            });
        }
        writer
            .seek(SeekFrom::End(-(FOOTER_SIZE as i64)))
            .map_err(|source| TarError::SeekFailed {
                path: label.clone(),
                source,
            })?;

        Ok(UstarWriter {
            writer,
            label,
            entries: 0,
        })
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Archives the regular file at `path` under its own name.
    pub fn append_file(&mut self, path: &Path, resolver: &dyn IdentityResolver) -> TarResult<()> {
        let header =
            HeaderBlock::encode(path, resolver).map_err(|e| TarError::HeaderEncodeFailed {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
        let mut source = File::open(path).map_err(|source| TarError::SourceOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.append_entry(&header, &mut source, path)
    }

    /// Writes `header` and then exactly `header.size()` bytes taken from
    /// `data`, zero-padded to the block boundary. `source` names `data` in
    /// error reports.
    pub fn append_entry<R: Read>(
        &mut self,
        header: &HeaderBlock,
        data: &mut R,
        source: &Path,
    ) -> TarResult<()> {
        let size = header.size()?;
        self.write_block(header.as_bytes())?;

        let mut block = [0u8; BLOCK_SIZE];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(BLOCK_SIZE as u64) as usize;
            block.fill(0);
            data.read_exact(&mut block[..want])
                .map_err(|e| TarError::ShortRead {
                    path: source.to_path_buf(),
                    source: e,
                })?;
            self.write_block(&block)?;
            remaining -= want as u64;
        }

        self.entries += 1;
        debug!("archived {} ({} bytes)", source.display(), size);
        Ok(())
    }

    /// Writes the footer, flushes and hands back the underlying stream.
    pub fn finish(mut self) -> TarResult<W> {
        self.write_block(&ZERO_BLOCK)?;
        self.write_block(&ZERO_BLOCK)?;
        self.writer.flush().map_err(|source| TarError::ShortWrite {
            path: self.label.clone(),
            source,
        })?;
        Ok(self.writer)
    }

    fn write_block(&mut self, block: &[u8; BLOCK_SIZE]) -> TarResult<()> {
        self.writer
            .write_all(block)
            .map_err(|source| TarError::ShortWrite {
                path: self.label.clone(),
                source,
            })
    }
}

/// Adds every path in `paths`, in order, to the archive at `archive` and
/// terminates it with a fresh footer. Any failure aborts the whole call and
/// may leave a partially written archive behind.
pub fn write_entries(
    archive: &Path,
    paths: &[PathBuf],
    mode: WriteMode,
    settings: &ArchiveSettings,
) -> TarResult<usize> {
    let file = match mode {
        WriteMode::Truncate => File::create(archive),
        WriteMode::OverwriteFooter => OpenOptions::new().read(true).write(true).open(archive),
    }
    .map_err(|source| TarError::ArchiveNotFound {
        path: archive.to_path_buf(),
        source,
    })?;

    let stream = BufWriter::new(file);
    let mut writer = match mode {
        WriteMode::Truncate => UstarWriter::new(stream, archive),
        WriteMode::OverwriteFooter => UstarWriter::resume(stream, archive)?,
    };

    let total = paths.len();
    for (i, path) in paths.iter().enumerate() {
        writer.append_file(path, settings.identity.as_ref())?;
        if let Some(progress) = &settings.progress {
            progress(i + 1, total, &path.to_string_lossy());
        }
    }

    let written = writer.entries();
    writer.finish()?;

    info!(
        "wrote {} entr{} to {} ({:?})",
        written,
        if written == 1 { "y" } else { "ies" },
        archive.display(),
        mode
    );
    Ok(written)
}
