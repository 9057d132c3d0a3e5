//! ustar-core - USTAR archive codec and archive operations
//!
//! Archives are a sequence of 512-byte headers, each followed by the file's
//! data padded to a block boundary, and end with two zero blocks. The
//! [`orchestrator`] functions are the entry points; the [`formats::ustar`]
//! modules expose the header codec, the stream reader and the stream writer
//! for callers that work on in-memory or otherwise custom streams.

pub mod core;
pub mod error;
pub mod formats;
pub mod orchestrator;

// Re-exports
pub use crate::core::file_list::FileList;
pub use crate::core::identity::{FixedIdentity, IdentityResolver, SystemIdentity};
pub use error::{IdentityKind, TarError, TarResult};
pub use formats::ustar::header::{HeaderBlock, HeaderFields};
pub use formats::ustar::reader::{Entry, UstarReader};
pub use formats::ustar::writer::{UstarWriter, WriteMode};
pub use orchestrator::{
    append_to_archive, create_archive, extract_archive, list_archive, update_archive,
    ArchiveSettings, ProgressFn,
};
