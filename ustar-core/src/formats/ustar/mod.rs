//! The USTAR archive format, restricted to regular-file entries.

pub mod constants;
pub mod header;
pub mod padding;
pub mod reader;
pub mod writer;

pub use constants::{BLOCK_SIZE, FOOTER_SIZE};
pub use padding::{blocks_for, padded_size, padding_for};
