//! On-disk constants of the USTAR format.

/// Every header and data region is a whole number of these.
pub const BLOCK_SIZE: usize = 512;
/// Two zero blocks mark the end of an archive.
pub const FOOTER_SIZE: usize = 2 * BLOCK_SIZE;

pub const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

pub const MAGIC: &[u8; 6] = b"ustar\0";
pub const VERSION: &[u8; 2] = b"00";

/// Type flag of a regular file, the only kind of entry this crate writes.
pub const REGTYPE: u8 = b'0';

// Field (offset, length) pairs
pub const NAME: (usize, usize) = (0, 100);
pub const MODE: (usize, usize) = (100, 8);
pub const UID: (usize, usize) = (108, 8);
pub const GID: (usize, usize) = (116, 8);
pub const SIZE: (usize, usize) = (124, 12);
pub const MTIME: (usize, usize) = (136, 12);
pub const CHKSUM: (usize, usize) = (148, 8);
pub const TYPEFLAG: usize = 156;
pub const MAGIC_FIELD: (usize, usize) = (257, 6);
pub const VERSION_FIELD: (usize, usize) = (263, 2);
pub const UNAME: (usize, usize) = (265, 32);
pub const GNAME: (usize, usize) = (297, 32);
pub const DEVMAJOR: (usize, usize) = (329, 8);
pub const DEVMINOR: (usize, usize) = (337, 8);
