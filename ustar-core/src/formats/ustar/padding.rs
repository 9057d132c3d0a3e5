//! Block rounding shared by the writer (how many zero bytes to emit after a
//! file) and the reader (how many bytes to skip, or to trim after extraction).

use crate::formats::ustar::constants::BLOCK_SIZE;

const BLOCK: u64 = BLOCK_SIZE as u64;

/// Number of 512-byte blocks needed to hold `size` bytes.
pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(BLOCK)
}

/// Length of the data region of an entry declaring `size` bytes.
pub fn padded_size(size: u64) -> u64 {
    blocks_for(size) * BLOCK
}

/// Zero bytes appended after `size` bytes of content.
pub fn padding_for(size: u64) -> u64 {
    padded_size(size) - size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_for() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(511), 1);
        assert_eq!(blocks_for(512), 1);
        assert_eq!(blocks_for(513), 2);
        assert_eq!(blocks_for(10 * 512), 10);
    }

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(10), 502);
        assert_eq!(padding_for(512), 0);
        assert_eq!(padding_for(513), 511);
    }

    #[test]
    fn padded_sizes_are_block_aligned() {
        for size in [0u64, 1, 100, 511, 512, 513, 4096, 100_000] {
            assert_eq!((size + padding_for(size)) % BLOCK, 0);
            assert_eq!(padded_size(size), size + padding_for(size));
        }
    }
}
