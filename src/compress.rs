//! In-memory compression codec: DEFLATE (zlib container) and LZMA (xz
//! container), selected per archive.
//!
//! Decompression is bounded by the size declared in the entry metadata and
//! fails on any deviation, so a tampered length can never inflate past the
//! declared budget or silently truncate.

use crate::archive::format::CompressionAlgo;
use crate::error::{Result, SlmError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Default level for newly created archives
pub const DEFAULT_LEVEL: u8 = 1;

/// Highest supported compression level
pub const MAX_LEVEL: u8 = 9;

/// Compress a buffer at the given level (0 = store, 9 = maximum)
pub fn compress(data: &[u8], algo: CompressionAlgo, level: u8) -> Result<Vec<u8>> {
    if level > MAX_LEVEL {
        return Err(SlmError::Compress(format!(
            "compression level {level} out of range"
        )));
    }

    match algo {
        CompressionAlgo::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(u32::from(level)));
            encoder
                .write_all(data)
                .map_err(|e| SlmError::Compress(e.to_string()))?;
            encoder.finish().map_err(|e| SlmError::Compress(e.to_string()))
        }
        CompressionAlgo::Lzma => {
            let mut encoder = XzEncoder::new(Vec::new(), u32::from(level));
            encoder
                .write_all(data)
                .map_err(|e| SlmError::Compress(e.to_string()))?;
            encoder.finish().map_err(|e| SlmError::Compress(e.to_string()))
        }
    }
}

/// Decompress a buffer that must expand to exactly `declared_size` bytes
pub fn decompress(data: &[u8], algo: CompressionAlgo, declared_size: u64) -> Result<Vec<u8>> {
    match algo {
        CompressionAlgo::Deflate => read_exactly(ZlibDecoder::new(data), declared_size),
        CompressionAlgo::Lzma => read_exactly(XzDecoder::new(data), declared_size),
    }
}

/// Drain a decoder into a buffer of the declared size, then probe for
/// trailing output. Short streams and oversized streams are both errors.
fn read_exactly<R: Read>(mut decoder: R, declared_size: u64) -> Result<Vec<u8>> {
    let capacity = usize::try_from(declared_size)
        .map_err(|_| SlmError::Decompress("declared size exceeds address space".to_string()))?;

    let mut out = vec![0u8; capacity];
    let mut filled = 0usize;
    while filled < capacity {
        match decoder.read(&mut out[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return Err(SlmError::Decompress(e.to_string())),
        }
    }

    if filled < capacity {
        return Err(SlmError::DecompressShort {
            declared: declared_size,
            actual: filled as u64,
        });
    }

    let mut probe = [0u8; 1];
    loop {
        match decoder.read(&mut probe) {
            Ok(0) => break,
            Ok(_) => return Err(SlmError::DecompressOverflow(declared_size)),
            Err(e) => return Err(SlmError::Decompress(e.to_string())),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"the quick brown fox jumps over the lazy dog, repeatedly, \
        the quick brown fox jumps over the lazy dog";

    #[test]
    fn test_deflate_roundtrip() {
        for level in [0, 1, 6, 9] {
            let packed = compress(SAMPLE, CompressionAlgo::Deflate, level).unwrap();
            let restored =
                decompress(&packed, CompressionAlgo::Deflate, SAMPLE.len() as u64).unwrap();
            assert_eq!(restored, SAMPLE);
        }
    }

    #[test]
    fn test_lzma_roundtrip() {
        for level in [0, 1, 9] {
            let packed = compress(SAMPLE, CompressionAlgo::Lzma, level).unwrap();
            let restored =
                decompress(&packed, CompressionAlgo::Lzma, SAMPLE.len() as u64).unwrap();
            assert_eq!(restored, SAMPLE);
        }
    }

    #[test]
    fn test_level_out_of_range() {
        assert!(compress(SAMPLE, CompressionAlgo::Deflate, 10).is_err());
    }

    #[test]
    fn test_declared_size_too_large_is_short() {
        let packed = compress(SAMPLE, CompressionAlgo::Deflate, 6).unwrap();
        let result = decompress(&packed, CompressionAlgo::Deflate, SAMPLE.len() as u64 + 5);
        assert!(matches!(result, Err(SlmError::DecompressShort { .. })));
    }

    #[test]
    fn test_declared_size_too_small_is_overflow() {
        let packed = compress(SAMPLE, CompressionAlgo::Lzma, 6).unwrap();
        let result = decompress(&packed, CompressionAlgo::Lzma, SAMPLE.len() as u64 - 1);
        assert!(matches!(result, Err(SlmError::DecompressOverflow(_))));
    }

    #[test]
    fn test_garbage_input_fails() {
        let garbage = vec![0x5Au8; 64];
        assert!(decompress(&garbage, CompressionAlgo::Deflate, 64).is_err());
        assert!(decompress(&garbage, CompressionAlgo::Lzma, 64).is_err());
    }

    #[test]
    fn test_wrong_algorithm_fails() {
        let packed = compress(SAMPLE, CompressionAlgo::Deflate, 6).unwrap();
        assert!(decompress(&packed, CompressionAlgo::Lzma, SAMPLE.len() as u64).is_err());
    }
}
