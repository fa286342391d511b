use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for slm operations
pub type Result<T> = std::result::Result<T, SlmError>;

/// Unified error type for all slm operations
#[derive(Debug, Error)]
pub enum SlmError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Container errors
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("header authentication failed (wrong password or corrupted archive)")]
    HeaderAuth,

    #[error("entry authentication failed (corrupted or tampered archive)")]
    EntryAuth,

    #[error("invalid entry metadata: {0}")]
    InvalidMetadata(String),

    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    // Codec errors
    #[error("compression failed: {0}")]
    Compress(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("decompressed data exceeds the declared size of {0} bytes")]
    DecompressOverflow(u64),

    #[error("decompressed data shorter than declared: {actual} of {declared} bytes")]
    DecompressShort { declared: u64, actual: u64 },

    // Crypto errors
    #[error("cryptographic backend unavailable")]
    CryptoUnavailable,

    // Limits
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}
