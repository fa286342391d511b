//! slm-rs: password-authenticated encrypted archive library
//!
//! Packs files into a single `.slm` container that provides
//! confidentiality, integrity, and tamper evidence under a password-derived
//! key, with compression subordinate to that goal:
//! - PBKDF2-HMAC-SHA256 derives two domain-separated AES-256 keys per
//!   archive (file contents vs. metadata)
//! - every payload and metadata record is sealed with AES-256-GCM
//! - the header is bound to the password by an HMAC-SHA256, so a wrong
//!   password and a tampered header are indistinguishable
//! - DEFLATE (zlib) or LZMA (xz) compression, levels 0-9
//!
//! # Example
//!
//! ```no_run
//! use slm_rs::{ArchivePacker, ArchiveReader, PackEntry, PackOptions};
//!
//! let entries = vec![PackEntry {
//!     name: "hello.txt".to_string(),
//!     mode: 0o644,
//!     data: b"hi\n".to_vec(),
//! }];
//!
//! let packer = ArchivePacker::new(PackOptions::default())?;
//! packer.pack("example.slm".as_ref(), b"Correct_Horse1!", &entries)?;
//!
//! let reader = ArchiveReader::open("example.slm".as_ref(), b"Correct_Horse1!")?;
//! reader.unpack(Some("out".as_ref()), false)?;
//! # Ok::<(), slm_rs::SlmError>(())
//! ```

// Core modules
pub mod archive;
pub mod compress;
pub mod crypto;
pub mod enumerate;
pub mod error;
pub mod ops;
pub mod policy;

// Re-export commonly used types
pub use archive::{
    ArchivePacker, ArchiveReader, CompressionAlgo, ListEntry, ListOutcome, PackEntry,
    PackOptions, CURRENT_VERSION, MAX_COMMENT_LEN, MAX_FILENAME, MAX_FILES, MAX_FILE_SIZE,
    MAX_OUTDIR_LEN,
};
pub use error::{Result, SlmError};
