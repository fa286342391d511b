//! Exit-code-level operations.
//!
//! Thin wrappers over the archive types that print their diagnostics and
//! map every failure to exit code 1, keeping the library API error-typed.

use crate::archive::format::mode_string;
use crate::archive::{ArchivePacker, ArchiveReader, PackEntry, PackOptions};
use crate::error::Result;
use crate::policy;
use std::path::Path;
use tracing::{error, info};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Pack `entries` into a new archive
pub fn pack(
    archive: &Path,
    password: &str,
    entries: &[PackEntry],
    opts: PackOptions,
    allow_weak: bool,
) -> i32 {
    if !policy::accept_password(password, allow_weak) {
        error!("password rejected by the strength policy (rerun with --allow-weak to override)");
        return EXIT_FAILURE;
    }

    let result: Result<()> =
        ArchivePacker::new(opts).and_then(|packer| packer.pack(archive, password.as_bytes(), entries));
    exit_code(result)
}

/// Extract an archive into `target_dir` (or its stored default)
pub fn unpack(archive: &Path, password: &str, target_dir: Option<&Path>, overwrite: bool) -> i32 {
    let result = ArchiveReader::open(archive, password.as_bytes())
        .and_then(|reader| reader.unpack(target_dir, overwrite))
        .map(|count| info!("extracted {count} files"));
    exit_code(result)
}

/// Print a table of the archive's entries without extracting
pub fn list(archive: &Path, password: &str) -> i32 {
    let outcome = ArchiveReader::open(archive, password.as_bytes()).and_then(|reader| {
        let header = reader.header().clone();
        reader.list().map(|outcome| (header, outcome))
    });

    match outcome {
        Ok((header, outcome)) => {
            println!(
                "{} v{} ({}, level {}): {} entries",
                archive.display(),
                header.version,
                header.algo.name(),
                header.level,
                header.file_count
            );
            for entry in &outcome.entries {
                println!(
                    "{} {:>12}  {}",
                    mode_string(entry.mode),
                    entry.original_size,
                    entry.filename
                );
            }
            if outcome.failed_entries > 0 {
                error!("{} entries failed verification", outcome.failed_entries);
                EXIT_FAILURE
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            error!("{e}");
            EXIT_FAILURE
        }
    }
}

/// Print the archive comment, if any
pub fn view_comment(archive: &Path, password: &str) -> i32 {
    let result = ArchiveReader::open(archive, password.as_bytes()).and_then(|r| r.comment());
    match result {
        Ok(Some(comment)) => {
            println!("{comment}");
            EXIT_OK
        }
        Ok(None) => {
            println!("(no comment)");
            EXIT_OK
        }
        Err(e) => {
            error!("{e}");
            EXIT_FAILURE
        }
    }
}

fn exit_code<T>(result: Result<T>) -> i32 {
    match result {
        Ok(_) => EXIT_OK,
        Err(e) => {
            error!("{e}");
            EXIT_FAILURE
        }
    }
}
