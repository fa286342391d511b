use crate::archive::format::{
    sealed_field_parts, ArchiveHeader, FileEntryPlain, ENTRY_PLAIN_SIZE, MAX_FILENAME,
};
use crate::archive::format::is_path_traversal;
use crate::compress;
use crate::crypto::{self, KeySchedule, NONCE_SIZE, TAG_SIZE};
use crate::error::{Result, SlmError};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// One row of a listing: permission bits, plaintext size, stored name
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub filename: String,
    pub mode: u32,
    pub original_size: u64,
}

/// Result of walking an archive without extracting.
///
/// `failed_entries` counts metadata records that did not authenticate or
/// did not validate; the walk stops at the first record whose framing
/// cannot be trusted.
#[derive(Debug)]
pub struct ListOutcome {
    pub entries: Vec<ListEntry>,
    pub failed_entries: u32,
}

/// Archive consumer: verifies the container and either materializes files
/// or reports their metadata.
///
/// Opening performs the shared prelude: header parse, version and bounds
/// checks, key derivation, and the header HMAC check. A mismatch there is
/// indistinguishable from a wrong password, by construction.
pub struct ArchiveReader {
    file: File,
    header: ArchiveHeader,
    keys: KeySchedule,
}

impl ArchiveReader {
    /// Open an archive and authenticate its header against the password
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let mut file = File::open(path)?;
        let header = ArchiveHeader::read_from(&mut file)?;

        let keys = KeySchedule::derive(password, &header.salt);

        let expected =
            crypto::hmac_sha256(keys.file_key(), &[&header.authenticated_bytes()])?;
        if !crypto::constant_time_eq(&expected, &header.hmac) {
            return Err(SlmError::HeaderAuth);
        }

        Ok(Self { file, header, keys })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Decrypt the archive comment, if one was stored
    pub fn comment(&self) -> Result<Option<String>> {
        self.open_sealed(
            &self.header.comment,
            self.header.comment_len as usize,
            "comment",
        )
    }

    /// Decrypt and re-validate the stored output directory (v6+)
    pub fn stored_outdir(&self) -> Result<Option<String>> {
        if self.header.version < 6 {
            return Ok(None);
        }
        let decoded = self.open_sealed(
            &self.header.outdir,
            self.header.outdir_len as usize,
            "output directory",
        )?;
        if let Some(dir) = &decoded {
            // An attacker-chosen archive must not steer extraction anywhere
            // the filename rule would reject.
            if is_path_traversal(dir) {
                return Err(SlmError::PathTraversal(dir.clone()));
            }
        }
        Ok(decoded)
    }

    fn open_sealed(&self, region: &[u8], ct_len: usize, what: &str) -> Result<Option<String>> {
        if ct_len == 0 {
            return Ok(None);
        }
        let (ciphertext, nonce, tag) = sealed_field_parts(region, ct_len);
        let mut plain = Zeroizing::new(ciphertext);
        crypto::aead_decrypt(self.keys.meta_key(), &nonce, &mut plain, &tag, &[])?;
        let text = std::str::from_utf8(&plain)
            .map_err(|_| SlmError::InvalidMetadata(format!("{what} is not valid UTF-8")))?
            .to_string();
        Ok(Some(text))
    }

    /// Extract every entry, in stored order.
    ///
    /// The extraction directory is the caller's if given, else the archive's
    /// stored output directory (when present and usable), else the current
    /// directory. Files are written in place under their final names; a
    /// failure mid-archive can leave already-extracted files and, for the
    /// failing entry, nothing (payloads are authenticated and decompressed
    /// fully in memory before any byte reaches disk).
    ///
    /// Returns the number of files extracted.
    pub fn unpack(mut self, target_dir: Option<&Path>, overwrite: bool) -> Result<u32> {
        let extract_dir = self.extract_dir(target_dir)?;
        debug!(dir = %extract_dir.display(), "extracting");

        let mut extracted = 0u32;
        for _ in 0..self.header.file_count {
            let record = self.read_entry_record()?;
            let entry = FileEntryPlain::from_bytes(&record)?;
            entry.validate()?;

            // A leading slash must not let join() replace the base directory
            let target = extract_dir.join(entry.filename.trim_start_matches('/'));
            if target.exists() && !overwrite {
                return Err(SlmError::DestinationExists(target));
            }
            ensure_parent_dirs(&target)?;

            if entry.original_size == 0 {
                File::create(&target)?;
            } else {
                let data = self.read_payload(&entry)?;
                std::fs::write(&target, &data)?;
            }
            apply_mode(&target, entry.mode);

            debug!(file = %entry.filename, bytes = entry.original_size, "extracted");
            extracted += 1;
        }

        Ok(extracted)
    }

    /// Walk the archive without touching payloads, reporting each entry's
    /// metadata. Stops at the first record that fails authentication, since
    /// the payload length needed to skip forward is then untrusted.
    pub fn list(mut self) -> Result<ListOutcome> {
        let mut entries = Vec::with_capacity(self.header.file_count as usize);
        let mut failed_entries = 0u32;

        for _ in 0..self.header.file_count {
            let record = match self.read_entry_record() {
                Ok(record) => record,
                Err(SlmError::EntryAuth) => {
                    warn!("entry metadata failed authentication, stopping walk");
                    failed_entries += 1;
                    break;
                }
                Err(e) => return Err(e),
            };

            // The record authenticated, so the framing is trustworthy even
            // if the decoded fields turn out to be invalid.
            let compressed_size = u64::from_le_bytes(
                record[MAX_FILENAME..MAX_FILENAME + 8].try_into().unwrap(),
            );

            match FileEntryPlain::from_bytes(&record).and_then(|entry| {
                entry.validate()?;
                Ok(entry)
            }) {
                Ok(entry) => entries.push(ListEntry {
                    filename: entry.filename,
                    mode: entry.mode,
                    original_size: entry.original_size,
                }),
                Err(e) => {
                    warn!("skipping invalid entry: {e}");
                    failed_entries += 1;
                }
            }

            if compressed_size > 0 {
                let skip = (NONCE_SIZE + TAG_SIZE) as i64 + compressed_size as i64;
                self.file.seek(SeekFrom::Current(skip))?;
            }
        }

        Ok(ListOutcome {
            entries,
            failed_entries,
        })
    }

    fn extract_dir(&self, caller: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = caller {
            return Ok(dir.to_path_buf());
        }
        match self.stored_outdir()? {
            Some(stored) => {
                let dir = PathBuf::from(&stored);
                match dir.metadata() {
                    Ok(meta) if meta.is_dir() => Ok(dir),
                    _ => {
                        warn!(
                            dir = %stored,
                            "stored output directory unusable, extracting to current directory"
                        );
                        Ok(PathBuf::from("."))
                    }
                }
            }
            None => Ok(PathBuf::from(".")),
        }
    }

    /// Read and decrypt one fixed-size metadata record
    fn read_entry_record(&mut self) -> Result<Zeroizing<[u8; ENTRY_PLAIN_SIZE]>> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.file.read_exact(&mut nonce)?;
        let mut tag = [0u8; TAG_SIZE];
        self.file.read_exact(&mut tag)?;

        let mut record = Zeroizing::new([0u8; ENTRY_PLAIN_SIZE]);
        self.file.read_exact(&mut record[..])?;

        crypto::aead_decrypt(self.keys.meta_key(), &nonce, &mut record[..], &tag, &[])?;
        Ok(record)
    }

    /// Read, authenticate, and decompress one payload frame
    fn read_payload(&mut self, entry: &FileEntryPlain) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.file.read_exact(&mut nonce)?;
        let mut tag = [0u8; TAG_SIZE];
        self.file.read_exact(&mut tag)?;

        let compressed_len = usize::try_from(entry.compressed_size).map_err(|_| {
            SlmError::InvalidMetadata("compressed size exceeds address space".to_string())
        })?;
        let mut payload = vec![0u8; compressed_len];
        self.file.read_exact(&mut payload)?;

        crypto::aead_decrypt(self.keys.file_key(), &nonce, &mut payload, &tag, &[])?;

        let algo = self.header.algo;
        compress::decompress(&payload, algo, entry.original_size)
    }
}

/// Create the target's missing parent directories.
///
/// Strict variant: an ancestor that already exists as a non-directory fails
/// the extraction instead of being silently replaced or tunneled through.
fn ensure_parent_dirs(target: &Path) -> Result<()> {
    let Some(parent) = target.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    for ancestor in parent.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if let Ok(meta) = ancestor.symlink_metadata() {
            if !meta.is_dir() {
                return Err(SlmError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "parent path {} exists and is not a directory",
                        ancestor.display()
                    ),
                )));
            }
        }
    }

    std::fs::create_dir_all(parent)?;
    Ok(())
}

/// Restore POSIX permission bits, degrading to a warning on failure so
/// archives stay usable on platforms without that permission model.
#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(mode & 0o7777);
    if let Err(e) = std::fs::set_permissions(path, perms) {
        warn!(file = %path.display(), "failed to restore permissions: {e}");
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}
