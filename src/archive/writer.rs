use crate::archive::format::{
    pack_sealed_field, ArchiveHeader, CompressionAlgo, FileEntryPlain, MAX_COMMENT_LEN,
    MAX_FILENAME, MAX_FILES, MAX_FILE_SIZE, MAX_OUTDIR_LEN,
};
use crate::archive::format::is_path_traversal;
use crate::compress::{self, DEFAULT_LEVEL, MAX_LEVEL};
use crate::crypto::{self, KeySchedule, NONCE_SIZE, SALT_SIZE};
use crate::error::{Result, SlmError};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// One file to be packed: logical name, permission bits, contents
#[derive(Debug, Clone)]
pub struct PackEntry {
    pub name: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

/// Packing options
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub algo: CompressionAlgo,
    pub level: u8,
    pub comment: Option<String>,
    pub outdir: Option<String>,
    pub overwrite: bool,
    pub dry_run: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            algo: CompressionAlgo::Lzma,
            level: DEFAULT_LEVEL,
            comment: None,
            outdir: None,
            overwrite: false,
            dry_run: false,
        }
    }
}

/// Archive producer for `.slm` files.
///
/// Entries are written in input order; each is compressed, encrypted under
/// the file key, and framed behind an encrypted fixed-size metadata record.
pub struct ArchivePacker {
    opts: PackOptions,
}

impl ArchivePacker {
    pub fn new(opts: PackOptions) -> Result<Self> {
        if opts.level > MAX_LEVEL {
            return Err(SlmError::Compress(format!(
                "compression level {} out of range",
                opts.level
            )));
        }
        if let Some(comment) = &opts.comment {
            if comment.len() > MAX_COMMENT_LEN {
                return Err(SlmError::ResourceLimit(format!(
                    "comment of {} bytes exceeds limit of {MAX_COMMENT_LEN}",
                    comment.len()
                )));
            }
        }
        if let Some(outdir) = &opts.outdir {
            if outdir.len() > MAX_OUTDIR_LEN {
                return Err(SlmError::ResourceLimit(format!(
                    "output directory of {} bytes exceeds limit of {MAX_OUTDIR_LEN}",
                    outdir.len()
                )));
            }
            if is_path_traversal(outdir) {
                return Err(SlmError::PathTraversal(outdir.clone()));
            }
        }
        Ok(Self { opts })
    }

    /// Pack `entries` into an archive at `archive_path`
    pub fn pack(&self, archive_path: &Path, password: &[u8], entries: &[PackEntry]) -> Result<()> {
        self.pack_with_rng(archive_path, password, entries, &mut OsRng)
    }

    /// Pack with a caller-supplied randomness source.
    ///
    /// The salt and every nonce are drawn from `rng` in a fixed order, so a
    /// deterministic source reproduces the archive byte for byte.
    pub fn pack_with_rng<R: RngCore + CryptoRng>(
        &self,
        archive_path: &Path,
        password: &[u8],
        entries: &[PackEntry],
        rng: &mut R,
    ) -> Result<()> {
        check_entries(entries)?;

        if !self.opts.overwrite && archive_path.exists() {
            return Err(SlmError::DestinationExists(archive_path.to_path_buf()));
        }

        if self.opts.dry_run {
            // Everything but the write, so key derivation, compression, and
            // encryption surface the same errors a real run would.
            self.write_archive(&mut io::sink(), password, entries, rng)?;
            info!(
                entries = entries.len(),
                "dry run complete, no archive written"
            );
            return Ok(());
        }

        let file = File::create(archive_path)?;
        let mut writer = BufWriter::new(file);
        self.write_archive(&mut writer, password, entries, rng)?;
        writer.flush()?;
        info!(
            archive = %archive_path.display(),
            entries = entries.len(),
            "archive written"
        );
        Ok(())
    }

    fn write_archive<W: Write, R: RngCore + CryptoRng>(
        &self,
        writer: &mut W,
        password: &[u8],
        entries: &[PackEntry],
        rng: &mut R,
    ) -> Result<()> {
        let mut salt = [0u8; SALT_SIZE];
        fill_random(rng, &mut salt)?;

        let keys = KeySchedule::derive(password, &salt);

        let mut header = ArchiveHeader::new(self.opts.algo, self.opts.level);
        header.file_count = entries.len() as u32;
        header.salt = salt;

        if let Some(comment) = &self.opts.comment {
            header.comment_len =
                seal_into_region(&mut header.comment, comment.as_bytes(), &keys, rng)?;
        }
        if let Some(outdir) = &self.opts.outdir {
            header.outdir_len =
                seal_into_region(&mut header.outdir, outdir.as_bytes(), &keys, rng)?;
        }

        header.hmac = crypto::hmac_sha256(keys.file_key(), &[&header.authenticated_bytes()])?;
        header.write_to(&mut *writer)?;

        for entry in entries {
            self.write_entry(writer, &keys, entry, rng)?;
        }

        Ok(())
    }

    fn write_entry<W: Write, R: RngCore + CryptoRng>(
        &self,
        writer: &mut W,
        keys: &KeySchedule,
        entry: &PackEntry,
        rng: &mut R,
    ) -> Result<()> {
        // Zero-byte inputs carry no payload frame at all
        let compressed = if entry.data.is_empty() {
            Vec::new()
        } else {
            compress::compress(&entry.data, self.opts.algo, self.opts.level)?
        };

        let plain = FileEntryPlain {
            filename: entry.name.clone(),
            compressed_size: compressed.len() as u64,
            original_size: entry.data.len() as u64,
            mode: entry.mode & 0o7777,
        };

        let mut meta_buf = plain.to_bytes()?;
        let mut meta_nonce = [0u8; NONCE_SIZE];
        fill_random(rng, &mut meta_nonce)?;
        let meta_tag = crypto::aead_encrypt(keys.meta_key(), &meta_nonce, &mut meta_buf, &[])?;

        writer.write_all(&meta_nonce)?;
        writer.write_all(&meta_tag)?;
        writer.write_all(&meta_buf)?;

        if plain.original_size > 0 {
            let mut payload = compressed;
            let mut file_nonce = [0u8; NONCE_SIZE];
            fill_random(rng, &mut file_nonce)?;
            let file_tag =
                crypto::aead_encrypt(keys.file_key(), &file_nonce, &mut payload, &[])?;

            writer.write_all(&file_nonce)?;
            writer.write_all(&file_tag)?;
            writer.write_all(&payload)?;
        }

        debug!(
            file = %plain.filename,
            original = plain.original_size,
            compressed = plain.compressed_size,
            "entry packed"
        );
        Ok(())
    }
}

/// Validate the packer preconditions over the whole input set
fn check_entries(entries: &[PackEntry]) -> Result<()> {
    if entries.len() as u64 > u64::from(MAX_FILES) {
        return Err(SlmError::ResourceLimit(format!(
            "{} entries exceed the limit of {MAX_FILES} files",
            entries.len()
        )));
    }

    for entry in entries {
        if entry.name.is_empty() {
            return Err(SlmError::InvalidMetadata("empty entry name".to_string()));
        }
        if entry.name.len() >= MAX_FILENAME {
            return Err(SlmError::InvalidMetadata(format!(
                "entry name of {} bytes exceeds limit of {}",
                entry.name.len(),
                MAX_FILENAME - 1
            )));
        }
        if is_path_traversal(&entry.name) {
            return Err(SlmError::PathTraversal(entry.name.clone()));
        }
        if entry.data.len() as u64 > MAX_FILE_SIZE {
            return Err(SlmError::ResourceLimit(format!(
                "{} is {} bytes, limit is {MAX_FILE_SIZE}",
                entry.name,
                entry.data.len()
            )));
        }
    }

    Ok(())
}

/// Encrypt a header field under the meta key and pack it into its region,
/// returning the ciphertext length for the header's length field.
fn seal_into_region<R: RngCore + CryptoRng>(
    region: &mut [u8],
    plaintext: &[u8],
    keys: &KeySchedule,
    rng: &mut R,
) -> Result<u32> {
    let mut ciphertext = plaintext.to_vec();
    let mut nonce = [0u8; NONCE_SIZE];
    fill_random(rng, &mut nonce)?;
    let tag = crypto::aead_encrypt(keys.meta_key(), &nonce, &mut ciphertext, &[])?;
    pack_sealed_field(region, &ciphertext, &nonce, &tag);
    Ok(ciphertext.len() as u32)
}

fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(buf).map_err(|_| SlmError::CryptoUnavailable)
}
