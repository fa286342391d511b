//! Tamper- and corruption-detection suite: every flipped bit must surface
//! as an authentication or format error, never as silent acceptance.

use slm_rs::archive::format::{header_size, ArchiveHeader, FileEntryPlain};
use slm_rs::archive::{ArchivePacker, ArchiveReader, CompressionAlgo, PackEntry, PackOptions};
use slm_rs::compress;
use slm_rs::crypto::{self, KeySchedule, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
use slm_rs::SlmError;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempDir;

const PASSWORD: &[u8] = b"Pw#Aaaa1!";

/// Header size for the current writer version
const HEADER: u64 = 900;

/// Offset of the first entry's payload frame (header + one 308-byte record)
const FIRST_PAYLOAD: u64 = HEADER + 308;

fn create_test_archive(dir: &TempDir) -> std::path::PathBuf {
    let archive = dir.path().join("test.slm");
    let entries = vec![
        PackEntry {
            name: "data.bin".to_string(),
            mode: 0o644,
            data: vec![0xC3; 1024],
        },
        PackEntry {
            name: "second.txt".to_string(),
            mode: 0o600,
            data: b"second entry".to_vec(),
        },
    ];
    ArchivePacker::new(PackOptions::default())
        .unwrap()
        .pack(&archive, PASSWORD, &entries)
        .unwrap();
    archive
}

fn corrupt_byte_at(path: &Path, offset: u64) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut byte = [0u8; 1];
    use std::io::Read;
    file.read_exact(&mut byte).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[byte[0] ^ 0x01]).unwrap();
}

fn truncate_at(path: &Path, new_length: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_length).unwrap();
}

#[test]
fn test_wrong_password_fails_before_any_output() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    let result = ArchiveReader::open(&archive, b"Pw#Aaaa2!");
    assert!(matches!(result, Err(SlmError::HeaderAuth)));

    // Nothing was extracted anywhere near the archive
    let out = dir.path().join("out");
    assert!(!out.exists());
}

#[test]
fn test_corrupted_magic() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    corrupt_byte_at(&archive, 0);
    assert!(matches!(
        ArchiveReader::open(&archive, PASSWORD),
        Err(SlmError::MalformedHeader(_))
    ));
}

#[test]
fn test_corrupted_version() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    // 6 ^ 0x01 = 7, above the supported range
    corrupt_byte_at(&archive, 4);
    assert!(matches!(
        ArchiveReader::open(&archive, PASSWORD),
        Err(SlmError::MalformedHeader(_))
    ));
}

#[test]
fn test_header_bit_flips_never_pass() {
    let dir = TempDir::new().unwrap();

    // A sample of header offsets across every field: algorithm byte, level,
    // file count, comment length, salt, comment region, outdir region, HMAC.
    for offset in [5u64, 6, 8, 12, 16, 20, 40, 400, 600, 868, 899] {
        let archive = create_test_archive(&dir);
        corrupt_byte_at(&archive, offset);

        let result = ArchiveReader::open(&archive, PASSWORD);
        match result {
            Err(SlmError::HeaderAuth) | Err(SlmError::MalformedHeader(_)) => {}
            other => panic!(
                "flip at offset {offset} was not rejected: {:?}",
                other.err()
            ),
        }
        fs::remove_file(&archive).unwrap();
    }
}

#[test]
fn test_tampered_entry_metadata() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    // Inside the first entry's encrypted metadata record
    corrupt_byte_at(&archive, HEADER + 40);

    let out = dir.path().join("out");
    let reader = ArchiveReader::open(&archive, PASSWORD).unwrap();
    let result = reader.unpack(Some(&out), false);
    assert!(matches!(result, Err(SlmError::EntryAuth)));
    assert!(!out.join("data.bin").exists());
}

#[test]
fn test_tampered_payload() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    // Inside the first entry's encrypted payload, past nonce and tag
    corrupt_byte_at(&archive, FIRST_PAYLOAD + NONCE_SIZE as u64 + TAG_SIZE as u64 + 10);

    let out = dir.path().join("out");
    let reader = ArchiveReader::open(&archive, PASSWORD).unwrap();
    let result = reader.unpack(Some(&out), false);
    assert!(matches!(result, Err(SlmError::EntryAuth)));

    // The tampered payload never reached disk under its final name
    assert!(!out.join("data.bin").exists());
}

#[test]
fn test_tampered_payload_nonce_and_tag() {
    for delta in [0u64, NONCE_SIZE as u64] {
        let dir = TempDir::new().unwrap();
        let archive = create_test_archive(&dir);
        corrupt_byte_at(&archive, FIRST_PAYLOAD + delta);

        let out = dir.path().join("out");
        let reader = ArchiveReader::open(&archive, PASSWORD).unwrap();
        assert!(matches!(
            reader.unpack(Some(&out), false),
            Err(SlmError::EntryAuth)
        ));
    }
}

#[test]
fn test_truncated_header() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    truncate_at(&archive, HEADER / 2);
    assert!(matches!(
        ArchiveReader::open(&archive, PASSWORD),
        Err(SlmError::Io(_))
    ));
}

#[test]
fn test_truncated_payload() {
    let dir = TempDir::new().unwrap();
    let archive = create_test_archive(&dir);

    truncate_at(&archive, FIRST_PAYLOAD + 100);

    let out = dir.path().join("out");
    let reader = ArchiveReader::open(&archive, PASSWORD).unwrap();
    assert!(matches!(
        reader.unpack(Some(&out), false),
        Err(SlmError::Io(_))
    ));
}

#[test]
fn test_list_stops_at_unauthenticated_entry() {
    let dir = TempDir::new().unwrap();

    // Tamper the FIRST record: the walk cannot trust its framing and must
    // stop without reporting the intact second entry.
    let archive = create_test_archive(&dir);
    corrupt_byte_at(&archive, HEADER + 40);
    let outcome = ArchiveReader::open(&archive, PASSWORD)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(outcome.failed_entries, 1);
    assert!(outcome.entries.is_empty());
    fs::remove_file(&archive).unwrap();

    // Tamper the SECOND record: the first still lists cleanly.
    let archive = create_test_archive(&dir);
    let second_record = FIRST_PAYLOAD + (NONCE_SIZE + TAG_SIZE) as u64 + compressed_size_of_first(&archive);
    corrupt_byte_at(&archive, second_record + 40);
    let outcome = ArchiveReader::open(&archive, PASSWORD)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(outcome.failed_entries, 1);
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].filename, "data.bin");
}

/// The first entry's compressed size, recomputed the way the packer did
fn compressed_size_of_first(_archive: &Path) -> u64 {
    let comp = compress::compress(&[0xC3; 1024], CompressionAlgo::Lzma, 1).unwrap();
    comp.len() as u64
}

#[test]
fn test_swapped_key_domains_fail_entry_auth() {
    // An archive whose metadata was sealed under the file key (and payload
    // under the meta key) must fail on every entry even though the header
    // authenticates.
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("swapped.slm");

    let salt = [0x55u8; SALT_SIZE];
    let keys = KeySchedule::derive(PASSWORD, &salt);

    let mut header = ArchiveHeader::new(CompressionAlgo::Deflate, 1);
    header.file_count = 1;
    header.salt = salt;
    header.hmac = crypto::hmac_sha256(keys.file_key(), &[&header.authenticated_bytes()]).unwrap();

    let mut out = Vec::new();
    header.write_to(&mut out).unwrap();

    let data = b"domain separation";
    let comp = compress::compress(data, CompressionAlgo::Deflate, 1).unwrap();
    let plain = FileEntryPlain {
        filename: "swap.txt".to_string(),
        compressed_size: comp.len() as u64,
        original_size: data.len() as u64,
        mode: 0o644,
    };

    // Keys deliberately swapped relative to the format
    let mut record = plain.to_bytes().unwrap();
    let meta_nonce = [1u8; NONCE_SIZE];
    let meta_tag = crypto::aead_encrypt(keys.file_key(), &meta_nonce, &mut record, &[]).unwrap();
    out.extend_from_slice(&meta_nonce);
    out.extend_from_slice(&meta_tag);
    out.extend_from_slice(&record);

    let mut payload = comp;
    let file_nonce = [2u8; NONCE_SIZE];
    let file_tag = crypto::aead_encrypt(keys.meta_key(), &file_nonce, &mut payload, &[]).unwrap();
    out.extend_from_slice(&file_nonce);
    out.extend_from_slice(&file_tag);
    out.extend_from_slice(&payload);

    fs::write(&archive, &out).unwrap();
    assert!(out.len() > header_size(6));

    let target = dir.path().join("out");
    let reader = ArchiveReader::open(&archive, PASSWORD).unwrap();
    assert!(matches!(
        reader.unpack(Some(&target), false),
        Err(SlmError::EntryAuth)
    ));
}
