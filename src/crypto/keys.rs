use crate::crypto::primitives::KEY_SIZE;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count
pub const PBKDF2_ITERATIONS: u32 = 1_000_000;

/// Domain-separation string for the file-content key
pub const FILE_KEY_INFO: &[u8] = b"file encryption";

/// Domain-separation string for the entry-metadata key
pub const META_KEY_INFO: &[u8] = b"metadata encryption";

/// The two keys derived from one password for a single archive operation.
///
/// `file_key` authenticates the header and encrypts file payloads;
/// `meta_key` encrypts per-entry metadata and the sealed header fields.
/// Both are wiped when the schedule is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeySchedule {
    file_key: [u8; KEY_SIZE],
    meta_key: [u8; KEY_SIZE],
}

impl KeySchedule {
    /// Derive both keys from a password and a per-archive salt.
    ///
    /// PBKDF2 has no info input, so each domain-separation string is
    /// appended to the salt; the same password and salt with different
    /// strings produce unrelated keys.
    pub fn derive(password: &[u8], salt: &[u8; SALT_SIZE]) -> Self {
        Self {
            file_key: derive_subkey(password, salt, FILE_KEY_INFO),
            meta_key: derive_subkey(password, salt, META_KEY_INFO),
        }
    }

    pub fn file_key(&self) -> &[u8; KEY_SIZE] {
        &self.file_key
    }

    pub fn meta_key(&self) -> &[u8; KEY_SIZE] {
        &self.meta_key
    }
}

fn derive_subkey(password: &[u8], salt: &[u8; SALT_SIZE], info: &[u8]) -> [u8; KEY_SIZE] {
    let mut salted = Vec::with_capacity(SALT_SIZE + info.len());
    salted.extend_from_slice(salt);
    salted.extend_from_slice(info);

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, &salted, PBKDF2_ITERATIONS, &mut key);
    salted.zeroize();
    key
}
