use crate::error::{Result, SlmError};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// AES-256 key size in bytes
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// HMAC-SHA256 output size in bytes
pub const HMAC_SIZE: usize = 32;

/// Fill a buffer with bytes from the OS CSPRNG
pub fn random_bytes(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|_| SlmError::CryptoUnavailable)
}

/// Encrypt a buffer in place with AES-256-GCM, returning the detached tag.
///
/// The ciphertext has the same length as the plaintext; the 16-byte tag is
/// returned separately so callers control the on-disk framing.
pub fn aead_encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    buf: &mut [u8],
    aad: &[u8],
) -> Result<[u8; TAG_SIZE]> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, buf)
        .map_err(|_| SlmError::CryptoUnavailable)?;
    Ok(tag.into())
}

/// Decrypt a buffer in place with AES-256-GCM, verifying the detached tag.
///
/// On tag mismatch the buffer contents are unspecified and must not be used.
pub fn aead_decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    buf: &mut [u8],
    tag: &[u8; TAG_SIZE],
    aad: &[u8],
) -> Result<()> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), aad, buf, Tag::from_slice(tag))
        .map_err(|_| SlmError::EntryAuth)
}

/// Compute HMAC-SHA256 over a sequence of data parts
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; HMAC_SIZE]> {
    let mut mac: Hmac<Sha256> =
        Mac::new_from_slice(key).map_err(|_| SlmError::CryptoUnavailable)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time equality for secret-dependent comparisons
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
