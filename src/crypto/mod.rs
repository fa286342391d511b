mod keys;
mod primitives;

pub use keys::{
    KeySchedule, FILE_KEY_INFO, META_KEY_INFO, PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use primitives::{
    aead_decrypt, aead_encrypt, constant_time_eq, hmac_sha256, random_bytes, HMAC_SIZE,
    KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
