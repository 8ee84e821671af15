//! Password digests and session tokens.
//!
//! Credentials are stored as salted SHA-256 digests. Sessions are
//! random bearer tokens persisted server-side with an expiry; every
//! protected request is validated against that table, so the client's
//! cached copy is never the authority.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

fn random_hex(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fresh per-user salt.
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Fresh session token.
pub fn generate_token() -> String {
    random_hex(32)
}

/// Salted SHA-256 digest of a password, hex encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a candidate password against a stored digest.
pub fn verify_password(password: &str, salt: &str, digest: &str) -> bool {
    hash_password(password, salt) == digest
}
