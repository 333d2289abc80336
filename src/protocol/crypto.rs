//! Digest functions for BaseX authentication.

use md5::{Digest, Md5};

/// Compute MD5 hash.
pub fn md5_hash(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// MD5 of `data` as lowercase hex, the text form the server compares against.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5_hash(data))
}

/// Login digest: `md5_hex(md5_hex(password) || nonce)`.
pub fn login_digest(password: &str, nonce: &[u8]) -> String {
    let mut input = md5_hex(password.as_bytes()).into_bytes();
    input.extend_from_slice(nonce);
    md5_hex(&input)
}
