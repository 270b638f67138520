use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix used for monitor ping tokens.
pub const PING_PREFIX: &str = "pg";
/// Prefix used for session tokens.
pub const SESSION_PREFIX: &str = "ss";

/// Generate `<prefix>_<32 hex chars>` from 16 random bytes.
pub fn generate_token(prefix: &str) -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{prefix}_{}", hex::encode(bytes))
}

/// SHA-256 of `token`, lowercase hex. Sessions are stored under this.
pub fn hash_token(token: &str) -> String {
    sha256_hex(token)
}

pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
