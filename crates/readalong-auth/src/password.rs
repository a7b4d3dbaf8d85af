//! Salted password digests.
//!
//! Stored format: `v1$<salt-b64url>$<digest-b64url>` where the digest is
//! SHA-256 over salt bytes followed by the password bytes. The version tag
//! lets a future scheme coexist with already-stored digests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::AuthError;

const SCHEME: &str = "v1";
const SALT_LEN: usize = 16;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{SCHEME}${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest(&salt, password))
    )
}

/// Verify a password against a stored digest.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.splitn(3, '$');
    let scheme = parts.next().ok_or(AuthError::MalformedDigest)?;
    let salt_b64 = parts.next().ok_or(AuthError::MalformedDigest)?;
    let digest_b64 = parts.next().ok_or(AuthError::MalformedDigest)?;

    if scheme != SCHEME {
        return Err(AuthError::MalformedDigest);
    }

    let salt = URL_SAFE_NO_PAD
        .decode(salt_b64)
        .map_err(|_| AuthError::MalformedDigest)?;
    let expected = URL_SAFE_NO_PAD
        .decode(digest_b64)
        .map_err(|_| AuthError::MalformedDigest)?;

    Ok(constant_time_eq(&digest(&salt, password), &expected))
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Compare digests without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
