//! Bearer secrets (session tokens, auth codes).
//!
//! Secrets are 32 random bytes rendered as URL-safe base64. Only their
//! SHA-256 digest is ever written to the database.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

pub fn generate() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

pub fn digest(secret: &str) -> String { hex::encode(Sha256::digest(secret.as_bytes())) }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_and_cookie_safe() {
    let a = generate();
    let b = generate();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn digest_is_stable_hex() {
    assert_eq!(digest("abc"), digest("abc"));
    assert_ne!(digest("abc"), digest("abd"));
    assert_eq!(digest("abc").len(), 64);
  }
}
