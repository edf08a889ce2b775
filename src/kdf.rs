//! Password-based key derivation for ES3 containers
//!
//! Keys are derived with PBKDF2-HMAC-SHA1. The salt is the container's IV,
//! which is also used as the CBC IV. Files written by the game depend on
//! this dual role, so the two must never be decoupled.

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use zeroize::Zeroizing;

/// Length of the salt (the container IV) in bytes
pub const SALT_LEN: usize = 16;

/// Length of the derived AES-128 key in bytes
pub const KEY_LEN: usize = 16;

/// PBKDF2 iteration count used by the game
pub const ITERATIONS: u32 = 100;

/// Derive a 16-byte key from a password and salt.
///
/// Deterministic and side-effect free. The returned key is wiped from
/// memory when dropped.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha1>(password, salt, ITERATIONS, key.as_mut_slice());
    key
}
