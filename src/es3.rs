//! ES3 encrypted-save codec
//!
//! This module implements the container format the game engine uses for
//! its encrypted saves:
//! - PBKDF2-HMAC-SHA1 (100 iterations) for key derivation from a password
//! - AES-128-CBC with PKCS#7 padding for encryption
//! - optional gzip compression of the plaintext
//!
//! The binary format is:
//! - iv: 16 bytes (also the PBKDF2 salt)
//! - ciphertext: remaining bytes, a whole number of 16-byte blocks
//!
//! The format carries no MAC. A corrupted ciphertext that happens to end
//! in valid padding decrypts to garbage and is only caught by the gzip or
//! UTF-8 stages, if at all. This matches the files the game writes and is
//! kept for compatibility.

use std::io::{Read, Write};

use aes::Aes128;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::error::{ErrorCategory, ErrorKind, Es3Error, Result};
use crate::kdf::{self, SALT_LEN};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Password the game uses when the save is not given a custom one.
///
/// Must match the game byte for byte.
pub const DEFAULT_PASSWORD: &str = "Why would you want to cheat?... :o It's no fun. :') :'D";

/// Length of the IV region at the start of a container
pub const IV_LEN: usize = SALT_LEN;

/// AES block size
const BLOCK_LEN: usize = 16;

/// First two bytes of every gzip member
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Borrowed view of an ES3 container: `iv || ciphertext`.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    iv: &'a [u8; IV_LEN],
    ciphertext: &'a [u8],
}

impl<'a> Container<'a> {
    /// Split raw container bytes into IV and ciphertext.
    ///
    /// Fails with [`ErrorKind::Format`] if fewer than 16 bytes are given.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let (iv, ciphertext) = bytes.split_first_chunk::<IV_LEN>().ok_or_else(|| {
            Es3Error::new(
                ErrorCategory::User,
                ErrorKind::Format,
                format!(
                    "input is {} bytes, shorter than the {}-byte IV; likely truncated or not an ES3 save",
                    bytes.len(),
                    IV_LEN
                ),
            )
        })?;
        Ok(Self { iv, ciphertext })
    }

    pub fn iv(&self) -> &'a [u8; IV_LEN] {
        self.iv
    }

    pub fn ciphertext(&self) -> &'a [u8] {
        self.ciphertext
    }
}

/// Returns true if `bytes` starts with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decrypt a container into its UTF-8 plaintext.
///
/// A gzip-compressed payload is inflated transparently; anything else is
/// taken to be the plaintext itself.
pub fn decrypt(container: &[u8], password: &[u8]) -> Result<String> {
    let payload = open(container, password)?;

    let plain = if is_gzip(&payload) {
        debug!(compressed_len = payload.len(), "payload is gzip-compressed");
        gunzip(&payload)?
    } else {
        debug!(len = payload.len(), "payload is not compressed");
        payload
    };

    decode_text(plain)
}

/// Decrypt a container using [`DEFAULT_PASSWORD`].
pub fn decrypt_with_default(container: &[u8]) -> Result<String> {
    decrypt(container, DEFAULT_PASSWORD.as_bytes())
}

/// Decrypt a container and return the raw payload, without decompressing.
pub fn open(container: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let container = Container::parse(container)?;
    let ciphertext = container.ciphertext();
    debug!(ciphertext_len = ciphertext.len(), "decrypting ES3 container");

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Es3Error::new(
            ErrorCategory::User,
            ErrorKind::Cipher,
            format!(
                "ciphertext length {} is not a positive multiple of {} bytes; corrupt or truncated input",
                ciphertext.len(),
                BLOCK_LEN
            ),
        ));
    }

    let key = kdf::derive_key(password, container.iv());
    Aes128CbcDec::new(&(*key).into(), &(*container.iv()).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            Es3Error::new(
                ErrorCategory::User,
                ErrorKind::Cipher,
                "invalid padding after decryption: wrong password or corrupt input",
            )
        })
}

/// Encrypt plaintext into a container using a random IV.
///
/// The plaintext is always gzip-compressed first, as the game does when
/// writing saves, even though [`decrypt`] also accepts uncompressed
/// payloads.
pub fn encrypt(plaintext: &str, password: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_deterministic(plaintext, password, &iv)
}

/// Encrypt plaintext into a container using [`DEFAULT_PASSWORD`].
pub fn encrypt_with_default(plaintext: &str) -> Result<Vec<u8>> {
    encrypt(plaintext, DEFAULT_PASSWORD.as_bytes())
}

/// Encrypt plaintext with a provided IV.
///
/// This function is ONLY for testing purposes to generate deterministic
/// output. NEVER use this in production - always use `encrypt()`, which
/// generates a random IV.
pub fn encrypt_deterministic(
    plaintext: &str,
    password: &[u8],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let compressed = gzip(plaintext.as_bytes())?;
    debug!(
        plain_len = plaintext.len(),
        compressed_len = compressed.len(),
        "compressed plaintext"
    );
    Ok(seal(&compressed, password, iv))
}

/// Encrypt a raw payload (no compression) into a container.
pub fn seal(payload: &[u8], password: &[u8], iv: &[u8; IV_LEN]) -> Vec<u8> {
    let key = kdf::derive_key(password, iv);
    let ciphertext =
        Aes128CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(payload);

    let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
    output.extend_from_slice(iv);
    output.extend_from_slice(&ciphertext);
    output
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data).map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::Internal,
            ErrorKind::Encoding,
            format!("gzip compression failed: {}", e),
            e,
        )
    })?;
    encoder.finish().map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::Internal,
            ErrorKind::Encoding,
            format!("gzip compression failed: {}", e),
            e,
        )
    })
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut plain = Vec::new();
    GzDecoder::new(data).read_to_end(&mut plain).map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::User,
            ErrorKind::Encoding,
            format!("gzip decompression failed: {}", e),
            e,
        )
    })?;
    Ok(plain)
}

fn decode_text(mut bytes: Vec<u8>) -> Result<String> {
    // Same as a browser TextDecoder: a leading BOM is not part of the text.
    if bytes.starts_with(&UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    String::from_utf8(bytes).map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::User,
            ErrorKind::Encoding,
            "decrypted content is not valid UTF-8",
            e,
        )
    })
}
