//! es3save - decrypt, edit and re-encrypt ES3 encrypted game saves

#![forbid(unsafe_code)]

pub mod document;
pub mod error;
pub mod es3;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod task;

pub use error::{ErrorCategory, ErrorKind, Es3Error, Result};
pub use es3::{DEFAULT_PASSWORD, decrypt, decrypt_with_default, encrypt, encrypt_with_default};
