//! Asynchronous codec entry points
//!
//! Key derivation, AES and gzip all run to completion on tokio's blocking
//! pool so that an interactive task awaiting the result is never stalled.
//! Must be called from within a tokio runtime.

use tokio::task;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Es3Error, Result};
use crate::es3;

/// Decrypt a container on the blocking pool. See [`es3::decrypt`].
pub async fn decrypt_async(container: Vec<u8>, password: Zeroizing<Vec<u8>>) -> Result<String> {
    task::spawn_blocking(move || es3::decrypt(&container, &password))
        .await
        .map_err(join_error)?
}

/// Encrypt plaintext on the blocking pool. See [`es3::encrypt`].
pub async fn encrypt_async(plaintext: String, password: Zeroizing<Vec<u8>>) -> Result<Vec<u8>> {
    task::spawn_blocking(move || es3::encrypt(&plaintext, &password))
        .await
        .map_err(join_error)?
}

fn join_error(err: task::JoinError) -> Es3Error {
    Es3Error::with_source(
        ErrorCategory::Internal,
        ErrorKind::Internal,
        "codec task did not run to completion",
        err,
    )
}
