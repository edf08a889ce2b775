//! Save file operations
//!
//! This module provides high-level file operations for decrypting saves
//! into editable JSON, encrypting edited JSON into saves, and updating an
//! existing save in place.

use crate::document;
use crate::error::{ErrorCategory, ErrorKind, Es3Error, Result};
use crate::es3;
use crate::passphrase::PassphraseReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// How decrypted save content is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Validate as JSON and write with two-space indentation.
    #[default]
    Pretty,
    /// Write the decrypted text exactly as stored.
    Raw,
}

/// Decrypt a save file
///
/// Reads the ES3 container from `input_path`, decrypts it using a password
/// from `passphrase_reader`, and writes the content to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    format: OutputFormat,
) -> Result<()> {
    let container = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let text =
        es3::decrypt(&container, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?;

    let contents = match format {
        OutputFormat::Raw => text,
        OutputFormat::Pretty => {
            let doc = document::parse_document(&text)
                .map_err(|e| e.with_context("decrypted save is not a JSON document"))?;
            document::pretty(&doc) + "\n"
        }
    };

    write_file_secure(output_path, contents.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "decrypted save"
    );
    Ok(())
}

/// Encrypt a JSON document into a save file
///
/// Reads the document from `input_path`, validates it, and writes it in
/// compact form as an ES3 container to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = read_document(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let container =
        es3::encrypt(&plaintext, &passphrase).map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, &container)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        "encrypted save"
    );
    Ok(())
}

/// Update a save file with an edited document using the same password
///
/// This function:
/// 1. Decrypts the existing save at `save_path` to validate the password
/// 2. Reads and validates the edited document from `document_path`
/// 3. Encrypts the document with the validated password
/// 4. Atomically writes to `save_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
pub fn update_file(
    document_path: &Path,
    save_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let existing = fs::read(save_path).map_err(|e| read_error(save_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;

    // Validate password by decrypting existing save (discard plaintext)
    es3::decrypt(&existing, &passphrase).map_err(|e| e.with_context("failed to decrypt"))?;
    debug!(save = %save_path.display(), "password validated against existing save");

    let save_dir = match save_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let plaintext = read_document(document_path)?;
    let container =
        es3::encrypt(&plaintext, &passphrase).map_err(|e| e.with_context("failed to encrypt"))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(save_dir)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to create tempfile", e))?;
    temp_file
        .write_all(&container)
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCategory::Internal, "failed to flush tempfile", e))?;
    temp_file.as_file().sync_all().map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                io_error(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    temp_file.persist(save_path).map_err(|e| {
        io_error(
            ErrorCategory::Internal,
            format!("failed to rename to target file {}", save_path.display()),
            e.error,
        )
    })?;
    info!(
        input = %document_path.display(),
        save = %save_path.display(),
        "updated save"
    );
    Ok(())
}

/// Read a document file and return it in the compact form stored in saves.
fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::User,
            ErrorKind::Encoding,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })?;
    let doc = document::parse_document(&text)
        .map_err(|e| e.with_context(format!("failed to parse {}", path.display())))?;
    Ok(document::compact(&doc))
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                io_error(
                    ErrorCategory::User,
                    format!("failed to open {}", path.display()),
                    e,
                )
            })?;

        file.write_all(contents).map_err(|e| {
            io_error(
                ErrorCategory::Internal,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            io_error(
                ErrorCategory::User,
                format!("failed to write {}", path.display()),
                e,
            )
        })
    }
}

fn io_error(category: ErrorCategory, msg: impl Into<String>, err: io::Error) -> Es3Error {
    Es3Error::with_source(category, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> Es3Error {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    io_error(
        category,
        format!("failed to read from {}", path.display()),
        err,
    )
}
