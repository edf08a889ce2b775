//! Password sources
//!
//! Saves are usually protected by the game's built-in password, but a custom
//! one can come from a constant, any reader (such as stdin) or the terminal.

use crate::error::{ErrorCategory, ErrorKind, Es3Error, Result};
use crate::es3::DEFAULT_PASSWORD;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Reject passwords that are empty or consist only of whitespace.
pub fn validate_passphrase(passphrase: &[u8]) -> Result<()> {
    if passphrase.iter().all(u8::is_ascii_whitespace) {
        return Err(Es3Error::new(
            ErrorCategory::User,
            ErrorKind::Input,
            "password must not be empty",
        ));
    }
    Ok(())
}

/// Returns the game's built-in password
#[derive(Debug, Default)]
pub struct DefaultPassphraseReader;

impl PassphraseReader for DefaultPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(DEFAULT_PASSWORD.as_bytes().to_vec()))
    }
}

/// Returns a fixed password
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        validate_passphrase(&self.passphrase)?;
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads the password from any io::Read source, byte for byte
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            Es3Error::with_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        validate_passphrase(&data)?;
        Ok(data)
    }
}

/// Reads the password from the terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read password from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(Es3Error::new(
                ErrorCategory::User,
                ErrorKind::Input,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Password (es3save): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                Es3Error::with_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;

        let passphrase = rpassword::read_password().map_err(|e| {
            Es3Error::with_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        let passphrase = Zeroizing::new(passphrase.into_bytes());
        validate_passphrase(&passphrase)?;
        Ok(passphrase)
    }
}

/// Wraps another PassphraseReader and caches the result
///
/// Provides "at most once" semantics - the upstream reader is called
/// only on the first successful invocation. Errors are not cached.
pub struct CachingPassphraseReader {
    upstream: Box<dyn PassphraseReader>,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl CachingPassphraseReader {
    pub fn new(upstream: Box<dyn PassphraseReader>) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let cached = match self.cached.take() {
            Some(cached) => cached,
            None => self.upstream.read_passphrase()?,
        };
        let passphrase = Zeroizing::new((*cached).clone());
        self.cached = Some(cached);
        Ok(passphrase)
    }
}
