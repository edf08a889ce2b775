use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to the user.
    ///
    /// Use of Internal is never a guarantee that the error was not caused
    /// by, for example, a corrupt input file - merely that the code cannot
    /// tell.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Closed set of failure kinds so callers can branch without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container is shorter than the 16-byte IV region.
    Format,
    /// AES-CBC decryption or PKCS#7 padding removal failed. A wrong
    /// password and corrupted ciphertext are indistinguishable.
    Cipher,
    /// The plaintext is not valid UTF-8, or the gzip codec faulted.
    Encoding,
    /// The decoded text is not a valid JSON document.
    InvalidDocument,
    /// Missing or unusable input supplied by the caller, such as an empty
    /// password.
    Input,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
    /// Unexpected state reached within es3save logic.
    Internal,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct Es3Error {
    /// Broad error category.
    pub category: ErrorCategory,
    /// Specific condition tag.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl Es3Error {
    /// Creates a new error tagged with a category and kind.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving
    /// the original as source. Category and kind carry over unchanged.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Es3Error>;
