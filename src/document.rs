//! Save documents
//!
//! The codec treats plaintext as opaque text. Saves written by the game
//! hold a JSON object, and this module is where that structure is checked
//! before anything is shown to the user or re-encrypted. Key order is
//! preserved throughout.

use serde_json::Value;

use crate::error::{ErrorCategory, ErrorKind, Es3Error, Result};

/// Extension given to re-encrypted saves
pub const SAVE_EXTENSION: &str = "save";

/// Parse decoded save text as JSON.
pub fn parse_document(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        Es3Error::with_source(
            ErrorCategory::User,
            ErrorKind::InvalidDocument,
            format!("the content is not valid JSON: {}", e),
            e,
        )
    })
}

/// Render a document with two-space indentation for editing.
pub fn pretty(document: &Value) -> String {
    // Serializing a Value cannot fail: all map keys are strings.
    serde_json::to_string_pretty(document).unwrap_or_default()
}

/// Render a document on a single line, as written into saves.
pub fn compact(document: &Value) -> String {
    document.to_string()
}

/// Name for an exported save: the last extension of `file_name` is
/// replaced with `.save`, or `.save` is appended if there is none.
///
/// Only a `.` in the final path component counts as an extension
/// separator, and a leading dot (as in `.hidden`) does not.
pub fn export_file_name(file_name: &str) -> String {
    let component_start = file_name
        .rfind(|c: char| c == '/' || c == '\\')
        .map_or(0, |i| i + 1);
    let stem = match file_name[component_start..].rfind('.') {
        Some(dot) if dot > 0 => &file_name[..component_start + dot],
        _ => file_name,
    };
    format!("{}.{}", stem, SAVE_EXTENSION)
}
