//! Error types for the unipdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AssembleError`] — **Fatal**: the merge cannot proceed at all
//!   (input file missing, unsupported media type at intake, the final
//!   document could not be serialised). Returned as `Err(AssembleError)`
//!   from the top-level `assemble*` functions.
//!
//! * [`FileError`] — **Non-fatal**: a single source file could not be
//!   turned into pages (undecodable image, every PDF strategy failed).
//!   The file is replaced by a placeholder page in the output and the error
//!   is stored inside [`crate::output::FileReport`], so one bad upload never
//!   costs the user the rest of the batch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the unipdf library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::FileReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum AssembleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The declared media type is not one of PDF, JPEG or PNG.
    #[error("Unsupported media type '{media_type}' for '{name}' (expected application/pdf, image/jpeg or image/png)")]
    UnsupportedMediaType { name: String, media_type: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The merged document could not be serialised.
    #[error("Failed to serialise the merged PDF: {detail}")]
    SerializationFailed { detail: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Cover-text provider errors ────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Human-readable category printed on a placeholder page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The file is damaged, truncated or not what its type claims.
    Corrupted,
    /// The file parsed but its content uses a compression we cannot decode.
    UnsupportedCompression,
}

impl FailureReason {
    /// Sentence shown to the reader of the merged document.
    pub fn describe(&self) -> &'static str {
        match self {
            FailureReason::Corrupted => "The file appears to be corrupted or incomplete.",
            FailureReason::UnsupportedCompression => {
                "The file uses a compression format that is not supported."
            }
        }
    }
}

/// A non-fatal error for a single source file.
///
/// Stored alongside [`crate::output::FileReport`] when a file is replaced by
/// a placeholder page. The merge always continues with the next file.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum FileError {
    /// The image bytes could not be decoded as the declared format.
    #[error("{name}: image could not be decoded: {detail}")]
    ImageDecodeFailed { name: String, detail: String },

    /// Every PDF strategy failed; `detail` is the last strategy's error.
    #[error("{name}: all {attempts} PDF strategies failed, last error: {detail}")]
    PdfUnreadable {
        name: String,
        attempts: usize,
        reason: FailureReason,
        detail: String,
    },
}

impl FileError {
    /// Display name of the file that failed.
    pub fn file_name(&self) -> &str {
        match self {
            FileError::ImageDecodeFailed { name, .. } => name,
            FileError::PdfUnreadable { name, .. } => name,
        }
    }

    /// Category used on the placeholder page.
    pub fn reason(&self) -> FailureReason {
        match self {
            FileError::ImageDecodeFailed { .. } => FailureReason::Corrupted,
            FileError::PdfUnreadable { reason, .. } => *reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_media_type_display() {
        let e = AssembleError::UnsupportedMediaType {
            name: "notes.docx".into(),
            media_type: "application/msword".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.docx"), "got: {msg}");
        assert!(msg.contains("application/msword"), "got: {msg}");
    }

    #[test]
    fn pdf_unreadable_display() {
        let e = FileError::PdfUnreadable {
            name: "broken.pdf".into(),
            attempts: 3,
            reason: FailureReason::Corrupted,
            detail: "invalid file trailer".into(),
        };
        assert!(e.to_string().contains("all 3 PDF strategies failed"));
        assert_eq!(e.file_name(), "broken.pdf");
        assert_eq!(e.reason(), FailureReason::Corrupted);
    }

    #[test]
    fn image_failures_are_reported_as_corruption() {
        let e = FileError::ImageDecodeFailed {
            name: "photo.png".into(),
            detail: "bad header".into(),
        };
        assert_eq!(e.reason(), FailureReason::Corrupted);
        assert!(e.reason().describe().contains("corrupted"));
    }

    #[test]
    fn file_error_serialises() {
        let e = FileError::PdfUnreadable {
            name: "scan.pdf".into(),
            attempts: 3,
            reason: FailureReason::UnsupportedCompression,
            detail: "JBIG2Decode".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("unsupported_compression"), "got: {json}");
    }
}
