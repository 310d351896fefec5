//! Centralized error types for becky-receipts.
//!
//! Errors are layered by blast radius:
//!
//! - [`ReceiptError`] covers I/O, structural and decoding failures.
//! - [`ExtractError`] is the failure of one extraction attempt on one body part.
//! - [`MessageError`] is what the per-message pipeline surfaces to the batch
//!   collector, which logs it, dumps diagnostics and moves on.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::receipt::Variant;

/// All I/O, structural and decoding errors produced by the library.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A folder index line does not have the expected shape.
    #[error("Malformed folder index '{path}' at line {line}: {reason}")]
    InvalidIndex {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A raw message could not be parsed as RFC 822 at all.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Bytes that no supported charset path could decode.
    #[error("Cannot decode bytes as '{charset}'")]
    Encoding { charset: String },

    /// The declared `Content-Transfer-Encoding` is missing or unsupported.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// The payload is not valid for its declared transfer encoding.
    #[error("Invalid {encoding} payload: {reason}")]
    TransferDecode { encoding: String, reason: String },

    /// `since` falls after `until`.
    #[error("Invalid date range: {since} is after {until}")]
    InvalidDateRange {
        since: chrono::NaiveDate,
        until: chrono::NaiveDate,
    },
}

/// Convenience alias for `Result<T, ReceiptError>`.
pub type Result<T> = std::result::Result<T, ReceiptError>;

impl ReceiptError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error` on `path`, turning `NotFound` into [`ReceiptError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Failure of a single extraction attempt.
///
/// These never escape the pipeline on their own: they are turned into traces
/// and folded into an [`UnrecognizedFormatError`] once every candidate part
/// has been tried.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A required label or anchor is absent from the body.
    #[error("{variant}: required field '{label}' not found")]
    MissingField { variant: Variant, label: String },

    /// The label was found but its value is not a valid amount.
    #[error("{variant}: invalid amount {value:?} for '{label}'")]
    InvalidAmount {
        variant: Variant,
        label: String,
        value: String,
    },

    /// The label was found but its value is not a recognizable date-time.
    #[error("{variant}: invalid date-time {value:?} for '{label}'")]
    InvalidDate {
        variant: Variant,
        label: String,
        value: String,
    },

    /// The `<pre>` block the legacy layout relies on is missing.
    #[error("{0}: no <pre> block in body")]
    MissingBlock(Variant),

    /// The body part itself could not be decoded.
    #[error("part could not be decoded: {0}")]
    Decode(#[from] ReceiptError),
}

/// An in-scope message that is not multipart.
#[derive(Error, Debug)]
#[error("in-scope message {message_id} is not multipart (from: {from}, subject: {subject})")]
pub struct NotMultipartError {
    pub message_id: String,
    pub from: String,
    pub subject: String,
}

/// Every candidate text/plain part failed extraction.
#[derive(Error, Debug)]
#[error(
    "unrecognized receipt format in {message_id} ({} part(s) tried, from: {from}, subject: {subject})",
    .traces.len()
)]
pub struct UnrecognizedFormatError {
    /// One formatted trace per attempted part, in document order.
    pub traces: Vec<String>,
    pub message_id: String,
    pub from: String,
    pub subject: String,
}

/// Message-level failure, caught by the batch collector at the message boundary.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error(transparent)]
    NotMultipart(#[from] NotMultipartError),

    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedFormatError),

    #[error(transparent)]
    Decode(#[from] ReceiptError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_maps_not_found() {
        let err = ReceiptError::open(
            "missing.bmf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ReceiptError::FileNotFound(_)));
    }

    #[test]
    fn test_unrecognized_display_counts_traces() {
        let err = UnrecognizedFormatError {
            traces: vec!["a".into(), "b".into()],
            message_id: "<id@x>".into(),
            from: "f".into(),
            subject: "s".into(),
        };
        assert!(err.to_string().contains("2 part(s) tried"));
    }
}
