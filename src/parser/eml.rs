//! Loader for individual `.eml` files (one bare RFC 5322 message, no archive framing).

use std::path::Path;

use crate::error::{ReceiptError, Result};
use crate::model::message::DecodedMessage;
use crate::parser::mime;

/// Read a single `.eml` file into memory.
pub fn read_eml(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| ReceiptError::open(path, e))
}

/// Read and decode a single `.eml` file.
pub fn load_message(path: impl AsRef<Path>) -> Result<DecodedMessage> {
    let data = read_eml(path)?;
    mime::decode_message(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = read_eml("/nonexistent/receipt.eml").unwrap_err();
        assert!(matches!(err, ReceiptError::FileNotFound(_)));
    }

    #[test]
    fn test_load_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.eml");
        std::fs::write(
            &path,
            b"From: a@b.com\r\nSubject: Hi\r\nMessage-ID: <1@b>\r\n\r\nBody\r\n",
        )
        .unwrap();
        let msg = load_message(&path).unwrap();
        assert_eq!(msg.subject, "Hi");
        assert_eq!(msg.message_id, "<1@b>");
    }
}
