//! Archive splitter for Becky! `.bmf` mailbox files.
//!
//! An archive is a flat concatenation of RFC 822 messages, each followed by
//! the 5-byte terminator `CRLF . CRLF`. The last message may lack it.
//!
//! The scan is purely byte-based: a body that happens to contain the literal
//! terminator is split in two. That is a property of the format, not
//! something this module tries to repair.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ReceiptError, Result};

/// End-of-message marker.
pub const TERMINATOR: &[u8; 5] = b"\r\n.\r\n";

/// One message slice of an archive, terminator included when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage<'a> {
    /// Byte offset of the message inside the archive.
    pub offset: usize,
    /// The message bytes.
    pub bytes: &'a [u8],
}

impl<'a> RawMessage<'a> {
    /// Whether the slice ends with the terminator (false only for a truncated tail).
    pub fn is_terminated(&self) -> bool {
        self.bytes.ends_with(TERMINATOR)
    }

    /// Message bytes without the trailing terminator.
    pub fn content(&self) -> &'a [u8] {
        // Keep the CRLF that ends the last body line.
        if self.is_terminated() {
            &self.bytes[..self.bytes.len() - 3]
        } else {
            self.bytes
        }
    }
}

/// Splits an in-memory archive into messages.
///
/// Holds no state besides the borrowed buffer: every call to
/// [`ArchiveSplitter::messages`] restarts from the beginning and yields the
/// identical sequence.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveSplitter<'a> {
    data: &'a [u8],
}

impl<'a> ArchiveSplitter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Lazily iterate over the messages of the archive.
    pub fn messages(&self) -> Messages<'a> {
        Messages {
            data: self.data,
            pos: 0,
        }
    }
}

/// Iterator returned by [`ArchiveSplitter::messages`].
#[derive(Debug, Clone)]
pub struct Messages<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Messages<'a> {
    type Item = RawMessage<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let end = match find_terminator(&self.data[start..]) {
            Some(rel) => start + rel + TERMINATOR.len(),
            None => self.data.len(),
        };
        self.pos = end;
        Some(RawMessage {
            offset: start,
            bytes: &self.data[start..end],
        })
    }
}

impl std::iter::FusedIterator for Messages<'_> {}

/// Position of the first terminator in `buf`.
#[inline]
fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

/// A whole archive file loaded into memory.
pub struct Archive {
    path: PathBuf,
    data: Vec<u8>,
}

impl Archive {
    /// Read the archive fully into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|e| ReceiptError::open(&path, e))?;
        debug!(path = %path.display(), size = data.len(), "Loaded archive");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name, used to prefix diagnostic dumps.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Messages<'_> {
        ArchiveSplitter::new(&self.data).messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_terminated_messages() {
        let data = b"A: 1\r\n\r\none\r\n.\r\nB: 2\r\n\r\ntwo\r\n.\r\n";
        let msgs: Vec<_> = ArchiveSplitter::new(data).messages().collect();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].bytes, b"A: 1\r\n\r\none\r\n.\r\n");
        assert_eq!(msgs[1].offset, msgs[0].bytes.len());
        assert!(msgs[1].is_terminated());
    }

    #[test]
    fn test_trailing_tail_without_terminator() {
        let data = b"first\r\n.\r\nsecond";
        let msgs: Vec<_> = ArchiveSplitter::new(data).messages().collect();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].bytes, b"second");
        assert!(!msgs[1].is_terminated());
        assert_eq!(msgs[1].content(), b"second");
    }

    #[test]
    fn test_empty_archive() {
        assert_eq!(ArchiveSplitter::new(b"").messages().count(), 0);
    }

    #[test]
    fn test_content_strips_terminator() {
        let data = b"body\r\n.\r\n";
        let msg = ArchiveSplitter::new(data).messages().next().unwrap();
        assert_eq!(msg.content(), b"body\r\n");
    }

    #[test]
    fn test_embedded_terminator_is_split() {
        // Known limitation: the scan is not content-aware.
        let data = b"part one\r\n.\r\npart two\r\n.\r\n";
        assert_eq!(ArchiveSplitter::new(data).messages().count(), 2);
    }

    #[test]
    fn test_lf_only_dot_is_not_a_terminator() {
        let data = b"line\n.\nmore\r\n.\r\n";
        assert_eq!(ArchiveSplitter::new(data).messages().count(), 1);
    }
}
