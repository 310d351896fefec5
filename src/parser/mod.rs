//! Byte-level parsing: archive splitting, folder indexes, headers, MIME parts, and charsets.

pub mod archive;
pub mod charset;
pub mod eml;
pub mod folder_index;
pub mod header;
pub mod mime;
pub mod transfer;
