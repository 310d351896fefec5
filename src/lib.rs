//! `becky-receipts`: extract payment receipts from Becky! mailboxes.
//!
//! The library splits `.bmf` archives into raw messages, decodes the
//! per-folder `Folder.idx` summaries, decodes MIME messages tolerantly
//! (legacy Japanese charsets included), and recognizes the historical
//! receipt layouts of a single sender into [`model::receipt::ReceiptRecord`]s.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod receipt;
pub mod scan;
