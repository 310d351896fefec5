//! Core data model types: folder index entries, decoded messages, and receipt records.

pub mod folder;
pub mod message;
pub mod receipt;
