//! Output writers: CSV records, diagnostic dumps, and per-part text files.

pub mod csv;
pub mod diagnostic;
pub mod parts;
