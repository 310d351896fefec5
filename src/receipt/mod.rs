//! Receipt recognition: classification, normalization, extraction, and the
//! per-message pipeline tying them together.

pub mod classify;
pub mod extract;
pub mod normalize;
pub mod pipeline;

pub use pipeline::{process_decoded, process_message, MessageOutcome};
