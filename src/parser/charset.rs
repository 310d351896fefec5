//! Charset resolution with legacy Japanese fallbacks.
//!
//! Mail from this era mixes ISO-2022-JP, Shift_JIS and its Windows superset
//! (code page 932), often mislabelled. Decoding follows one chain everywhere:
//! the declared charset, then Windows-31J, then UTF-8, and only then a lossy
//! decode that replaces invalid sequences. Unlabelled MIME bytes try UTF-8
//! before Windows-31J; unlabelled folder index fields do not.

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

use crate::error::{ReceiptError, Result};

/// The legacy Japanese code page used as last resort (Windows-31J / cp932).
pub static LEGACY_JAPANESE: &Encoding = &encoding_rs::SHIFT_JIS_INIT;

/// Labels meaning "charset unknown"; the caller substitutes its own default.
const UNKNOWN_PLACEHOLDERS: &[&str] = &["unknown", "unknown-8bit", "x-unknown"];

/// Labels that `encoding_rs` does not know (or maps too narrowly) but which
/// all mean code page 932 in practice.
const LEGACY_ALIASES: &[&str] = &[
    "cp932",
    "ms932",
    "windows-31j",
    "shift_jis_2004",
    "shift_jisx0213",
    "x-sjis",
];

/// Index records tagged with these labels actually store Windows-31J bytes.
const INDEX_ALIASES: &[&str] = &["iso-2022-jp"];

/// Whether `label` is a placeholder for an unknown charset.
pub fn is_placeholder(label: &str) -> bool {
    let label = label.trim();
    UNKNOWN_PLACEHOLDERS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(label))
}

/// Resolve a MIME charset label to an encoding.
pub fn resolve(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches('"');
    if label.is_empty() || is_placeholder(label) {
        return None;
    }
    if LEGACY_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(label)) {
        return Some(LEGACY_JAPANESE);
    }
    Encoding::for_label(label.as_bytes())
}

/// Resolve a folder index charset field, applying the index alias table first.
pub fn resolve_index(label: &str) -> Option<&'static Encoding> {
    let trimmed = label.trim();
    if INDEX_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(trimmed)) {
        Some(LEGACY_JAPANESE)
    } else {
        resolve(trimmed)
    }
}

/// Decode without replacement, walking the fallback chain.
///
/// Fails with [`ReceiptError::Encoding`] only when none of the declared
/// charset, Windows-31J or UTF-8 accepts the bytes.
pub fn decode_strict(bytes: &[u8], declared: Option<&'static Encoding>) -> Result<String> {
    // Unlabelled bytes try UTF-8 first: strict UTF-8 rarely accepts Shift_JIS.
    let fallback = match declared {
        Some(_) => [LEGACY_JAPANESE, UTF_8],
        None => [UTF_8, LEGACY_JAPANESE],
    };
    for encoding in declared.into_iter().chain(fallback) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Ok(text.into_owned());
        }
    }
    Err(ReceiptError::Encoding {
        charset: declared.map(|e| e.name()).unwrap_or("<unknown>").to_string(),
    })
}

/// Decode with the full chain, ending in a replacing decode. Never fails.
pub fn decode_lossy(bytes: &[u8], declared: Option<&'static Encoding>) -> String {
    match decode_strict(bytes, declared) {
        Ok(text) => text,
        Err(e) => {
            let encoding = declared.unwrap_or(LEGACY_JAPANESE);
            warn!(error = %e, fallback = encoding.name(), "Replacing undecodable bytes");
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Decode a MIME-labelled byte string, never failing.
pub fn decode_labelled(bytes: &[u8], label: Option<&str>) -> String {
    decode_lossy(bytes, label.and_then(resolve))
}

/// Decode a folder index field using the record's own charset, never failing.
///
/// An empty or unknown label is read as Windows-31J, then UTF-8, then
/// Windows-31J with replacement.
pub fn decode_index_field(bytes: &[u8], label: &str) -> String {
    match resolve_index(label) {
        // A known charset decodes leniently, without walking the chain.
        Some(encoding) => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.into_owned()
        }
        None => decode_lossy(bytes, Some(LEGACY_JAPANESE)),
    }
}
