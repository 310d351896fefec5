//! Content-Transfer-Encoding decoders: Base64, quoted-printable, and RFC 2047 Q.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

use crate::error::{ReceiptError, Result};

/// Base64 engine that accepts missing padding and sloppy trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a Base64 payload, ignoring line breaks and other non-alphabet bytes.
pub fn decode_base64(input: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/' || *b == b'=')
        .collect();
    let end = cleaned
        .iter()
        .rposition(|&b| b != b'=')
        .map_or(0, |p| p + 1);
    LENIENT_BASE64
        .decode(&cleaned[..end])
        .map_err(|e| ReceiptError::TransferDecode {
            encoding: "base64".into(),
            reason: e.to_string(),
        })
}

/// Decode a quoted-printable payload (RFC 2045 §6.7).
///
/// Soft line breaks are removed and `=XX` escapes decoded. A malformed escape
/// is kept literally rather than rejected.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] != b'=' {
            result.push(input[i]);
            i += 1;
            continue;
        }
        let rest = &input[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else if let Some(byte) = rest.get(..2).and_then(hex_pair) {
            result.push(byte);
            i += 3;
        } else {
            result.push(b'=');
            i += 1;
        }
    }
    result
}

/// Decode an RFC 2047 Q-encoded word: underscores are spaces, `=XX` is a byte.
pub fn decode_q_word(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => match input.get(i + 1..i + 3).and_then(hex_pair) {
                Some(byte) => {
                    result.push(byte);
                    i += 3;
                }
                None => {
                    result.push(b'=');
                    i += 1;
                }
            },
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_with_line_breaks() {
        let decoded = decode_base64(b"SG9sYSBt\r\ndW5kbw==\r\n").unwrap();
        assert_eq!(decoded, b"Hola mundo");
    }

    #[test]
    fn test_base64_missing_padding() {
        assert_eq!(decode_base64(b"SG9sYQ").unwrap(), b"Hola");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let decoded = decode_quoted_printable(b"caf=E9 au=\r\n lait=3D1\r\n");
        assert_eq!(decoded, b"caf\xE9 au lait=1\r\n");
    }

    #[test]
    fn test_quoted_printable_keeps_bad_escape() {
        assert_eq!(decode_quoted_printable(b"a=ZZb="), b"a=ZZb=");
    }

    #[test]
    fn test_q_word() {
        assert_eq!(decode_q_word(b"caf=E9_au_lait"), b"caf\xE9 au lait");
    }
}
