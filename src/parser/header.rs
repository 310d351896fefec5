//! RFC 5322 header parsing: header block splitting, folding, and RFC 2047 encoded-words.
//!
//! Header values are kept as raw bytes until decoding, because legacy clients
//! happily put unencoded Shift_JIS into `Subject:`.

use tracing::warn;

use crate::error::Result;
use crate::parser::charset;
use crate::parser::transfer;

/// Unfolded header fields of one message, in order of appearance.
#[derive(Debug, Clone, Default)]
pub struct HeaderBlock {
    fields: Vec<(String, Vec<u8>)>,
}

impl HeaderBlock {
    /// Split the header section off a raw message and unfold it.
    pub fn from_message(raw: &[u8]) -> Self {
        let end = find_header_end(raw).unwrap_or(raw.len());
        Self {
            fields: unfold_headers(&raw[..end]),
        }
    }

    /// First raw value for a header name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(raw: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut result: Vec<(String, Vec<u8>)> = Vec::new();

    for line in raw.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.starts_with(b" ") || line.starts_with(b"\t") {
            if let Some(last) = result.last_mut() {
                last.1.push(b' ');
                last.1.extend_from_slice(line.trim_ascii());
            }
        } else if let Some(colon_pos) = line.iter().position(|&b| b == b':') {
            let name = String::from_utf8_lossy(&line[..colon_pos])
                .trim()
                .to_lowercase();
            let value = line[colon_pos + 1..].trim_ascii().to_vec();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// One piece of a header value.
#[derive(Debug, PartialEq)]
enum Segment<'a> {
    /// Text outside any encoded-word.
    Plain(&'a [u8]),
    /// A decoded encoded-word with its charset tag.
    Encoded { charset: &'a str, bytes: Vec<u8> },
}

/// Split a header value into plain runs and decoded encoded-words.
///
/// Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2).
fn split_segments(input: &[u8]) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = find(remaining, b"=?") {
        let before = &remaining[..start];
        if !before.is_empty() && (!last_was_encoded || !before.trim_ascii().is_empty()) {
            segments.push(Segment::Plain(before));
        }

        let after_start = &remaining[start + 2..];
        if let Some((segment, consumed)) = try_decode_one_word(after_start) {
            segments.push(segment);
            remaining = &after_start[consumed..];
            last_was_encoded = true;
        } else {
            segments.push(Segment::Plain(&remaining[start..start + 2]));
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    if !remaining.is_empty() {
        segments.push(Segment::Plain(remaining));
    }
    segments
}

/// Decode one `charset?encoding?text?=` word (the leading `=?` already consumed).
///
/// Returns the segment and the number of bytes consumed from `s`.
fn try_decode_one_word(s: &[u8]) -> Option<(Segment<'_>, usize)> {
    let first_q = s.iter().position(|&b| b == b'?')?;
    let charset = std::str::from_utf8(&s[..first_q]).ok()?;
    // RFC 2231 language suffix: "ISO-2022-JP*ja"
    let charset = charset.split('*').next().unwrap_or(charset);

    let rest = &s[first_q + 1..];
    let second_q = rest.iter().position(|&b| b == b'?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = find(rest2, b"?=")?;
    let encoded_text = &rest2[..end];

    if charset.is_empty() || charset.contains(char::is_whitespace) || encoding.len() != 1 {
        return None;
    }

    let bytes = match encoding[0].to_ascii_uppercase() {
        b'B' => transfer::decode_base64(encoded_text).ok()?,
        b'Q' => transfer::decode_q_word(encoded_text),
        _ => return None,
    };

    let consumed = first_q + 1 + second_q + 1 + end + 2;
    Some((Segment::Encoded { charset, bytes }, consumed))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode a header value, segment by segment.
///
/// Each encoded-word is decoded with its own charset tag; untagged text and
/// words tagged with an "unknown" placeholder use `default_charset` (the
/// message's declared body charset). Segments are concatenated without a
/// separator. A segment that no charset in the fallback chain accepts yields
/// [`crate::error::ReceiptError::Encoding`].
pub fn decode_header_value(value: &[u8], default_charset: Option<&str>) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    for segment in split_segments(value) {
        let (bytes, label) = segment_source(&segment, default_charset);
        out.push_str(&charset::decode_strict(bytes, label.and_then(charset::resolve))?);
    }
    Ok(out)
}

/// Like [`decode_header_value`], but replaces undecodable bytes instead of failing.
pub fn decode_header_lossy(value: &[u8], default_charset: Option<&str>) -> String {
    match decode_header_value(value, default_charset) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Header not decodable, replacing invalid bytes");
            split_segments(value)
                .iter()
                .map(|segment| {
                    let (bytes, label) = segment_source(segment, default_charset);
                    charset::decode_labelled(bytes, label)
                })
                .collect()
        }
    }
}

fn segment_source<'s>(
    segment: &'s Segment<'_>,
    default_charset: Option<&'s str>,
) -> (&'s [u8], Option<&'s str>) {
    match segment {
        Segment::Plain(bytes) => (*bytes, default_charset),
        Segment::Encoded { charset: tag, bytes } => {
            let label = if charset::is_placeholder(tag) {
                default_charset
            } else {
                Some(*tag)
            };
            (bytes.as_slice(), label)
        }
    }
}

/// Decode RFC 2047 encoded-words in a UTF-8 header value, with no default charset.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
pub fn decode_encoded_words(input: &str) -> String {
    decode_header_lossy(input.as_bytes(), Some("utf-8"))
}

/// Extract content between `<` and `>` (for Message-ID).
pub fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start..start + end + 1].to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_mixed_charsets() {
        // "楽天" in ISO-2022-JP followed by "ペイ" in UTF-8
        let input = b"=?ISO-2022-JP?B?GyRCM1pFNxsoQg==?= =?UTF-8?B?44Oa44Kk?=";
        assert_eq!(decode_header_value(input, None).unwrap(), "楽天ペイ");
    }

    #[test]
    fn test_unknown_tag_uses_default_charset() {
        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode("確認");
        let mut input = b"=?unknown-8bit?Q?".to_vec();
        for b in sjis.iter() {
            input.extend_from_slice(format!("={b:02X}").as_bytes());
        }
        input.extend_from_slice(b"?=");
        let decoded = decode_header_value(&input, Some("shift_jis")).unwrap();
        assert_eq!(decoded, "確認");
    }

    #[test]
    fn test_raw_eight_bit_falls_back_to_cp932() {
        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode("ご利用内容確認メール");
        let decoded = decode_header_value(&sjis, Some("utf-8")).unwrap();
        assert_eq!(decoded, "ご利用内容確認メール");
    }

    #[test]
    fn test_undecodable_header_is_an_error_then_lossy() {
        let input = [b'a', 0x82, 0xFF];
        assert!(decode_header_value(&input, None).is_err());
        assert!(decode_header_lossy(&input, None).starts_with('a'));
    }

    #[test]
    fn test_unfold_headers() {
        let text = b"Subject: This is a long\r\n\tsubject line\r\nFrom: user@example.com\r\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, b"This is a long subject line");
    }

    #[test]
    fn test_header_block_lookup() {
        let raw = b"From: a@b.com\r\nMessage-ID: <x@y>\r\n\r\nFrom: body line\r\n";
        let block = HeaderBlock::from_message(raw);
        assert_eq!(block.len(), 2);
        assert_eq!(block.get("message-id"), Some(&b"<x@y>"[..]));
        assert_eq!(block.get("FROM"), Some(&b"a@b.com"[..]));
    }

    #[test]
    fn test_find_header_end() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_extract_angle_brackets() {
        assert_eq!(
            extract_angle_bracket(" <msg001@example.com> "),
            "<msg001@example.com>"
        );
    }
}
