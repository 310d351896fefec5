//! MIME message decoding: header fields, multipart structure, and body part text.
//!
//! `mail-parser` provides the part tree and byte offsets. Header values are
//! decoded here instead, from the raw bytes, so that unlabelled 8-bit headers
//! go through the same legacy charset chain as bodies.

use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::debug;

use crate::error::{ReceiptError, Result};
use crate::model::message::{BodyPart, DecodedMessage};
use crate::parser::charset;
use crate::parser::header::{decode_header_lossy, HeaderBlock};
use crate::parser::transfer;

/// Parse a raw RFC 822 message into headers and leaf body parts.
///
/// Never fails on charset problems: undecodable header bytes are replaced.
/// Only a message `mail-parser` cannot make sense of at all is rejected.
pub fn decode_message(raw: &[u8]) -> Result<DecodedMessage> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ReceiptError::MalformedMessage("no parsable header section".into()))?;

    let root = parsed
        .parts
        .first()
        .ok_or_else(|| ReceiptError::MalformedMessage("message has no parts".into()))?;
    let is_multipart = matches!(root.body, PartType::Multipart(_));
    let charset = root
        .content_type()
        .and_then(|ct| ct.attribute("charset"))
        .map(|c| c.trim().to_string());

    let headers = HeaderBlock::from_message(raw);
    let field = |name: &str| {
        headers
            .get(name)
            .map(|v| decode_header_lossy(v, charset.as_deref()).trim().to_string())
            .unwrap_or_default()
    };
    let message_id = field("message-id");
    let subject = field("subject");
    let from = field("from");
    let to = field("to");

    let mut parts = Vec::new();
    for part in &parsed.parts {
        if matches!(part.body, PartType::Multipart(_) | PartType::Message(_)) {
            continue;
        }
        let (content_type, part_charset) = match part.content_type() {
            Some(ct) => (
                match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                }
                .to_ascii_lowercase(),
                ct.attribute("charset").map(|c| c.trim().to_string()),
            ),
            None => ("text/plain".to_string(), None),
        };
        let payload = raw
            .get(part.raw_body_offset()..part.raw_end_offset())
            .unwrap_or_default()
            .to_vec();
        parts.push(BodyPart {
            content_type,
            charset: part_charset,
            transfer_encoding: part
                .content_transfer_encoding()
                .map(|te| te.trim().to_ascii_lowercase()),
            payload,
        });
    }

    debug!(
        message_id = %message_id,
        multipart = is_multipart,
        parts = parts.len(),
        "Decoded message"
    );

    Ok(DecodedMessage {
        message_id,
        subject,
        from,
        to,
        is_multipart,
        charset,
        parts,
    })
}

/// Undo a part's transfer encoding, without touching its charset.
///
/// `7bit` goes through the quoted-printable decoder. Anything else, including
/// a missing header, is [`ReceiptError::UnsupportedTransferEncoding`].
pub fn decode_part_bytes(part: &BodyPart) -> Result<Vec<u8>> {
    match part.transfer_encoding.as_deref() {
        Some("base64") => transfer::decode_base64(&part.payload),
        Some("quoted-printable") | Some("7bit") => {
            Ok(transfer::decode_quoted_printable(&part.payload))
        }
        Some(other) => Err(ReceiptError::UnsupportedTransferEncoding(other.to_string())),
        None => Err(ReceiptError::UnsupportedTransferEncoding("<none>".into())),
    }
}

/// Decode a body part to text: transfer encoding first, then charset.
///
/// The charset step never fails; it walks the legacy fallback chain and ends
/// in a replacing decode.
pub fn decode_part_text(part: &BodyPart) -> Result<String> {
    let bytes = decode_part_bytes(part)?;
    Ok(charset::decode_labelled(&bytes, part.charset.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart(parts: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut msg = String::from(
            "From: sender@example.com\r\n\
             To: me@example.com\r\n\
             Subject: Test\r\n\
             Message-ID: <m1@example.com>\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"XX\"\r\n\r\n",
        );
        for (ctype, te, body) in parts {
            msg.push_str(&format!(
                "--XX\r\nContent-Type: {ctype}\r\nContent-Transfer-Encoding: {te}\r\n\r\n{body}\r\n"
            ));
        }
        msg.push_str("--XX--\r\n");
        msg.into_bytes()
    }

    #[test]
    fn test_decode_multipart_leaf_parts() {
        let raw = multipart(&[
            ("text/plain; charset=utf-8", "7bit", "first"),
            ("text/html; charset=utf-8", "7bit", "<html></html>"),
            ("text/plain; charset=utf-8", "base64", "c2Vjb25k"),
        ]);
        let msg = decode_message(&raw).unwrap();
        assert!(msg.is_multipart);
        assert_eq!(msg.message_id, "<m1@example.com>");
        assert_eq!(msg.subject, "Test");
        assert_eq!(msg.parts.len(), 3);

        let plain: Vec<_> = msg.text_plain_parts().collect();
        assert_eq!(plain.len(), 2);
        assert_eq!(decode_part_text(plain[0]).unwrap().trim(), "first");
        assert_eq!(decode_part_text(plain[1]).unwrap().trim(), "second");
    }

    #[test]
    fn test_single_part_message() {
        let raw = b"From: a@b.com\r\nSubject: hi\r\nContent-Type: text/plain\r\n\r\nbody\r\n";
        let msg = decode_message(raw).unwrap();
        assert!(!msg.is_multipart);
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.parts[0].content_type, "text/plain");
    }

    #[test]
    fn test_unsupported_transfer_encoding() {
        let part = BodyPart {
            content_type: "text/plain".into(),
            charset: None,
            transfer_encoding: Some("8bit".into()),
            payload: b"x".to_vec(),
        };
        assert!(matches!(
            decode_part_text(&part),
            Err(ReceiptError::UnsupportedTransferEncoding(_))
        ));

        let part = BodyPart {
            transfer_encoding: None,
            ..part
        };
        assert!(decode_part_text(&part).is_err());
    }

    #[test]
    fn test_shift_jis_body_with_wrong_label() {
        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode("決済総額");
        let part = BodyPart {
            content_type: "text/plain".into(),
            charset: Some("utf-8".into()),
            transfer_encoding: Some("7bit".into()),
            payload: sjis.into_owned(),
        };
        assert_eq!(decode_part_text(&part).unwrap(), "決済総額");
    }

    #[test]
    fn test_header_uses_body_charset_for_raw_bytes() {
        let (subject, _, _) = encoding_rs::SHIFT_JIS.encode("ご利用内容確認メール");
        let mut raw = b"From: no-reply@pay.rakuten.co.jp\r\nSubject: ".to_vec();
        raw.extend_from_slice(&subject);
        raw.extend_from_slice(
            b"\r\nContent-Type: text/plain; charset=Shift_JIS\r\n\
              Content-Transfer-Encoding: 7bit\r\n\r\nbody\r\n",
        );
        let msg = decode_message(&raw).unwrap();
        assert_eq!(msg.subject, "ご利用内容確認メール");
        assert_eq!(msg.charset.as_deref(), Some("Shift_JIS"));
    }
}
