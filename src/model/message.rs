//! Decoded message and body part types.

/// A message with its headers decoded and its leaf body parts enumerated.
///
/// Body parts keep their raw (still transfer-encoded) payload; decoding a part
/// is deferred to [`crate::parser::mime::decode_part_text`] so that one broken
/// part never prevents the others from being tried.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The `Message-ID` header value, angle brackets included.
    pub message_id: String,
    /// Decoded `Subject`, empty when absent.
    pub subject: String,
    /// Decoded `From`, empty when absent.
    pub from: String,
    /// Decoded `To`, empty when absent.
    pub to: String,
    /// Whether the top-level content type is `multipart/*`.
    pub is_multipart: bool,
    /// Charset declared on the top-level `Content-Type`, if any.
    pub charset: Option<String>,
    /// Leaf body parts in document order.
    pub parts: Vec<BodyPart>,
}

impl DecodedMessage {
    /// Body parts whose content type is exactly `text/plain`, in document order.
    pub fn text_plain_parts(&self) -> impl Iterator<Item = &BodyPart> {
        self.parts.iter().filter(|p| p.is_text_plain())
    }
}

/// One leaf MIME part.
#[derive(Debug, Clone)]
pub struct BodyPart {
    /// Lower-cased `type/subtype`.
    pub content_type: String,
    /// Declared `charset` parameter.
    pub charset: Option<String>,
    /// Declared `Content-Transfer-Encoding`.
    pub transfer_encoding: Option<String>,
    /// Raw payload bytes, before transfer decoding.
    pub payload: Vec<u8>,
}

impl BodyPart {
    pub fn is_text_plain(&self) -> bool {
        self.content_type == "text/plain"
    }
}
