//! Per-message pipeline: scope test, structure check, and candidate parts.
//!
//! ```text
//! NotYetScoped ──out of scope──▶ Skipped
//!      │
//!      ├──not multipart──▶ NotMultipartError
//!      │
//!      ▼
//! TryingParts ──a part succeeds──▶ Recognized(record)
//!      │
//!      └──all parts failed──▶ UnrecognizedFormatError(traces)
//! ```
//!
//! Each text/plain part is one attempt. A failed attempt becomes a trace and
//! the next part is tried; the traces only surface once every part failed.

use std::fmt;

use tracing::debug;

use crate::error::{ExtractError, MessageError, NotMultipartError, UnrecognizedFormatError};
use crate::model::message::{BodyPart, DecodedMessage};
use crate::model::receipt::{ReceiptRecord, Variant};
use crate::parser::mime;
use crate::receipt::classify;
use crate::receipt::extract::{self, ExtractContext};

/// Trace recorded when a multipart message has no text/plain part to try.
const NO_CANDIDATE_PARTS: &str = "no text/plain parts";

/// Terminal state of a message that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Not a receipt; nothing to report.
    Skipped,
    /// A record was extracted (possibly flagged as partial).
    Recognized(ReceiptRecord),
}

/// One failed extraction attempt on one body part.
#[derive(Debug)]
pub struct PartAttempt {
    /// Position among the message's text/plain parts, from 0.
    pub index: usize,
    /// Layout chosen for the part; `None` when the part could not be decoded.
    pub variant: Option<Variant>,
    pub error: ExtractError,
    /// Decoded body, kept for the diagnostic dump.
    pub body: Option<String>,
}

impl fmt::Display for PartAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[part {}] ", self.index)?;
        if let Some(variant) = self.variant {
            write!(f, "{variant}: ")?;
        }
        write!(f, "{}", self.error)?;
        if let Some(body) = &self.body {
            write!(f, "\n{body}")?;
        }
        Ok(())
    }
}

/// Decode a raw message and run it through the pipeline.
pub fn process_message(raw: &[u8]) -> Result<MessageOutcome, MessageError> {
    let msg = mime::decode_message(raw)?;
    process_decoded(&msg)
}

/// Run an already decoded message through the pipeline.
pub fn process_decoded(msg: &DecodedMessage) -> Result<MessageOutcome, MessageError> {
    if !classify::is_in_scope(&msg.from, &msg.subject) {
        debug!(message_id = %msg.message_id, "Out of scope, skipped");
        return Ok(MessageOutcome::Skipped);
    }
    if !msg.is_multipart {
        return Err(NotMultipartError {
            message_id: msg.message_id.clone(),
            from: msg.from.clone(),
            subject: msg.subject.clone(),
        }
        .into());
    }

    let ctx = ExtractContext {
        message_id: &msg.message_id,
        from: &msg.from,
        subject: &msg.subject,
    };

    let mut traces = Vec::new();
    for (index, part) in msg.text_plain_parts().enumerate() {
        match try_part(index, part, &ctx) {
            Ok(record) => {
                debug!(
                    message_id = %msg.message_id,
                    part = index,
                    variant = %record.variant,
                    partial = record.has_error,
                    "Recognized"
                );
                return Ok(MessageOutcome::Recognized(record));
            }
            Err(attempt) => {
                debug!(message_id = %msg.message_id, part = index, error = %attempt.error, "Attempt failed");
                traces.push(attempt.to_string());
            }
        }
    }

    if traces.is_empty() {
        traces.push(NO_CANDIDATE_PARTS.to_string());
    }

    Err(UnrecognizedFormatError {
        traces,
        message_id: msg.message_id.clone(),
        from: msg.from.clone(),
        subject: msg.subject.clone(),
    }
    .into())
}

/// Decode one part, pick its layout and extract.
fn try_part(
    index: usize,
    part: &BodyPart,
    ctx: &ExtractContext<'_>,
) -> Result<ReceiptRecord, PartAttempt> {
    let body = mime::decode_part_text(part).map_err(|e| PartAttempt {
        index,
        variant: None,
        error: e.into(),
        body: None,
    })?;

    let variant = classify::select_variant(&body, ctx.from, ctx.subject);
    extract::extract(variant, &body, ctx).map_err(|error| PartAttempt {
        index,
        variant: Some(variant),
        error,
        body: Some(body.clone()),
    })
}
