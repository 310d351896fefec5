//! Extraction strategies, one per layout variant.
//!
//! Every strategy is a pure function of the decoded body. Failures are
//! returned as [`ExtractError`] values so the pipeline can move on to the
//! next candidate part.

pub mod html;
pub mod legacy;
pub mod plain;

use chrono::NaiveDateTime;

use crate::error::ExtractError;
use crate::model::receipt::{ReceiptRecord, Variant};
use crate::receipt::normalize;

/// Decoded header values an extraction call may need.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub message_id: &'a str,
    pub from: &'a str,
    pub subject: &'a str,
}

/// Run the strategy for `variant` over `body`.
pub fn extract(
    variant: Variant,
    body: &str,
    ctx: &ExtractContext<'_>,
) -> Result<ReceiptRecord, ExtractError> {
    match variant {
        Variant::PlainText => plain::extract(body, ctx),
        Variant::HtmlLegacy => legacy::extract(body, ctx),
        Variant::HtmlCurrent => html::extract(&html::CURRENT, body, ctx),
        Variant::Html2018 => html::extract(&html::APPLICATION_2018, body, ctx),
        Variant::OrderConfirm => html::extract(&html::ORDER_CONFIRM, body, ctx),
    }
}

fn to_amount(variant: Variant, label: &str, value: &str) -> Result<i64, ExtractError> {
    normalize::parse_yen(value).ok_or_else(|| ExtractError::InvalidAmount {
        variant,
        label: label.to_string(),
        value: value.to_string(),
    })
}

/// Point fields are sometimes written with a point suffix, sometimes as yen.
fn to_points(variant: Variant, label: &str, value: &str) -> Result<i64, ExtractError> {
    normalize::parse_points(value)
        .or_else(|| normalize::parse_yen(value))
        .ok_or_else(|| ExtractError::InvalidAmount {
            variant,
            label: label.to_string(),
            value: value.to_string(),
        })
}

fn to_datetime(variant: Variant, label: &str, value: &str) -> Result<NaiveDateTime, ExtractError> {
    normalize::parse_datetime(value).ok_or_else(|| ExtractError::InvalidDate {
        variant,
        label: label.to_string(),
        value: value.to_string(),
    })
}

fn missing(variant: Variant, label: &str) -> ExtractError {
    ExtractError::MissingField {
        variant,
        label: label.to_string(),
    }
}
