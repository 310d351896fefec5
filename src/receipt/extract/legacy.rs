//! Legacy HTML receipts: the whole receipt is one `<pre>` block of
//! `label：value` lines.

use std::sync::LazyLock;

use regex::Regex;

use super::{missing, to_amount, to_datetime, to_points, ExtractContext};
use crate::error::ExtractError;
use crate::model::receipt::{ReceiptRecord, Variant};

const V: Variant = Variant::HtmlLegacy;

/// Key/value separator (full-width colon).
const SEPARATOR: char = '：';

static PRE_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre[^>]*>(.+?)</pre>").expect("valid regex"));

/// Value after the separator on the first line containing `label`.
fn value_of<'a>(lines: &[&'a str], label: &str) -> Result<&'a str, ExtractError> {
    lines
        .iter()
        .find(|line| line.contains(label))
        .copied()
        .and_then(|line| line.split(SEPARATOR).nth(1))
        .map(str::trim)
        .ok_or_else(|| missing(V, label))
}

pub fn extract(body: &str, ctx: &ExtractContext<'_>) -> Result<ReceiptRecord, ExtractError> {
    let block = PRE_CONTENT
        .captures(body)
        .and_then(|caps| caps.get(1))
        .ok_or(ExtractError::MissingBlock(V))?
        .as_str();
    let lines: Vec<&str> = block.split('\n').collect();

    let datetime = to_datetime(V, "注文日", value_of(&lines, "注文日")?)?;
    let receipt_no = value_of(&lines, "注文番号")?.to_string();
    let store_name = value_of(&lines, "□利用店舗")?.to_string();
    let use_point = to_points(
        V,
        "ポイント利用",
        &value_of(&lines, "ポイント利用")?.replace("ポイント）", ""),
    )?;
    let total = to_amount(
        V,
        "合計金額",
        &value_of(&lines, "合計金額")?.replace("（円）", ""),
    )?;

    Ok(ReceiptRecord {
        datetime: Some(datetime),
        receipt_no: Some(receipt_no),
        store_name: Some(store_name),
        store_tel: None,
        use_point: Some(use_point),
        use_cash: None,
        total: Some(total),
        message_id: ctx.message_id.to_string(),
        variant: V,
        has_error: false,
    })
}
