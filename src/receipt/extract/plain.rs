//! Plain-text receipts.
//!
//! The body is a list of `  LABEL  value` lines. Four dialects exist, told
//! apart by a label only that dialect uses. Markers are checked in [`DIALECT_MARKERS`]
//! order and the first hit wins: the dialects share label substrings, so the
//! order is significant.
//!
//! Unlike the HTML layouts, a missing required label does not fail the
//! extraction. The field is left empty and the record is flagged.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{to_amount, to_datetime, to_points, ExtractContext};
use crate::error::ExtractError;
use crate::model::receipt::{ReceiptRecord, Variant};

/// Plain-text receipt dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Regular store payment.
    Standard,
    /// Older receipts with a combined point/cash line and no cash line.
    Legacy,
    /// Tax and public utility payments.
    TaxPayment,
    /// Suica top-ups.
    SuicaCharge,
}

/// Label set of one dialect. `None` means the dialect never has that field.
#[derive(Debug)]
pub struct DialectLabels {
    pub datetime: &'static str,
    pub receipt_no: &'static str,
    pub store_name: &'static str,
    pub store_tel: Option<&'static str>,
    pub use_point: Option<&'static str>,
    pub use_cash: Option<&'static str>,
    pub total: &'static str,
}

/// Dialect markers, in precedence order. No hit means [`Dialect::Standard`].
pub const DIALECT_MARKERS: &[(&str, Dialect)] = &[
    ("ポイント／キャッシュ利用", Dialect::Legacy),
    ("納付先", Dialect::TaxPayment),
    ("チャージ金額", Dialect::SuicaCharge),
];

const STANDARD: DialectLabels = DialectLabels {
    datetime: "ご利用日時",
    receipt_no: "伝票番号",
    store_name: "ご利用店舗",
    store_tel: Some("電話番号"),
    use_point: Some("ポイント利用"),
    use_cash: Some("お支払金額"),
    total: "決済総額",
};

const LEGACY: DialectLabels = DialectLabels {
    use_point: Some("ポイント／キャッシュ利用"),
    use_cash: None,
    ..STANDARD
};

const TAX_PAYMENT: DialectLabels = DialectLabels {
    datetime: "ご利用日時",
    receipt_no: "納付番号",
    store_name: "納付先",
    store_tel: None,
    use_point: None,
    use_cash: Some("お支払金額"),
    total: "納付金額",
};

const SUICA_CHARGE: DialectLabels = DialectLabels {
    store_tel: None,
    total: "チャージ金額",
    ..STANDARD
};

impl Dialect {
    pub fn detect(body: &str) -> Self {
        DIALECT_MARKERS
            .iter()
            .find(|(marker, _)| body.contains(marker))
            .map_or(Self::Standard, |(_, dialect)| *dialect)
    }

    pub fn labels(self) -> &'static DialectLabels {
        match self {
            Self::Standard => &STANDARD,
            Self::Legacy => &LEGACY,
            Self::TaxPayment => &TAX_PAYMENT,
            Self::SuicaCharge => &SUICA_CHARGE,
        }
    }
}

/// `\s+LABEL\s+(.+)` for every label of every dialect.
static LABEL_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    [STANDARD, LEGACY, TAX_PAYMENT, SUICA_CHARGE]
        .iter()
        .flat_map(|l| {
            [
                Some(l.datetime),
                Some(l.receipt_no),
                Some(l.store_name),
                l.store_tel,
                l.use_point,
                l.use_cash,
                Some(l.total),
            ]
        })
        .flatten()
        .map(|label| {
            let pattern = format!(r"\s+{}\s+(.+)", regex::escape(label));
            (label, Regex::new(&pattern).expect("escaped label is a valid pattern"))
        })
        .collect()
});

/// Value of the first line matching `label`, trimmed.
fn find_value(lines: &[&str], label: &str) -> Option<String> {
    let re = LABEL_PATTERNS.get(label)?;
    lines
        .iter()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Line scanner that remembers whether a required label was missing.
struct Scanner<'a> {
    lines: Vec<&'a str>,
    message_id: &'a str,
    has_error: bool,
}

impl Scanner<'_> {
    fn required(&mut self, label: &str) -> Option<String> {
        let value = find_value(&self.lines, label);
        if value.is_none() {
            warn!(message_id = self.message_id, label, "PlainText: element not found");
            self.has_error = true;
        }
        value
    }

    fn optional(&self, label: Option<&str>) -> Option<String> {
        label.and_then(|l| find_value(&self.lines, l))
    }

    fn required_opt(&mut self, label: Option<&str>) -> Option<String> {
        label.and_then(|l| self.required(l))
    }
}

pub fn extract(body: &str, ctx: &ExtractContext<'_>) -> Result<ReceiptRecord, ExtractError> {
    const V: Variant = Variant::PlainText;

    let labels = Dialect::detect(body).labels();
    let mut scan = Scanner {
        lines: body.split('\n').collect(),
        message_id: ctx.message_id,
        has_error: false,
    };

    let datetime_raw = scan.required(labels.datetime);
    let receipt_no = scan.required(labels.receipt_no);
    let store_name = scan.required(labels.store_name);
    let store_tel = scan.optional(labels.store_tel);
    let point_raw = scan.required_opt(labels.use_point);
    let cash_raw = scan.required_opt(labels.use_cash);
    let total_raw = scan.required(labels.total);

    let datetime = datetime_raw
        .map(|v| to_datetime(V, labels.datetime, &v))
        .transpose()?;
    let use_point = match (labels.use_point, point_raw) {
        (Some(label), Some(v)) => Some(to_points(V, label, &v)?),
        _ => None,
    };
    let use_cash = match (labels.use_cash, cash_raw) {
        (Some(label), Some(v)) => Some(to_amount(V, label, &v)?),
        _ => None,
    };
    let total = total_raw.map(|v| to_amount(V, labels.total, &v)).transpose()?;

    Ok(ReceiptRecord {
        datetime,
        receipt_no,
        store_name,
        store_tel,
        use_point,
        use_cash,
        total,
        message_id: ctx.message_id.to_string(),
        variant: V,
        has_error: scan.has_error,
    })
}
