//! Receipt record and layout variant.

use std::fmt;

use chrono::NaiveDateTime;

/// Historical layout of a receipt body.
///
/// Assigned once by the classifier and consumed by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Variant {
    /// Line-oriented plain text (several dialects, see `receipt::extract::plain`).
    PlainText,
    /// HTML wrapping a single `<pre>` block.
    HtmlLegacy,
    /// Table-based HTML with label cells.
    HtmlCurrent,
    /// HTML application notice sent on receipt of an application.
    Html2018,
    /// HTML "application completed" notice.
    OrderConfirm,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlainText => "PlainText",
            Self::HtmlLegacy => "HtmlLegacy",
            Self::HtmlCurrent => "HtmlCurrent",
            Self::Html2018 => "Html2018",
            Self::OrderConfirm => "OrderConfirm",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical, normalized representation of one payment receipt.
///
/// Built once at the end of a single extraction call and never mutated
/// afterwards. Which optional fields are populated depends on the source
/// variant (e.g. `Html2018` never carries cash or total).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReceiptRecord {
    /// Payment (or application) date-time, local wall-clock time.
    pub datetime: Option<NaiveDateTime>,
    /// Receipt, order or application number.
    pub receipt_no: Option<String>,
    /// Store, site, payee or applicant name.
    pub store_name: Option<String>,
    /// Store telephone number (plain-text receipts only).
    pub store_tel: Option<String>,
    /// Points used, in points.
    pub use_point: Option<i64>,
    /// Cash used, in yen.
    pub use_cash: Option<i64>,
    /// Total amount, in yen.
    pub total: Option<i64>,
    /// `Message-ID` of the source message.
    pub message_id: String,
    /// Layout the record was extracted from.
    pub variant: Variant,
    /// Set when a required field could not be resolved but a record was still produced.
    pub has_error: bool,
}

impl ReceiptRecord {
    /// Column names of the flat output schema, in order.
    pub const COLUMNS: [&'static str; 8] = [
        "DateTime",
        "ReceiptNo",
        "Store",
        "Tel",
        "UsePoint",
        "UseCache",
        "Total",
        "Message-Id",
    ];

    /// Format the date-time the way the output sink expects it.
    pub fn datetime_display(&self) -> String {
        self.datetime
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for ReceiptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(|x| x.to_string()).unwrap_or_default()
        }
        write!(
            f,
            "DateTime: {} / Total: {} / Point: {} / Cash: {} / ReceiptNo: {} / Store: {} / Tel: {}",
            self.datetime_display(),
            opt(&self.total),
            opt(&self.use_point),
            opt(&self.use_cash),
            opt(&self.receipt_no),
            opt(&self.store_name),
            opt(&self.store_tel),
        )
    }
}
