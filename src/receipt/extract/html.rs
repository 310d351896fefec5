//! Table-based HTML receipts (current, 2018 and order-confirmation layouts).
//!
//! Each field is found through an anchor: the first text node containing the
//! label. The value is the text of the node two siblings to the right of
//! the anchor's cell (`Hop::Cell`) or of the anchor's row element
//! (`Hop::Row`). Sibling positions count whitespace text nodes, so the
//! "two to the right" skips the whitespace between two cells.
//!
//! Any missing anchor or sibling fails the extraction immediately.

use scraper::{ElementRef, Html};

use super::{missing, to_amount, to_datetime, to_points, ExtractContext};
use crate::error::ExtractError;
use crate::model::receipt::{ReceiptRecord, Variant};

/// How far up the tree to climb from the label text before moving right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// Label text → its element → that element's parent.
    Row,
    /// Label text → its element.
    Cell,
}

/// Where a field's label sits. Any of `labels` may match.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub labels: &'static [&'static str],
    pub hop: Hop,
}

impl Anchor {
    const fn row(label: &'static [&'static str]) -> Self {
        Self {
            labels: label,
            hop: Hop::Row,
        }
    }

    const fn cell(label: &'static [&'static str]) -> Self {
        Self {
            labels: label,
            hop: Hop::Cell,
        }
    }

    fn name(&self) -> String {
        self.labels.join("|")
    }
}

/// Source of the total amount.
#[derive(Debug, Clone, Copy)]
pub enum TotalSource {
    /// The layout carries no total.
    Absent,
    /// The total equals the point usage value.
    SameAsPoints,
    Anchor(Anchor),
}

/// Anchor set of one HTML layout.
#[derive(Debug)]
pub struct HtmlLayout {
    pub variant: Variant,
    pub datetime: Anchor,
    pub receipt_no: Anchor,
    pub store_name: Anchor,
    pub use_point: Anchor,
    pub total: TotalSource,
}

pub const CURRENT: HtmlLayout = HtmlLayout {
    variant: Variant::HtmlCurrent,
    datetime: Anchor::row(&["ご注文日："]),
    receipt_no: Anchor::row(&["ご注文番号："]),
    store_name: Anchor::row(&["ご利用サイト："]),
    use_point: Anchor::cell(&["ポイント利用：", "ポイント/キャッシュ利用："]),
    total: TotalSource::Anchor(Anchor::cell(&["小計："])),
};

pub const APPLICATION_2018: HtmlLayout = HtmlLayout {
    variant: Variant::Html2018,
    datetime: Anchor::row(&["お申込日："]),
    receipt_no: Anchor::row(&["お申込番号："]),
    store_name: Anchor::row(&["ご利用サイト："]),
    use_point: Anchor::cell(&["ポイント利用上限："]),
    total: TotalSource::Absent,
};

pub const ORDER_CONFIRM: HtmlLayout = HtmlLayout {
    variant: Variant::OrderConfirm,
    datetime: Anchor::row(&["お申込日："]),
    receipt_no: Anchor::row(&["お申込番号："]),
    // The applicant stands in for the store.
    store_name: Anchor::row(&["お申込者名："]),
    use_point: Anchor::cell(&["ポイント/キャッシュ利用上限："]),
    total: TotalSource::SameAsPoints,
};

/// Parsed document with anchor lookup.
struct Document {
    html: Html,
}

impl Document {
    fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// Trimmed text of the value node for `anchor`, if the whole path exists.
    fn value(&self, anchor: &Anchor) -> Option<String> {
        let label = self.html.tree.root().descendants().find(|node| {
            node.value()
                .as_text()
                .is_some_and(|text| anchor.labels.iter().any(|l| text.contains(l)))
        })?;

        let mut base = label.parent()?;
        if anchor.hop == Hop::Row {
            base = base.parent()?;
        }
        let target = base.next_sibling()?.next_sibling()?;

        let text = match target.value().as_text() {
            Some(text) => text.to_string(),
            None => ElementRef::wrap(target)?.text().collect::<String>(),
        };
        Some(text.trim().to_string())
    }

    fn require(&self, variant: Variant, anchor: &Anchor) -> Result<String, ExtractError> {
        self.value(anchor)
            .ok_or_else(|| missing(variant, &anchor.name()))
    }
}

pub fn extract(
    layout: &HtmlLayout,
    body: &str,
    ctx: &ExtractContext<'_>,
) -> Result<ReceiptRecord, ExtractError> {
    let v = layout.variant;
    let doc = Document::parse(body);

    let datetime_raw = doc.require(v, &layout.datetime)?;
    let datetime = to_datetime(v, &layout.datetime.name(), &datetime_raw)?;
    let receipt_no = doc.require(v, &layout.receipt_no)?;
    let store_name = doc.require(v, &layout.store_name)?;
    let point_raw = doc.require(v, &layout.use_point)?;
    let use_point = to_points(v, &layout.use_point.name(), &point_raw)?;
    let total = match layout.total {
        TotalSource::Absent => None,
        TotalSource::SameAsPoints => Some(use_point),
        TotalSource::Anchor(anchor) => {
            let raw = doc.require(v, &anchor)?;
            Some(to_amount(v, &anchor.name(), &raw)?)
        }
    };

    Ok(ReceiptRecord {
        datetime: Some(datetime),
        receipt_no: Some(receipt_no),
        store_name: Some(store_name),
        store_tel: None,
        use_point: Some(use_point),
        use_cash: None,
        total,
        message_id: ctx.message_id.to_string(),
        variant: v,
        has_error: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: ExtractContext<'static> = ExtractContext {
        message_id: "<html@example.com>",
        from: "order@checkout.rakuten.co.jp",
        subject: "【楽天ペイ】ご注文内容のご確認",
    };

    fn row(label: &str, value: &str) -> String {
        format!("<tr><td><span>{label}</span></td>\n<td>{value}</td></tr>\n")
    }

    fn cell(label: &str, value: &str) -> String {
        format!("<tr><td>{label}</td>\n<td><b>{value}</b></td></tr>\n")
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><table>\n{}</table></body></html>",
            rows.concat()
        )
    }

    #[test]
    fn test_current_layout() {
        let body = page(&[
            row("ご注文日：", "2024/03/10(日) 12:34"),
            row("ご注文番号：", "ORD-42"),
            row("ご利用サイト：", "楽天市場"),
            cell("ポイント利用：", "200ポイント"),
            cell("小計：", "3,980円"),
        ]);
        let rec = extract(&CURRENT, &body, &CTX).unwrap();
        assert_eq!(rec.datetime_display(), "2024-03-10 12:34:00");
        assert_eq!(rec.receipt_no.as_deref(), Some("ORD-42"));
        assert_eq!(rec.store_name.as_deref(), Some("楽天市場"));
        assert_eq!(rec.use_point, Some(200));
        assert_eq!(rec.total, Some(3980));
        assert_eq!(rec.use_cash, None);
        assert_eq!(rec.variant, Variant::HtmlCurrent);
    }

    #[test]
    fn test_current_layout_point_cash_label() {
        let body = page(&[
            row("ご注文日：", "2024/03/10 12:34"),
            row("ご注文番号：", "ORD-43"),
            row("ご利用サイト：", "楽天ブックス"),
            cell("ポイント/キャッシュ利用：", "0"),
            cell("小計：", "1,000円"),
        ]);
        let rec = extract(&CURRENT, &body, &CTX).unwrap();
        assert_eq!(rec.use_point, Some(0));
        assert_eq!(rec.total, Some(1000));
    }

    #[test]
    fn test_missing_anchor_raises() {
        let body = page(&[
            row("ご注文日：", "2024/03/10 12:34"),
            row("ご注文番号：", "ORD-42"),
        ]);
        match extract(&CURRENT, &body, &CTX) {
            Err(ExtractError::MissingField { variant, label }) => {
                assert_eq!(variant, Variant::HtmlCurrent);
                assert_eq!(label, "ご利用サイト：");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_html2018_has_no_total() {
        let body = page(&[
            row("お申込日：", "2018/11/02 08:00"),
            row("お申込番号：", "APP-1"),
            row("ご利用サイト：", "楽天トラベル"),
            cell("ポイント利用上限：", "1,500ポイント"),
        ]);
        let rec = extract(&APPLICATION_2018, &body, &CTX).unwrap();
        assert_eq!(rec.use_point, Some(1500));
        assert_eq!(rec.total, None);
        assert_eq!(rec.use_cash, None);
    }

    #[test]
    fn test_order_confirm_total_equals_points() {
        let body = page(&[
            row("お申込日：", "2020/01/15 19:20"),
            row("お申込番号：", "APP-2"),
            row("お申込者名：", "楽天 太郎"),
            cell("ポイント/キャッシュ利用上限：", "2,000円"),
        ]);
        let rec = extract(&ORDER_CONFIRM, &body, &CTX).unwrap();
        assert_eq!(rec.store_name.as_deref(), Some("楽天 太郎"));
        assert_eq!(rec.use_point, Some(2000));
        assert_eq!(rec.total, Some(2000));
    }

    #[test]
    fn test_invalid_date_raises() {
        let body = page(&[
            row("ご注文日：", "近日"),
            row("ご注文番号：", "ORD-42"),
            row("ご利用サイト：", "楽天市場"),
            cell("ポイント利用：", "0"),
            cell("小計：", "1円"),
        ]);
        assert!(matches!(
            extract(&CURRENT, &body, &CTX),
            Err(ExtractError::InvalidDate { .. })
        ));
    }
}
