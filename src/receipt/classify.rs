//! Scope test and layout variant selection.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::receipt::Variant;

/// Subject condition attached to a sender rule.
#[derive(Debug, Clone, Copy)]
pub enum SubjectRule {
    Contains(&'static str),
    Excludes(&'static str),
}

/// One row of the scope table: a sender substring plus a subject condition.
#[derive(Debug, Clone, Copy)]
pub struct SenderRule {
    pub sender: &'static str,
    pub subject: SubjectRule,
}

impl SenderRule {
    fn matches(&self, from: &str, subject: &str) -> bool {
        from.contains(self.sender)
            && match self.subject {
                SubjectRule::Contains(s) => subject.contains(s),
                SubjectRule::Excludes(s) => !subject.contains(s),
            }
    }
}

const CHECKOUT_SENDER: &str = "order@checkout.rakuten.co.jp";
const PAY_SENDER: &str = "no-reply@pay.rakuten.co.jp";

/// Messages from these senders are receipts; everything else is skipped.
pub const SCOPE_RULES: &[SenderRule] = &[
    SenderRule {
        // The same address also sends shipping notices.
        sender: CHECKOUT_SENDER,
        subject: SubjectRule::Excludes("発送完了"),
    },
    SenderRule {
        sender: PAY_SENDER,
        subject: SubjectRule::Contains("ご利用内容確認メール"),
    },
];

/// The "application completed" notice, laid out differently from other orders.
const ORDER_CONFIRM_RULE: SenderRule = SenderRule {
    sender: CHECKOUT_SENDER,
    subject: SubjectRule::Contains("お申込完了"),
};

/// Phrase found only in the 2018 HTML layout.
const HTML2018_KEYWORD: &str = "お客様のお申込情報を受けた時点で送信される自動配信メール";

static HTML_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html.*?>").expect("valid regex"));
static PRE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<pre.*?>").expect("valid regex"));

/// Whether a message with these decoded headers is a receipt at all.
pub fn is_in_scope(from: &str, subject: &str) -> bool {
    SCOPE_RULES.iter().any(|rule| rule.matches(from, subject))
}

pub fn is_order_confirm(from: &str, subject: &str) -> bool {
    ORDER_CONFIRM_RULE.matches(from, subject)
}

/// Pick the layout variant of a decoded body.
///
/// Check order is fixed: HTML root, 2018 keyword, order confirmation,
/// `<pre>` block, and finally the current HTML layout.
pub fn select_variant(body: &str, from: &str, subject: &str) -> Variant {
    if !HTML_ROOT.is_match(body) {
        Variant::PlainText
    } else if body.contains(HTML2018_KEYWORD) {
        Variant::Html2018
    } else if is_order_confirm(from, subject) {
        Variant::OrderConfirm
    } else if PRE_BLOCK.is_match(body) {
        Variant::HtmlLegacy
    } else {
        Variant::HtmlCurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_sender_in_scope() {
        let from = "楽天 <order@checkout.rakuten.co.jp>";
        assert!(is_in_scope(from, "【楽天ペイ】ご注文内容のご確認"));
        assert!(!is_in_scope(from, "【楽天】発送完了のお知らせ"));
    }

    #[test]
    fn test_pay_sender_requires_subject() {
        let from = "no-reply@pay.rakuten.co.jp";
        assert!(is_in_scope(from, "楽天ペイ ご利用内容確認メール"));
        assert!(!is_in_scope(from, "キャンペーンのお知らせ"));
    }

    #[test]
    fn test_unrelated_sender_out_of_scope() {
        assert!(!is_in_scope("friend@example.com", "ご利用内容確認メール"));
        assert!(!is_in_scope("", ""));
    }

    #[test]
    fn test_variant_check_order() {
        let from = "order@checkout.rakuten.co.jp";
        assert_eq!(select_variant("plain body", from, ""), Variant::PlainText);
        assert_eq!(
            select_variant("<HTML><body>x</body></HTML>", from, ""),
            Variant::HtmlCurrent
        );
        assert_eq!(
            select_variant("<html><pre>x</pre></html>", from, ""),
            Variant::HtmlLegacy
        );
        assert_eq!(
            select_variant("<html><pre>x</pre></html>", from, "お申込完了"),
            Variant::OrderConfirm
        );
        let body = format!("<html><pre>{HTML2018_KEYWORD}</pre></html>");
        assert_eq!(select_variant(&body, from, "お申込完了"), Variant::Html2018);
    }
}
