//! Value normalization shared by every extraction strategy.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// A weekday in full- or half-width parentheses, e.g. `（月）` or `(日)`.
static WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[（(][月火水木金土日][）)]").expect("valid regex"));

/// Characters dropped from money strings before parsing.
const MONEY_NOISE: &[char] = &[',', '，', '円', '¥', '￥', ' ', '\u{3000}'];

/// Date-time layouts seen in receipts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y年%m月%d日 %H:%M",
    "%Y年%m月%d日 %H時%M分",
];

/// Date-only layouts; the time defaults to midnight.
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y年%m月%d日"];

/// Parse a yen amount: `"1,234円"`, `"1,234 円"`, `"￥1,234"` → `1234`.
pub fn parse_yen(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| !MONEY_NOISE.contains(c)).collect();
    cleaned.trim().parse().ok()
}

/// Parse a point count: `"1,200ポイント"`, `"50 pt"` → integer.
pub fn parse_points(s: &str) -> Option<i64> {
    let cleaned = s.replace("ポイント", "").replace("pt", "");
    let cleaned: String = cleaned
        .chars()
        .filter(|c| *c != ',' && *c != '，' && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

/// Parse a receipt date-time, ignoring an embedded weekday token.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let without_weekday = WEEKDAY.replace_all(s, " ");
    let normalized = without_weekday.split_whitespace().collect::<Vec<_>>().join(" ");

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yen() {
        assert_eq!(parse_yen("1,234円"), Some(1234));
        assert_eq!(parse_yen("1,234 円"), Some(1234));
        assert_eq!(parse_yen("￥12，000"), Some(12000));
        assert_eq!(parse_yen(" 0 "), Some(0));
        assert_eq!(parse_yen("abc"), None);
        assert_eq!(parse_yen(""), None);
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("1,200ポイント"), Some(1200));
        assert_eq!(parse_points("50 pt"), Some(50));
        assert_eq!(parse_points("0"), Some(0));
        assert_eq!(parse_points("-"), None);
    }

    #[test]
    fn test_weekday_token_is_ignored() {
        let with = parse_datetime("2024/03/10(日) 12:34:56");
        let without = parse_datetime("2024/03/10 12:34:56");
        assert!(with.is_some());
        assert_eq!(with, without);

        let full_width = parse_datetime("2024年3月10日（日）12:34");
        assert_eq!(full_width, parse_datetime("2024年3月10日 12:34"));
    }

    #[test]
    fn test_datetime_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024/03/10 09:05"), Some(expected));
        assert_eq!(parse_datetime("2024-03-10 09:05:00"), Some(expected));
        assert_eq!(parse_datetime("2024年03月10日 09時05分"), Some(expected));
        assert_eq!(
            parse_datetime("2024/03/10"),
            Some(expected.date().and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }
}
