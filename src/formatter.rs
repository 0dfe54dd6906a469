//! Value Formatter Module
//!
//! セル値の整形に使う基本関数を提供するモジュール。
//! 通貨文字列の解析とアラビア数字表示への整形、日付の寛容な解析と
//! `YYYY-MM-DD`への整形、Excelシリアル日付の変換を担当します。

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// アラビア・インド数字（U+0660〜U+0669）
const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// アラビア語の桁区切り記号
pub const ARABIC_THOUSANDS_SEPARATOR: char = '٬';

/// アラビア語の小数点
pub const ARABIC_DECIMAL_SEPARATOR: char = '٫';

/// 金額から取り除く通貨記号
const CURRENCY_MARKERS: &[&str] = &["SAR", "ريال"];

/// 日付として受け付ける書式（試行順）
///
/// 日と月の順が曖昧な場合は月を先に読みます（`01/02/2025` → 1月2日）。
/// 月として読めない場合（`31/12/2025`）だけ日が先の書式で読みます。
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y",
    "%d.%m.%Y", "%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y",
];

/// 日時として受け付ける書式（試行順）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// アラビア・インド数字をASCII数字に変換する
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match ARABIC_INDIC_DIGITS.iter().position(|&d| d == c) {
            Some(pos) => char::from(b'0' + pos as u8),
            None => c,
        })
        .collect()
}

/// ASCII数字をアラビア・インド数字に変換する
pub fn to_arabic_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(digit) if c.is_ascii_digit() => ARABIC_INDIC_DIGITS[digit as usize],
            _ => c,
        })
        .collect()
}

/// 金額文字列から区切り記号・通貨記号を取り除き、ASCIIの数値表記にする
///
/// 桁区切り（`,` `٬`）と通貨記号を削除し、`٫`を`.`に、アラビア・インド数字をASCIIに変換します。
pub fn strip_amount_text(text: &str) -> String {
    let mut cleaned = text.trim().replace([',', ARABIC_THOUSANDS_SEPARATOR], "");
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let cleaned = cleaned.replace(ARABIC_DECIMAL_SEPARATOR, ".");
    to_ascii_digits(cleaned.trim())
}

/// 金額文字列を数値として解析する
///
/// # 戻り値
///
/// * `Ok(f64)` - 解析に成功した場合
/// * `Err(String)` - 残った文字列が数値として読めない場合（理由のメッセージ）
pub fn parse_amount(text: &str) -> Result<f64, String> {
    let cleaned = strip_amount_text(text);
    if cleaned.is_empty() {
        return Err("amount is empty".to_string());
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("'{}' is not a number", cleaned)),
    }
}

/// 通貨フォーマッター
///
/// 数値を小数点以下2桁・3桁区切りで整形し、桁区切り・小数点・数字をすべて
/// アラビア語の表示形式にします（例: `125000` → `١٢٥٬٠٠٠٫٠٠`）。
///
/// 出力はそのまま`f64`として解析できません。数値に戻すには[`parse_amount`]で
/// 逆変換が必要です。
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyFormatter;

impl CurrencyFormatter {
    /// 数値をラテン文字の表記で整形する（`125,000.00`）
    pub fn format_latin(&self, value: f64) -> String {
        let fixed = format!("{:.2}", value.abs());
        let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
        for (idx, digit) in integer.chars().enumerate() {
            if idx > 0 && (integer.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
            "-"
        } else {
            ""
        };
        format!("{}{}.{}", sign, grouped, fraction)
    }

    /// 数値をアラビア語の表示形式で整形する
    pub fn format(&self, value: f64) -> String {
        let latin = self
            .format_latin(value)
            .replace(',', &ARABIC_THOUSANDS_SEPARATOR.to_string())
            .replace('.', &ARABIC_DECIMAL_SEPARATOR.to_string());
        to_arabic_digits(&latin)
    }
}

/// 日付フォーマッター
///
/// 文字列・Excelシリアル値・ネイティブ日付を`YYYY-MM-DD`に整形します。
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatter;

impl DateFormatter {
    /// 文字列を寛容に日付として解析する
    ///
    /// ISO形式、スラッシュ区切り、ダッシュ区切りなどを受け付けます。
    /// 時刻が付いている場合は日付部分のみを使います。アラビア・インド数字も受け付けます。
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let text = to_ascii_digits(text.trim());
        if text.is_empty() {
            return None;
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
                return Some(date);
            }
        }
        for format in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(&text, format) {
                return Some(datetime.date());
            }
        }
        if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(&text) {
            return Some(datetime.date_naive());
        }

        // 末尾に時刻などが続く場合は先頭のトークンで再試行
        let head = text.split([' ', 'T']).next().unwrap_or_default();
        if head.len() < text.len() {
            return DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(head, format).ok());
        }
        None
    }

    /// Excelのシリアル日付値を日付に変換する（1900年システム）
    ///
    /// 1899年12月30日起算です。Excelの1900年うるう年バグにより、
    /// 60以下のシリアル値は実際の日付と1日ずれますが、補正は行いません。
    pub fn from_excel_serial(&self, serial: f64) -> Option<NaiveDate> {
        if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
            return None;
        }
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        epoch.checked_add_signed(Duration::days(serial.floor() as i64))
    }

    /// 日付を`YYYY-MM-DD`形式にする
    pub fn format(&self, date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// 文字列を解析して整形する（解析できない場合は`None`）
    pub fn normalize(&self, text: &str) -> Option<String> {
        self.parse(text).map(|date| self.format(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_digit_translation() {
        assert_eq!(to_ascii_digits("١٢٣abc"), "123abc");
        assert_eq!(to_arabic_digits("2025-12"), "٢٠٢٥-١٢");
        assert_eq!(to_ascii_digits(&to_arabic_digits("0123456789")), "0123456789");
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("125000"), Ok(125000.0));
        assert_eq!(parse_amount("125,000.50 SAR"), Ok(125000.5));
        assert_eq!(parse_amount("١٢٥٬٠٠٠٫٥٠ ريال"), Ok(125000.5));
        assert_eq!(parse_amount(" -42 "), Ok(-42.0));
    }

    #[test]
    fn test_parse_amount_rejects_text() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("SAR").is_err());
        assert!(parse_amount("12 345 67x").is_err());
    }

    #[test]
    fn test_currency_format_latin() {
        let formatter = CurrencyFormatter;
        assert_eq!(formatter.format_latin(125000.0), "125,000.00");
        assert_eq!(formatter.format_latin(999.999), "1,000.00");
        assert_eq!(formatter.format_latin(12.5), "12.50");
        assert_eq!(formatter.format_latin(-1234567.891), "-1,234,567.89");
        assert_eq!(formatter.format_latin(-0.001), "0.00");
    }

    #[test]
    fn test_currency_format_arabic() {
        let formatter = CurrencyFormatter;
        assert_eq!(formatter.format(125000.0), "١٢٥٬٠٠٠٫٠٠");
        assert_eq!(formatter.format(0.0), "٠٫٠٠");
    }

    #[test]
    fn test_currency_output_needs_reverse_translation() {
        let formatted = CurrencyFormatter.format(125000.0);
        // 標準の数値解析では読めない
        assert!(formatted.parse::<f64>().is_err());
        // 逆変換すれば元の値に戻る
        assert_eq!(parse_amount(&formatted), Ok(125000.0));
        // 文字列として再整形しても同じ文字列にはならない（入力として扱えない）
        assert_ne!(formatted, "125000");
    }

    #[test]
    fn test_date_parse_formats() {
        let formatter = DateFormatter;
        assert_eq!(formatter.normalize("2025/12/31").as_deref(), Some("2025-12-31"));
        assert_eq!(formatter.normalize("2025-12-31").as_deref(), Some("2025-12-31"));
        assert_eq!(formatter.normalize("31/12/2025").as_deref(), Some("2025-12-31"));
        assert_eq!(formatter.normalize("31-12-2025").as_deref(), Some("2025-12-31"));
        assert_eq!(
            formatter.normalize("2025-12-31 10:30:00").as_deref(),
            Some("2025-12-31")
        );
        assert_eq!(
            formatter.normalize("2025-12-31T10:30:00Z").as_deref(),
            Some("2025-12-31")
        );
        assert_eq!(formatter.normalize("٢٠٢٥/١٢/٣١").as_deref(), Some("2025-12-31"));
    }

    #[test]
    fn test_ambiguous_date_is_month_first() {
        let formatter = DateFormatter;
        assert_eq!(formatter.normalize("01/02/2025").as_deref(), Some("2025-01-02"));
        assert_eq!(formatter.normalize("01-02-2025").as_deref(), Some("2025-01-02"));
        assert_eq!(
            formatter.normalize("03/04/2025 08:00:00").as_deref(),
            Some("2025-03-04")
        );
        // 月として読めない場合は日が先
        assert_eq!(formatter.normalize("13/02/2025").as_deref(), Some("2025-02-13"));
    }

    #[test]
    fn test_date_parse_rejects_garbage() {
        let formatter = DateFormatter;
        assert_eq!(formatter.normalize("not a date"), None);
        assert_eq!(formatter.normalize(""), None);
        assert_eq!(formatter.normalize("2025/13/45"), None);
    }

    #[test]
    fn test_excel_serial_dates() {
        let formatter = DateFormatter;
        assert_eq!(
            formatter.from_excel_serial(45658.0),
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(
            formatter.from_excel_serial(46022.75),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert_eq!(formatter.from_excel_serial(0.0), None);
        assert_eq!(formatter.from_excel_serial(f64::NAN), None);
    }

    proptest! {
        #[test]
        fn prop_currency_format_is_deterministic(value in -1.0e12f64..1.0e12f64) {
            let formatter = CurrencyFormatter;
            prop_assert_eq!(formatter.format(value), formatter.format(value));
        }

        #[test]
        fn prop_currency_format_reparses_to_rounded_value(cents in -1_000_000_000i64..1_000_000_000i64) {
            let value = cents as f64 / 100.0;
            let formatted = CurrencyFormatter.format(value);
            let reparsed = parse_amount(&formatted).unwrap();
            prop_assert!((reparsed - value).abs() < 0.005);
        }

        #[test]
        fn prop_iso_dates_normalize_to_themselves(days in 0i64..60_000) {
            let date = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap() + Duration::days(days);
            let iso = date.format("%Y-%m-%d").to_string();
            let slashed = date.format("%Y/%m/%d").to_string();
            prop_assert_eq!(DateFormatter.normalize(&iso), Some(iso.clone()));
            prop_assert_eq!(DateFormatter.normalize(&slashed), Some(iso));
        }
    }
}
