//! Value Cleaner
//!
//! 正規フィールドにリネーム・射影済みのテーブルに、フィールドごとのルールを適用する。

use log::debug;

use crate::error::XlsxToJsonError;
use crate::formatter::{parse_amount, CurrencyFormatter, DateFormatter};
use crate::reference::{FieldRule, NormalizationRuleSet};
use crate::types::{render_datetime, render_number, CellValue, NormalizedTable, SheetTable};

/// ルールに従ってセル値を整形するクリーナー
#[derive(Debug, Clone)]
pub struct Cleaner<'a> {
    rules: &'a NormalizationRuleSet,
    currency: CurrencyFormatter,
    dates: DateFormatter,
}

impl<'a> Cleaner<'a> {
    pub fn new(rules: &'a NormalizationRuleSet) -> Self {
        Self {
            rules,
            currency: CurrencyFormatter,
            dates: DateFormatter,
        }
    }

    /// すべてのセルが空の行を削除する
    ///
    /// # 戻り値
    ///
    /// 削除した行数
    pub fn remove_empty_rows(&self, table: &mut SheetTable) -> usize {
        table.retain_rows(|row| row.iter().any(|cell| !cell.is_blank()))
    }

    /// テーブル全体にルールを適用する
    ///
    /// 金額セルが解析できない場合、その時点でシート全体が失敗します。
    pub fn clean(&self, table: &SheetTable) -> Result<NormalizedTable, XlsxToJsonError> {
        let rules: Vec<Option<FieldRule>> = table
            .columns
            .iter()
            .map(|column| self.rules.rule_for(column))
            .collect();

        let mut rows = Vec::with_capacity(table.row_count());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let mut cleaned = Vec::with_capacity(row.len());
            for ((column, rule), cell) in table.columns.iter().zip(&rules).zip(row) {
                let value = self
                    .clean_value(*rule, cell)
                    .map_err(|reason| XlsxToJsonError::Value {
                        column: column.clone(),
                        row: table.row_number(row_idx),
                        value: cell.as_raw_string(),
                        reason,
                    })?;
                cleaned.push(value);
            }
            rows.push(cleaned);
        }

        debug!(
            "Cleaned {} rows across {} columns",
            rows.len(),
            table.column_count()
        );
        Ok(NormalizedTable::new(
            table.columns.clone(),
            rows,
            table.row_numbers.clone(),
        ))
    }

    /// 1つのセルを整形する
    ///
    /// 日付として解析できない値は`None`（欠損）になります。
    /// 空文字列は後段のnull変換で欠損として扱われます。
    pub fn clean_value(
        &self,
        rule: Option<FieldRule>,
        cell: &CellValue,
    ) -> Result<Option<String>, String> {
        match rule {
            Some(FieldRule::Text) | None => Ok(Some(trimmed(cell))),
            Some(FieldRule::Numeric) => self.clean_amount(cell).map(Some),
            Some(FieldRule::Date) => Ok(self.clean_date(cell)),
        }
    }

    fn clean_amount(&self, cell: &CellValue) -> Result<String, String> {
        match cell {
            CellValue::Empty => Ok(String::new()),
            CellValue::Text(s) if s.trim().is_empty() => Ok(String::new()),
            CellValue::Number(n) => Ok(self.currency.format(*n)),
            CellValue::Text(s) => parse_amount(s).map(|value| self.currency.format(value)),
            CellValue::Date(dt) => Err(format!("date '{}' is not an amount", render_datetime(dt))),
        }
    }

    fn clean_date(&self, cell: &CellValue) -> Option<String> {
        match cell {
            CellValue::Empty => None,
            CellValue::Date(dt) => Some(self.dates.format(dt.date())),
            CellValue::Number(n) => self
                .dates
                .from_excel_serial(*n)
                .map(|date| self.dates.format(date)),
            CellValue::Text(s) => self.dates.normalize(s),
        }
    }

    /// クリーニングを行わずに文字列化する
    ///
    /// ルールも空行の削除も適用しません。空セルは`None`になります。
    pub fn passthrough(table: &SheetTable) -> NormalizedTable {
        let rows = table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        CellValue::Empty => None,
                        other => Some(other.as_raw_string()),
                    })
                    .collect()
            })
            .collect();
        NormalizedTable::new(table.columns.clone(), rows, table.row_numbers.clone())
    }
}

fn trimmed(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => render_number(*n),
        CellValue::Date(dt) => render_datetime(dt),
        CellValue::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rules() -> NormalizationRuleSet {
        NormalizationRuleSet {
            text_fields: vec!["bank_name".to_string()],
            numeric_fields: vec!["amount".to_string()],
            date_fields: vec!["validity_date".to_string()],
            required_fields: None,
        }
    }

    fn table(rows: Vec<Vec<CellValue>>) -> SheetTable {
        SheetTable::new(
            vec![
                "bank_name".to_string(),
                "amount".to_string(),
                "validity_date".to_string(),
                "notes".to_string(),
            ],
            rows,
        )
    }

    #[test]
    fn test_clean_applies_field_rules() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        let input = table(vec![vec![
            CellValue::from("  Riyad Bank "),
            CellValue::from("125,000 SAR"),
            CellValue::from("2025/12/31"),
            CellValue::from("  keep me  "),
        ]]);

        let cleaned = cleaner.clean(&input).unwrap();
        assert_eq!(
            cleaned.rows()[0],
            vec![
                Some("Riyad Bank".to_string()),
                Some("١٢٥٬٠٠٠٫٠٠".to_string()),
                Some("2025-12-31".to_string()),
                Some("keep me".to_string()),
            ]
        );
    }

    #[test]
    fn test_text_rule_maps_empty_to_empty_string() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Text), &CellValue::Empty),
            Ok(Some(String::new()))
        );
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Text), &CellValue::Number(7788.0)),
            Ok(Some("7788".to_string()))
        );
    }

    #[test]
    fn test_invalid_amount_is_a_value_error() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        let input = table(vec![
            vec![
                CellValue::from("Riyad Bank"),
                CellValue::from("100"),
                CellValue::from("2025-01-01"),
                CellValue::Empty,
            ],
            vec![
                CellValue::from("Riyad Bank"),
                CellValue::from("one hundred"),
                CellValue::from("2025-01-01"),
                CellValue::Empty,
            ],
        ]);

        match cleaner.clean(&input) {
            Err(XlsxToJsonError::Value {
                column, row, value, ..
            }) => {
                assert_eq!(column, "amount");
                assert_eq!(row, 3);
                assert_eq!(value, "one hundred");
            }
            other => panic!("Expected Value error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_date_becomes_missing() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Date), &CellValue::from("soon")),
            Ok(None)
        );
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Date), &CellValue::Number(46022.0)),
            Ok(Some("2025-12-31".to_string()))
        );
        let dt = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Date), &CellValue::Date(dt)),
            Ok(Some("2026-03-01".to_string()))
        );
    }

    #[test]
    fn test_numeric_amount_cells() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Numeric), &CellValue::Number(1500.5)),
            Ok(Some("١٬٥٠٠٫٥٠".to_string()))
        );
        assert_eq!(
            cleaner.clean_value(Some(FieldRule::Numeric), &CellValue::Empty),
            Ok(Some(String::new()))
        );
    }

    #[test]
    fn test_remove_empty_rows() {
        let rules = rules();
        let cleaner = Cleaner::new(&rules);
        let mut input = table(vec![
            vec![CellValue::Empty, CellValue::from("  "), CellValue::Empty, CellValue::Empty],
            vec![
                CellValue::from("x"),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
            ],
        ]);
        assert_eq!(cleaner.remove_empty_rows(&mut input), 1);
        assert_eq!(input.row_count(), 1);
        assert_eq!(input.row_number(0), 3);
    }

    #[test]
    fn test_passthrough_keeps_raw_strings() {
        let input = table(vec![vec![
            CellValue::from(" Riyad Bank "),
            CellValue::Number(125000.0),
            CellValue::from("2025/12/31"),
            CellValue::Empty,
        ]]);
        let output = Cleaner::passthrough(&input);
        assert_eq!(
            output.rows()[0],
            vec![
                Some(" Riyad Bank ".to_string()),
                Some("125000".to_string()),
                Some("2025/12/31".to_string()),
                None,
            ]
        );
    }
}
