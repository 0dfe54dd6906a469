//! Validator
//!
//! シート全体に対する業務上の不変条件のチェック。
//! 1行でも違反があればシート全体の変換が失敗します（行単位のスキップはしない）。

use crate::error::ValidationFailure;
use crate::formatter::{parse_amount, DateFormatter};
use crate::pipeline::{AMOUNT_FIELD, VALIDITY_DATE_FIELD};
use crate::types::NormalizedTable;

/// バリデーター
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    required: &'a [String],
}

impl<'a> Validator<'a> {
    pub fn new(required: &'a [String]) -> Self {
        Self { required }
    }

    /// 必須の正規フィールドがすべて列集合に含まれているか
    pub fn ensure_required_columns(&self, columns: &[&str]) -> Result<(), ValidationFailure> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|field| !columns.contains(&field.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::MissingColumns(missing))
        }
    }

    /// 必須フィールドに欠損値がないか
    pub fn validate_required_values(&self, table: &NormalizedTable) -> Result<(), ValidationFailure> {
        let columns: Vec<String> = self
            .required
            .iter()
            .filter(|field| {
                table
                    .column_index(field)
                    .map(|idx| table.column_values(idx).any(|value| value.is_none()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        if columns.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::MissingValues { columns })
        }
    }

    /// `amount`列（存在する場合）の値が空でなく、数値として読めるか
    pub fn validate_amounts(&self, table: &NormalizedTable) -> Result<(), ValidationFailure> {
        let Some(idx) = table.column_index(AMOUNT_FIELD) else {
            return Ok(());
        };
        for (row_idx, value) in table.column_values(idx).enumerate() {
            let valid = value.map(|v| parse_amount(v).is_ok()).unwrap_or(false);
            if !valid {
                return Err(ValidationFailure::InvalidAmount {
                    row: table.row_number(row_idx),
                });
            }
        }
        Ok(())
    }

    /// `validity_date`列（存在する場合）の値がすべて日付として読めるか
    pub fn validate_dates(&self, table: &NormalizedTable) -> Result<(), ValidationFailure> {
        let Some(idx) = table.column_index(VALIDITY_DATE_FIELD) else {
            return Ok(());
        };
        let dates = DateFormatter;
        let rows: Vec<usize> = table
            .column_values(idx)
            .enumerate()
            .filter(|(_, value)| value.and_then(|v| dates.parse(v)).is_none())
            .map(|(row_idx, _)| table.row_number(row_idx))
            .collect();

        if rows.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::InvalidDates { rows })
        }
    }

    /// クリーニング後のテーブル全体を検証する
    ///
    /// 必須値 → 日付 → 金額の順にチェックし、最初の失敗を返します。
    pub fn validate(&self, table: &NormalizedTable) -> Result<(), ValidationFailure> {
        self.validate_required_values(table)?;
        self.validate_dates(table)?;
        self.validate_amounts(table)
    }
}
