//! Workbook Reader
//!
//! calamineのラッパーとして、シートの選択とセル値の読み出しを提供します。
//! 使用範囲の1行目をヘッダー行として扱います。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use log::debug;
use std::io::Cursor;

use crate::api::SheetSelector;
use crate::error::XlsxToJsonError;
use crate::security::SecurityConfig;
use crate::types::{CellValue, SheetTable};

/// ワークブックリーダー
///
/// 入力はメモリ上のバイト列です（xlsx / xlsを自動判別）。
pub(crate) struct WorkbookReader {
    workbook: Sheets<Cursor<Vec<u8>>>,
}

impl WorkbookReader {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `bytes` - ワークブックのバイト列
    /// * `security` - サイズ上限を含むセキュリティ設定
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReader)` - 読み込みに成功した場合
    /// * `Err(XlsxToJsonError::SecurityViolation)` - サイズ上限を超えた場合
    /// * `Err(XlsxToJsonError::Parse)` - ワークブックとして解釈できない場合
    pub fn open(bytes: Vec<u8>, security: &SecurityConfig) -> Result<Self, XlsxToJsonError> {
        security.check_input_size(bytes.len())?;
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Self { workbook })
    }

    /// すべてのシート名（ブック内の順）
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シート選択方式に基づいてシートを選択
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 選択されたシート名のリスト
    /// * `Err(XlsxToJsonError::Input)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheets(&self, selector: &SheetSelector) -> Result<Vec<String>, XlsxToJsonError> {
        let names = self.sheet_names();
        if names.is_empty() {
            return Err(XlsxToJsonError::Input(
                "Workbook does not contain any sheets".to_string(),
            ));
        }

        match selector {
            SheetSelector::All => Ok(names),
            SheetSelector::Index(index) => names.get(*index).cloned().map(|name| vec![name]).ok_or_else(
                || {
                    XlsxToJsonError::Input(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        names.len()
                    ))
                },
            ),
            SheetSelector::Name(name) => {
                if names.contains(name) {
                    Ok(vec![name.clone()])
                } else {
                    Err(XlsxToJsonError::Input(format!(
                        "Sheet '{}' not found (available: {})",
                        name,
                        names.join(", ")
                    )))
                }
            }
        }
    }

    /// シートを読み込んでテーブルに変換する
    ///
    /// 使用範囲の1行目がヘッダー、それ以降がデータ行です。
    /// 行番号は元のスプレッドシートの1始まりの番号を保持します。
    pub fn read_sheet(
        &mut self,
        sheet_name: &str,
        security: &SecurityConfig,
    ) -> Result<SheetTable, XlsxToJsonError> {
        let range = self.workbook.worksheet_range(sheet_name)?;
        if range.is_empty() {
            debug!("Sheet '{}' is empty", sheet_name);
            return Ok(SheetTable::default());
        }

        // ヘッダー行の0始まりの行インデックス
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let mut rows = range.rows();

        let columns: Vec<String> = rows
            .next()
            .map(|header| {
                header
                    .iter()
                    .enumerate()
                    .map(|(idx, cell)| header_label(idx, cell))
                    .collect()
            })
            .unwrap_or_default();

        let data: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        security.check_row_count(sheet_name, data.len())?;

        // データ行はヘッダーの次の行（1始まりで first_row + 2）から
        let row_numbers = (0..data.len()).map(|idx| first_row + 2 + idx).collect();

        debug!(
            "Read sheet '{}': {} columns, {} data rows",
            sheet_name,
            columns.len(),
            data.len()
        );
        Ok(SheetTable::with_row_numbers(columns, data, row_numbers))
    }
}

/// ヘッダーセルのラベル（空のヘッダーには位置から名前を付ける）
fn header_label(idx: usize, cell: &Data) -> String {
    match convert_cell(cell) {
        CellValue::Empty => format!("Unnamed: {}", idx),
        value => value.as_raw_string().trim().to_string(),
    }
}

/// calamineのセル値を`CellValue`に変換
///
/// `""`・空白のみ・`NULL`・`null`は空セルとして扱います。
/// 真偽値は`TRUE`/`FALSE`の文字列、エラーセルは空セルになります。
pub(crate) fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "NULL" || trimmed == "null" {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cell_null_markers() {
        assert_eq!(convert_cell(&Data::String("".to_string())), CellValue::Empty);
        assert_eq!(convert_cell(&Data::String(" ".to_string())), CellValue::Empty);
        assert_eq!(convert_cell(&Data::String("NULL".to_string())), CellValue::Empty);
        assert_eq!(convert_cell(&Data::String("null".to_string())), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::String("Null Bank".to_string())),
            CellValue::from("Null Bank")
        );
    }

    #[test]
    fn test_convert_cell_scalars() {
        assert_eq!(convert_cell(&Data::Int(42)), CellValue::Number(42.0));
        assert_eq!(convert_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(convert_cell(&Data::Bool(true)), CellValue::from("TRUE"));
        assert_eq!(
            convert_cell(&Data::Error(calamine::CellErrorType::Div0)),
            CellValue::Empty
        );
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2025-12-31T00:00:00".to_string())),
            CellValue::from("2025-12-31T00:00:00")
        );
    }

    #[test]
    fn test_header_label() {
        assert_eq!(header_label(0, &Data::String(" Amount ".to_string())), "Amount");
        assert_eq!(header_label(3, &Data::Empty), "Unnamed: 3");
        assert_eq!(header_label(1, &Data::Int(2025)), "2025");
    }
}
