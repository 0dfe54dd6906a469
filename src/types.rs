//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::{NaiveDateTime, Timelike};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::Arc;

/// セル値
///
/// スプレッドシートのセル値を閉じたバリアントとして表現します。
/// クリーナーと型推論の分岐はこの型に対して網羅的に書かれます。
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 文字列
    Text(String),

    /// 数値（Excelは整数も浮動小数点として保持する）
    Number(f64),

    /// ネイティブの日付セル
    Date(NaiveDateTime),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 空セル、または空白のみの文字列かどうか
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// 表示用の文字列に変換する（トリムは行わない）
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => render_number(*n),
            CellValue::Date(dt) => render_datetime(dt),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<&str>> for CellValue {
    fn from(value: Option<&str>) -> Self {
        value.map(CellValue::from).unwrap_or(CellValue::Empty)
    }
}

/// 数値を文字列化する
///
/// 整数値は小数点なしで出力します（`125000.0` → `125000`）。
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// 日時を文字列化する（真夜中の場合は日付のみ）
pub(crate) fn render_datetime(dt: &NaiveDateTime) -> String {
    if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// 1枚のシートを表すテーブル
///
/// 列ラベルは信頼できない任意の文字列です。行は列と同じ長さに揃えられます。
/// `row_numbers`は各行の元のスプレッドシート行番号（1始まり）です。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetTable {
    /// 列ラベル（元のヘッダー、またはリネーム後の正規名）
    pub columns: Vec<String>,

    /// 行データ
    pub rows: Vec<Vec<CellValue>>,

    /// 元の行番号（エラーメッセージ用）
    pub row_numbers: Vec<usize>,
}

impl SheetTable {
    /// 列と行からテーブルを生成する
    ///
    /// ヘッダーが1行目にあるものとして、データ行には2から番号を振ります。
    /// 列数より短い行は`Empty`で埋め、長い行は切り詰めます。
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let row_numbers = (2..rows.len() + 2).collect();
        Self::with_row_numbers(columns, rows, row_numbers)
    }

    pub(crate) fn with_row_numbers(
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        row_numbers: Vec<usize>,
    ) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self {
            columns,
            rows,
            row_numbers,
        }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 列名から列インデックスを取得する
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// 指定列の値を上から順に返す
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// 行の元の番号（範囲外の場合はインデックスから推定）
    pub fn row_number(&self, row_idx: usize) -> usize {
        self.row_numbers.get(row_idx).copied().unwrap_or(row_idx + 2)
    }

    /// 条件を満たす行だけを残す（行番号も同期して削除）
    pub(crate) fn retain_rows<F: FnMut(&[CellValue]) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.rows.len();
        let mut numbers = std::mem::take(&mut self.row_numbers).into_iter();
        let mut kept_numbers = Vec::with_capacity(before);
        let rows = std::mem::take(&mut self.rows);
        for (idx, row) in rows.into_iter().enumerate() {
            let number = numbers.next().unwrap_or(idx + 2);
            if keep(&row) {
                self.rows.push(row);
                kept_numbers.push(number);
            }
        }
        self.row_numbers = kept_numbers;
        before - self.rows.len()
    }
}

/// 正規化・null変換済みのテーブル
///
/// 列は正規フィールド名のみ、値は`Some(文字列)`か`None`です。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    columns: Arc<[String]>,
    rows: Vec<Vec<Option<String>>>,
    row_numbers: Vec<usize>,
}

impl NormalizedTable {
    pub(crate) fn new(
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
        row_numbers: Vec<usize>,
    ) -> Self {
        Self {
            columns: columns.into(),
            rows,
            row_numbers,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Option<String>>] {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// 指定列の値を上から順に返す
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|value| value.as_deref()))
    }

    pub fn row_number(&self, row_idx: usize) -> usize {
        self.row_numbers.get(row_idx).copied().unwrap_or(row_idx + 2)
    }

    /// レコードのリストに変換する
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.rows
            .iter()
            .map(|row| NormalizedRecord::new(Arc::clone(&self.columns), row.clone()))
            .collect()
    }
}

/// シートごとの処理メタデータ
///
/// 実行ごとに生成され、パイプラインロガーに追記されます。
/// 一部は出力ペイロードにも含まれます。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingMetadata {
    pub file_name: String,
    pub sheet_name: String,
    /// ISO-8601 (UTC)
    pub timestamp: String,
    pub unknown_columns: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub cleaning_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingMetadata {
    pub fn new(file_name: &str, sheet_name: &str, cleaning_applied: bool) -> Self {
        Self {
            file_name: file_name.to_string(),
            sheet_name: sheet_name.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            unknown_columns: Vec::new(),
            rows_before: 0,
            rows_after: 0,
            columns_before: 0,
            columns_after: 0,
            cleaning_applied,
            error: None,
        }
    }
}

/// 正規化済みの1レコード
///
/// キーは正規フィールド名のみで、値はUTF-8文字列か`null`です。
/// 未知の列がレコードに混入することはありません。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    fields: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl NormalizedRecord {
    pub(crate) fn new(fields: Arc<[String]>, values: Vec<Option<String>>) -> Self {
        Self { fields, values }
    }

    /// 正規フィールド名で値を取得する
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .position(|name| name == field)
            .and_then(|idx| self.values.get(idx))
            .and_then(|value| value.as_deref())
    }

    /// フィールド名と値の組を列順に返す
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render_number() {
        assert_eq!(render_number(125000.0), "125000");
        assert_eq!(render_number(-3.0), "-3");
        assert_eq!(render_number(789.5), "789.5");
    }

    #[test]
    fn test_cell_value_is_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::from("x").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_cell_value_date_rendering() {
        let dt = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Date(dt).as_raw_string(), "2025-12-31");

        let dt = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        assert_eq!(CellValue::Date(dt).as_raw_string(), "2025-01-02 13:05:00");
    }

    #[test]
    fn test_sheet_table_pads_short_rows() {
        let table = SheetTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![CellValue::from("1")]],
        );
        assert_eq!(table.rows[0], vec![CellValue::from("1"), CellValue::Empty]);
        assert_eq!(table.column_index("b"), Some(1));
        assert_eq!(table.row_number(0), 2);
    }

    #[test]
    fn test_retain_rows_keeps_row_numbers_in_sync() {
        let mut table = SheetTable::new(
            vec!["a".to_string()],
            vec![
                vec![CellValue::from("x")],
                vec![CellValue::Empty],
                vec![CellValue::from("y")],
            ],
        );
        let removed = table.retain_rows(|row| row.iter().any(|cell| !cell.is_blank()));
        assert_eq!(removed, 1);
        assert_eq!(table.row_numbers, vec![2, 4]);
        assert_eq!(table.row_number(1), 4);
    }

    #[test]
    fn test_normalized_table_records() {
        let table = NormalizedTable::new(
            vec!["amount".to_string()],
            vec![vec![Some("١٠".to_string())], vec![None]],
            vec![2, 3],
        );
        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("amount"), Some("١٠"));
        assert_eq!(table.column_values(0).collect::<Vec<_>>(), vec![Some("١٠"), None]);
    }

    #[test]
    fn test_normalized_record_serializes_in_field_order() {
        let fields: Arc<[String]> = vec!["z".to_string(), "a".to_string()].into();
        let record = NormalizedRecord::new(fields, vec![Some("1".to_string()), None]);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"z":"1","a":null}"#);
        assert_eq!(record.get("z"), Some("1"));
        assert_eq!(record.get("a"), None);
    }
}
