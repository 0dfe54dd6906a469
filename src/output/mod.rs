//! Output Module
//!
//! 変換結果のJSONペイロードを定義するモジュール。
//! 単一シートと複数シートで形が異なり、マップはすべて挿入順を保持します。

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::XlsxToJsonError;
use crate::pipeline::{ColumnProfile, ProcessedSheet};
use crate::types::{NormalizedRecord, ProcessingMetadata};

/// 単一シート出力の`file_info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetFileInfo {
    pub file_name: String,
    pub sheet_name: String,
    /// ISO-8601 (UTC)
    pub conversion_date: String,
    pub records_count: usize,
    pub columns_count: usize,
    pub cleaning_applied: bool,
    pub unknown_columns: Vec<String>,
}

/// 単一シートの変換結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleSheetOutput {
    pub file_info: SheetFileInfo,
    pub columns: Vec<String>,
    pub data_types: IndexMap<String, ColumnProfile>,
    pub records: Vec<NormalizedRecord>,
}

/// 複数シート出力の`file_info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookFileInfo {
    pub file_name: String,
    pub conversion_date: String,
    pub total_sheets: usize,
    pub cleaning_applied: bool,
    /// シート名 → 未知の列
    pub unknown_columns: IndexMap<String, Vec<String>>,
}

/// 複数シート出力の各シートの`metadata`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMetadata {
    pub sheet_name: String,
    pub records_count: usize,
    pub columns_count: usize,
    pub cleaning_applied: bool,
    pub unknown_columns: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
}

impl From<&ProcessingMetadata> for SheetMetadata {
    fn from(metadata: &ProcessingMetadata) -> Self {
        Self {
            sheet_name: metadata.sheet_name.clone(),
            records_count: metadata.rows_after,
            columns_count: metadata.columns_after,
            cleaning_applied: metadata.cleaning_applied,
            unknown_columns: metadata.unknown_columns.clone(),
            rows_before: metadata.rows_before,
            rows_after: metadata.rows_after,
            columns_before: metadata.columns_before,
            columns_after: metadata.columns_after,
        }
    }
}

/// 複数シート出力の1シート分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetOutput {
    pub metadata: SheetMetadata,
    pub data_types: IndexMap<String, ColumnProfile>,
    pub records: Vec<NormalizedRecord>,
}

/// 複数シートの変換結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSheetOutput {
    pub file_info: WorkbookFileInfo,
    pub sheets: IndexMap<String, SheetOutput>,
}

/// 変換結果
///
/// シリアライズ時はタグなしで、中身の形がそのままJSONになります。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConversionOutput {
    Single(SingleSheetOutput),
    Multi(MultiSheetOutput),
}

impl ConversionOutput {
    /// 単一シートの結果から生成する
    pub fn single(file_name: &str, sheet: ProcessedSheet) -> Self {
        let ProcessedSheet {
            table,
            profiles,
            metadata,
        } = sheet;
        ConversionOutput::Single(SingleSheetOutput {
            file_info: SheetFileInfo {
                file_name: file_name.to_string(),
                sheet_name: metadata.sheet_name,
                conversion_date: chrono::Utc::now().to_rfc3339(),
                records_count: table.row_count(),
                columns_count: table.column_count(),
                cleaning_applied: metadata.cleaning_applied,
                unknown_columns: metadata.unknown_columns,
            },
            columns: table.columns().to_vec(),
            data_types: profiles,
            records: table.records(),
        })
    }

    /// 複数シートの結果から生成する（シートの順序を保持）
    pub fn multi(file_name: &str, cleaning_applied: bool, sheets: Vec<ProcessedSheet>) -> Self {
        let mut unknown_columns = IndexMap::new();
        let mut outputs = IndexMap::new();

        for sheet in sheets {
            let metadata = SheetMetadata::from(&sheet.metadata);
            unknown_columns.insert(metadata.sheet_name.clone(), metadata.unknown_columns.clone());
            outputs.insert(
                metadata.sheet_name.clone(),
                SheetOutput {
                    records: sheet.table.records(),
                    data_types: sheet.profiles,
                    metadata,
                },
            );
        }

        ConversionOutput::Multi(MultiSheetOutput {
            file_info: WorkbookFileInfo {
                file_name: file_name.to_string(),
                conversion_date: chrono::Utc::now().to_rfc3339(),
                total_sheets: outputs.len(),
                cleaning_applied,
                unknown_columns,
            },
            sheets: outputs,
        })
    }

    /// 全シートのレコード数の合計
    pub fn records_count(&self) -> usize {
        match self {
            ConversionOutput::Single(output) => output.file_info.records_count,
            ConversionOutput::Multi(output) => output
                .sheets
                .values()
                .map(|sheet| sheet.metadata.records_count)
                .sum(),
        }
    }

    /// 含まれるシート数
    pub fn sheet_count(&self) -> usize {
        match self {
            ConversionOutput::Single(_) => 1,
            ConversionOutput::Multi(output) => output.file_info.total_sheets,
        }
    }

    /// 未知の列（全シート、重複なし、出現順）
    pub fn unknown_columns(&self) -> Vec<&str> {
        let lists: Vec<&Vec<String>> = match self {
            ConversionOutput::Single(output) => vec![&output.file_info.unknown_columns],
            ConversionOutput::Multi(output) => output
                .file_info
                .unknown_columns
                .values()
                .collect(),
        };
        let mut seen: Vec<&str> = Vec::new();
        for column in lists.into_iter().flatten() {
            if !seen.contains(&column.as_str()) {
                seen.push(column);
            }
        }
        seen
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, XlsxToJsonError> {
        Ok(serde_json::to_value(self)?)
    }

    /// 整形済みのJSON文字列（UTF-8、非ASCII文字はエスケープしない）
    pub fn to_json_pretty(&self) -> Result<String, XlsxToJsonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
