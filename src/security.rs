//! Security Module
//!
//! 入力の事前チェックを実装するモジュール。
//! 解析を始める前に、ファイルの存在・拡張子・サイズ・行数の上限を検証します。

use std::path::Path;

use crate::error::XlsxToJsonError;

/// サポートする拡張子（小文字、ドットなし）
pub(crate) const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_input_file_size: u64,
    /// 1シートあたりの最大データ行数
    /// デフォルト: 1,048,576（Excelの最大行数）
    pub max_sheet_rows: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 104_857_600, // 100MB
            max_sheet_rows: 1_048_576,
        }
    }
}

impl SecurityConfig {
    /// 入力バイト列のサイズを検証
    pub fn check_input_size(&self, len: usize) -> Result<(), XlsxToJsonError> {
        if len as u64 > self.max_input_file_size {
            return Err(XlsxToJsonError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// シートの行数を検証
    pub fn check_row_count(&self, sheet: &str, rows: usize) -> Result<(), XlsxToJsonError> {
        if rows > self.max_sheet_rows {
            return Err(XlsxToJsonError::SecurityViolation(format!(
                "Sheet '{}' has {} rows (max: {})",
                sheet, rows, self.max_sheet_rows
            )));
        }
        Ok(())
    }
}

/// ファイル名の拡張子を検証
///
/// # 戻り値
///
/// * `Ok(())` - 拡張子がサポート対象の場合（大文字小文字を区別しない）
/// * `Err(XlsxToJsonError::Input)` - 拡張子がない、またはサポート外の場合
pub(crate) fn validate_extension(file_name: &str) -> Result<(), XlsxToJsonError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(XlsxToJsonError::Input(format!(
            "Unsupported file format '.{}' (supported: {})",
            extension,
            SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// 入力ファイルパスを検証
///
/// ファイルの存在チェックの後に拡張子をチェックします。
pub(crate) fn validate_input_path(path: &Path) -> Result<(), XlsxToJsonError> {
    if !path.is_file() {
        return Err(XlsxToJsonError::Input(format!(
            "File '{}' does not exist",
            path.display()
        )));
    }
    validate_extension(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_extension_valid() {
        assert!(validate_extension("guarantees.xlsx").is_ok());
        assert!(validate_extension("legacy.XLS").is_ok());
        assert!(validate_extension("dir/with.dots/report.Xlsx").is_ok());
    }

    #[test]
    fn test_validate_extension_rejects_other_formats() {
        assert!(matches!(
            validate_extension("notes.txt"),
            Err(XlsxToJsonError::Input(_))
        ));
        assert!(validate_extension("no_extension").is_err());
        assert!(validate_extension("data.csv").is_err());
    }

    #[test]
    fn test_validate_input_path_missing_file() {
        let result = validate_input_path(Path::new("definitely/missing/file.xlsx"));
        match result {
            Err(XlsxToJsonError::Input(msg)) => assert!(msg.contains("does not exist")),
            _ => panic!("Expected Input error"),
        }
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            ..Default::default()
        };
        assert!(config.check_input_size(10).is_ok());
        assert!(matches!(
            config.check_input_size(11),
            Err(XlsxToJsonError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_check_row_count() {
        let config = SecurityConfig {
            max_sheet_rows: 2,
            ..Default::default()
        };
        assert!(config.check_row_count("Sheet1", 2).is_ok());
        assert!(config.check_row_count("Sheet1", 3).is_err());
    }
}
