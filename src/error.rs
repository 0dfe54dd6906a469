//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 変換は常に「全部成功か全部失敗か」であり、部分的な結果は返しません。

use thiserror::Error;

/// 検証ステージの失敗理由
///
/// `Validator`の各チェックはこの型をタグ付き結果として返します。
/// 呼び出し側は例外型に依存せずに失敗理由で分岐できます。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// 必須の正規列がリネーム後の列集合に存在しない
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// 必須フィールドに欠損値がある列
    #[error("some fields contain empty values: {}", .columns.join(", "))]
    MissingValues {
        /// 欠損値を含む列名
        columns: Vec<String>,
    },

    /// `amount`列に空、または数値として読めない値がある
    #[error("missing or invalid amount value at row {row}")]
    InvalidAmount {
        /// 1始まりのスプレッドシート行番号
        row: usize,
    },

    /// `validity_date`列に解析できない日付がある
    #[error("invalid validity dates at rows: {}", join_rows(.rows))]
    InvalidDates {
        /// 問題のある行番号
        rows: Vec<usize>,
    },
}

fn join_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(|row| row.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// guarantee-xlsxクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `Input`: ファイルが存在しない、拡張子がサポート外、シートが見つからない
/// - `Schema`: 必須の正規列が存在しない（シート全体の失敗）
/// - `Value`: フィールドルールがセルを解析できない（どの列・値かを含む）
/// - `Validation`: クリーニング後の不変条件違反
///
/// いずれも内部でリトライされず、呼び出し元へ同期的に伝播します。
///
/// # 使用例
///
/// ```rust,no_run
/// use guarantee_xlsx::{ConverterBuilder, XlsxToJsonError};
///
/// let converter = ConverterBuilder::new().build()?;
/// match converter.convert_file("guarantees.xlsx") {
///     Err(XlsxToJsonError::Schema { sheet, missing }) => {
///         eprintln!("{}: missing {:?}", sheet, missing);
///     }
///     Err(other) => eprintln!("{}", other),
///     Ok(output) => println!("{}", output.to_json_pretty()?),
/// }
/// # Ok::<(), XlsxToJsonError>(())
/// ```
#[derive(Error, Debug)]
pub enum XlsxToJsonError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// JSONの読み込み・書き出しエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 入力エラー
    ///
    /// 解析を始める前に検出されます（ファイルが存在しない、拡張子が不正など）。
    #[error("Input error: {0}")]
    Input(String),

    /// スキーマエラー
    ///
    /// 必須の正規フィールドがシートの列から解決できなかった場合に発生します。
    #[error("Schema error in sheet '{sheet}': missing required columns: {}", .missing.join(", "))]
    Schema {
        /// シート名
        sheet: String,
        /// 見つからなかった正規フィールド名
        missing: Vec<String>,
    },

    /// 値エラー
    ///
    /// 金額セルが数値として解析できない場合などに発生します。
    #[error("Invalid value in column '{column}' at row {row}: '{value}' ({reason})")]
    Value {
        /// 正規フィールド名
        column: String,
        /// 1始まりのスプレッドシート行番号（ヘッダー行を含む）
        row: usize,
        /// 元のセル値
        value: String,
        /// 失敗理由
        reason: String,
    },

    /// 検証エラー
    #[error("Validation failed for sheet '{sheet}': {failure}")]
    Validation {
        /// シート名
        sheet: String,
        /// 失敗理由
        failure: ValidationFailure,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時の設定検証や、参照データの整合性チェックで
    /// 発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力サイズや行数の上限を超えた場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxToJsonError {
    /// 検証失敗をシート名付きのエラーに変換する
    ///
    /// `MissingColumns`はスキーマエラー、それ以外は検証エラーになります。
    pub(crate) fn from_failure(sheet: &str, failure: ValidationFailure) -> Self {
        match failure {
            ValidationFailure::MissingColumns(missing) => XlsxToJsonError::Schema {
                sheet: sheet.to_string(),
                missing,
            },
            failure => XlsxToJsonError::Validation {
                sheet: sheet.to_string(),
                failure,
            },
        }
    }
}
