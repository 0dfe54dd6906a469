//! Normalization Pipeline Module
//!
//! 1枚のシートを正規フィールドのテーブルに変換するパイプライン。
//!
//! 処理の流れ:
//! `Mapped → Projected → (Cleaned) → BankCanonicalized → NullCoerced → Validated → Logged`

mod cleaner;
mod inferencer;
mod logger;
mod mapper;
mod preprocessor;
mod validator;

pub use cleaner::Cleaner;
pub use inferencer::{ColumnAnalysis, ColumnProfile, TypeInferencer, DEFAULT_SAMPLE_SIZE};
pub use logger::{
    JsonLinesLogger, LogEntry, LogFacadeLogger, MemoryLogger, PipelineLogger, RunStatus,
};
pub use mapper::{similarity, ColumnMapper, ColumnMapping, Resolution, DEFAULT_FUZZY_THRESHOLD};
pub use preprocessor::{Preprocessor, ProcessedSheet, Stage};
pub use validator::Validator;

/// 銀行名の正規フィールド
pub const BANK_NAME_FIELD: &str = "bank_name";

/// 金額の正規フィールド
pub const AMOUNT_FIELD: &str = "amount";

/// 有効期限の正規フィールド
pub const VALIDITY_DATE_FIELD: &str = "validity_date";
