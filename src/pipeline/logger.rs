//! Pipeline Logger
//!
//! 各処理実行の結果とメタデータを追記専用で記録する。

use log::{info, warn};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::XlsxToJsonError;
use crate::types::ProcessingMetadata;

/// 実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }
}

/// ログの1エントリ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub status: RunStatus,
    pub metadata: ProcessingMetadata,
}

impl LogEntry {
    pub fn new(status: RunStatus, metadata: &ProcessingMetadata) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status,
            metadata: metadata.clone(),
        }
    }
}

/// パイプラインロガー
///
/// `(status, metadata)`の組を受け取る追記専用のシンクです。
pub trait PipelineLogger: Send + Sync + std::fmt::Debug {
    fn log(&self, status: RunStatus, metadata: &ProcessingMetadata) -> Result<(), XlsxToJsonError>;
}

/// `log`ファサードに転送するロガー（既定）
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacadeLogger;

impl PipelineLogger for LogFacadeLogger {
    fn log(&self, status: RunStatus, metadata: &ProcessingMetadata) -> Result<(), XlsxToJsonError> {
        match status {
            RunStatus::Success => info!(
                "[{}] {}: rows {} -> {}, columns {} -> {}, unknown columns: {:?}",
                metadata.file_name,
                metadata.sheet_name,
                metadata.rows_before,
                metadata.rows_after,
                metadata.columns_before,
                metadata.columns_after,
                metadata.unknown_columns
            ),
            RunStatus::Failure => warn!(
                "[{}] {}: failed: {}",
                metadata.file_name,
                metadata.sheet_name,
                metadata.error.as_deref().unwrap_or("unknown error")
            ),
        }
        Ok(())
    }
}

/// JSON Lines形式でファイルに追記するロガー
///
/// 1行に1つ`{timestamp, status, metadata}`のJSONオブジェクトを書き込みます。
#[derive(Debug)]
pub struct JsonLinesLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesLogger {
    /// ロガーを作成する（親ディレクトリがなければ作成）
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, XlsxToJsonError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PipelineLogger for JsonLinesLogger {
    fn log(&self, status: RunStatus, metadata: &ProcessingMetadata) -> Result<(), XlsxToJsonError> {
        let line = serde_json::to_string(&LogEntry::new(status, metadata))?;
        let _guard = self
            .lock
            .lock()
            .map_err(|_| XlsxToJsonError::Config("Pipeline log lock poisoned".to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// メモリ内に記録するロガー
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録されたエントリのコピー
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PipelineLogger for MemoryLogger {
    fn log(&self, status: RunStatus, metadata: &ProcessingMetadata) -> Result<(), XlsxToJsonError> {
        self.entries
            .lock()
            .map_err(|_| XlsxToJsonError::Config("Pipeline log lock poisoned".to_string()))?
            .push(LogEntry::new(status, metadata));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ProcessingMetadata {
        let mut metadata = ProcessingMetadata::new("guarantees.xlsx", "Sheet1", true);
        metadata.rows_before = 3;
        metadata.rows_after = 2;
        metadata.unknown_columns = vec!["Attachment Link".to_string()];
        metadata
    }

    #[test]
    fn test_memory_logger_records_entries() {
        let logger = MemoryLogger::new();
        assert!(logger.is_empty());
        logger.log(RunStatus::Success, &metadata()).unwrap();

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, RunStatus::Success);
        assert_eq!(entries[0].metadata.rows_after, 2);
    }

    #[test]
    fn test_json_lines_logger_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("pipeline.log");
        let logger = JsonLinesLogger::new(&path).unwrap();

        logger.log(RunStatus::Success, &metadata()).unwrap();
        let mut failed = metadata();
        failed.error = Some("missing required columns".to_string());
        logger.log(RunStatus::Failure, &failed).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[0]["metadata"]["unknown_columns"][0], "Attachment Link");
        assert_eq!(lines[1]["status"], "failure");
        assert_eq!(lines[1]["metadata"]["error"], "missing required columns");
        assert!(lines[0]["timestamp"].is_string());
    }

    #[test]
    fn test_log_facade_logger_never_fails() {
        assert!(LogFacadeLogger.log(RunStatus::Failure, &metadata()).is_ok());
        assert_eq!(RunStatus::Failure.as_str(), "failure");
    }
}
