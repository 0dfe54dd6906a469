//! Preprocessor
//!
//! 1枚のシートについて、列マッピング・射影・クリーニング・銀行名の正規化・
//! null変換・検証・ログ記録を順に実行する。

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fmt;

use crate::error::XlsxToJsonError;
use crate::pipeline::{
    Cleaner, ColumnAnalysis, ColumnMapper, ColumnMapping, ColumnProfile, PipelineLogger,
    RunStatus, TypeInferencer, Validator, BANK_NAME_FIELD,
};
use crate::reference::ReferenceData;
use crate::types::{CellValue, NormalizedTable, ProcessingMetadata, SheetTable};

/// パイプラインの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mapped,
    Projected,
    Cleaned,
    BankCanonicalized,
    NullCoerced,
    Validated,
    Logged,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Mapped => "mapped",
            Stage::Projected => "projected",
            Stage::Cleaned => "cleaned",
            Stage::BankCanonicalized => "bank_canonicalized",
            Stage::NullCoerced => "null_coerced",
            Stage::Validated => "validated",
            Stage::Logged => "logged",
        };
        f.write_str(name)
    }
}

/// 処理済みのシート
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSheet {
    pub table: NormalizedTable,
    /// 列ごとの型の説明（出力列の順）
    pub profiles: IndexMap<String, ColumnProfile>,
    pub metadata: ProcessingMetadata,
}

/// シート単位のパイプライン
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor<'a> {
    reference: &'a ReferenceData,
    logger: &'a dyn PipelineLogger,
    cleaning: bool,
    fuzzy_threshold: f64,
    inferencer: TypeInferencer,
}

impl<'a> Preprocessor<'a> {
    pub fn new(reference: &'a ReferenceData, logger: &'a dyn PipelineLogger) -> Self {
        Self {
            reference,
            logger,
            cleaning: true,
            fuzzy_threshold: crate::pipeline::DEFAULT_FUZZY_THRESHOLD,
            inferencer: TypeInferencer::default(),
        }
    }

    pub fn with_cleaning(mut self, cleaning: bool) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.inferencer = TypeInferencer::new(sample_size);
        self
    }

    /// シートを処理する
    ///
    /// 成功・失敗のどちらもロガーに記録されます。失敗時は部分的な結果を返しません。
    pub fn process(
        &self,
        table: SheetTable,
        mut metadata: ProcessingMetadata,
    ) -> Result<ProcessedSheet, XlsxToJsonError> {
        metadata.cleaning_applied = self.cleaning;
        match self.run(table, &mut metadata) {
            Ok((table, profiles)) => {
                self.logger.log(RunStatus::Success, &metadata)?;
                self.trace(&metadata, Stage::Logged);
                info!(
                    "Sheet '{}' normalized: {} records, {} unknown columns",
                    metadata.sheet_name,
                    table.row_count(),
                    metadata.unknown_columns.len()
                );
                Ok(ProcessedSheet {
                    table,
                    profiles,
                    metadata,
                })
            }
            Err(err) => {
                metadata.error = Some(err.to_string());
                if let Err(log_err) = self.logger.log(RunStatus::Failure, &metadata) {
                    warn!("Failed to record pipeline failure: {}", log_err);
                }
                Err(err)
            }
        }
    }

    fn run(
        &self,
        mut table: SheetTable,
        metadata: &mut ProcessingMetadata,
    ) -> Result<(NormalizedTable, IndexMap<String, ColumnProfile>), XlsxToJsonError> {
        let sheet = metadata.sheet_name.clone();
        let validator = Validator::new(self.reference.required_fields());

        // Mapped
        let mapper = ColumnMapper::with_threshold(self.reference.alias_index(), self.fuzzy_threshold);
        let mapping = mapper.map_columns(&table.columns);
        metadata.unknown_columns = mapping.unknown.clone();
        self.trace(metadata, Stage::Mapped);

        validator
            .ensure_required_columns(&mapping.resolved_fields())
            .map_err(|failure| XlsxToJsonError::from_failure(&sheet, failure))?;

        // Projected
        table = self.project(&table, &mapping);
        metadata.rows_before = table.row_count();
        metadata.columns_before = table.column_count();
        self.trace(metadata, Stage::Projected);

        // Cleaned
        let mut normalized = if self.cleaning {
            let cleaner = Cleaner::new(self.reference.rules());
            let removed = cleaner.remove_empty_rows(&mut table);
            if removed > 0 {
                debug!("[{}] removed {} empty rows", sheet, removed);
            }
            let cleaned = cleaner.clean(&table)?;
            self.trace(metadata, Stage::Cleaned);
            cleaned
        } else {
            Cleaner::passthrough(&table)
        };

        let analyses = self.analyze(&table);

        // BankCanonicalized
        self.canonicalize_banks(&mut normalized);
        self.trace(metadata, Stage::BankCanonicalized);

        // NullCoerced
        coerce_nulls(&mut normalized);
        self.trace(metadata, Stage::NullCoerced);

        // Validated
        validator
            .validate(&normalized)
            .map_err(|failure| XlsxToJsonError::from_failure(&sheet, failure))?;
        self.trace(metadata, Stage::Validated);

        metadata.rows_after = normalized.row_count();
        metadata.columns_after = normalized.column_count();

        let mut profiles = IndexMap::new();
        for (idx, (column, analysis)) in normalized.columns().iter().zip(analyses).enumerate() {
            if analysis.mixed_types() {
                warn!(
                    "[{}] column '{}' has mixed value types: {:?}",
                    sheet, column, analysis.types_found
                );
            }
            profiles.insert(
                column.clone(),
                ColumnProfile::new(analysis, normalized.column_values(idx)),
            );
        }

        Ok((normalized, profiles))
    }

    /// 出力する正規フィールドの順序
    ///
    /// 必須フィールド（ルールの順）の後に、解決されたその他のフィールドをレジストリの順に並べます。
    fn output_fields(&self, mapping: &ColumnMapping) -> Vec<String> {
        let resolved = mapping.resolved_fields();
        let mut fields: Vec<String> = self.reference.required_fields().to_vec();
        for name in self.reference.registry().field_names() {
            if resolved.contains(&name) && !fields.iter().any(|field| field == name) {
                fields.push(name.to_string());
            }
        }
        fields
    }

    /// 正規フィールドの列だけを残してリネームする
    ///
    /// 同じフィールドに複数の列が解決された場合は最後の列を使います。
    fn project(&self, table: &SheetTable, mapping: &ColumnMapping) -> SheetTable {
        let fields = self.output_fields(mapping);
        let sources: Vec<Option<usize>> = fields
            .iter()
            .map(|field| mapping.source_for(field))
            .collect();

        let rows = table
            .rows
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|source| {
                        source
                            .and_then(|idx| row.get(idx).cloned())
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect()
            })
            .collect();

        SheetTable::with_row_numbers(fields, rows, table.row_numbers.clone())
    }

    fn analyze(&self, table: &SheetTable) -> Vec<ColumnAnalysis> {
        let rules = self.reference.rules();
        table
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| match rules.rule_for(column) {
                Some(rule) => ColumnAnalysis::for_rule(rule),
                None => self.inferencer.analyze(table.column_values(idx)),
            })
            .collect()
    }

    /// 銀行名を参照名に置き換える（一致しない場合はトリムのみ）
    fn canonicalize_banks(&self, table: &mut NormalizedTable) {
        let Some(idx) = table.column_index(BANK_NAME_FIELD) else {
            return;
        };
        let banks = self.reference.banks();
        for row in table.rows_mut() {
            if let Some(Some(value)) = row.get_mut(idx) {
                let canonical = match banks.canonicalize(value) {
                    Some(name) => name.to_string(),
                    None => value.trim().to_string(),
                };
                *value = canonical;
            }
        }
    }

    fn trace(&self, metadata: &ProcessingMetadata, stage: Stage) {
        debug!(
            "[{}] {}: stage {}",
            metadata.file_name, metadata.sheet_name, stage
        );
    }
}

/// 空文字列・空白のみの値を欠損（`None`）にする
fn coerce_nulls(table: &mut NormalizedTable) {
    for row in table.rows_mut() {
        for value in row.iter_mut() {
            if value.as_deref().map(|v| v.trim().is_empty()).unwrap_or(false) {
                *value = None;
            }
        }
    }
}
