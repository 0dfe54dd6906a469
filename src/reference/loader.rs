//! Reference Loaders
//!
//! 参照データの読み込み元を抽象化する。組み込みデータ、JSONディレクトリ、メモリ内の3種類。

use indexmap::IndexMap;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::XlsxToJsonError;
use crate::reference::{AliasRegistry, BankEntry, BankLookup, NormalizationRuleSet, ReferenceData};

const BUILTIN_ALIASES: &str = include_str!("../../data/column_aliases.json");
const BUILTIN_RULES: &str = include_str!("../../data/normalization_rules.json");
const BUILTIN_BANKS: &str = include_str!("../../data/banks.json");

/// 別名ファイル名
pub const COLUMN_ALIASES_FILE: &str = "column_aliases.json";
/// ルールファイル名
pub const NORMALIZATION_RULES_FILE: &str = "normalization_rules.json";
/// 銀行リストファイル名
pub const BANKS_FILE: &str = "banks.json";

/// 参照データローダー
///
/// `ReferenceCache`から呼び出され、結果はキャッシュされます。
pub trait ReferenceLoader: Send + Sync + std::fmt::Debug {
    /// 参照データを読み込む
    fn load(&self) -> Result<ReferenceData, XlsxToJsonError>;

    /// 別名を永続化する
    ///
    /// 既定の実装は読み取り専用としてエラーを返します。
    fn add_alias(&self, canonical: &str, alias: &str) -> Result<(), XlsxToJsonError> {
        let _ = (canonical, alias);
        Err(XlsxToJsonError::Config(
            "Reference data source is read-only".to_string(),
        ))
    }
}

fn parse_reference(
    aliases: &str,
    rules: &str,
    banks: &str,
) -> Result<ReferenceData, XlsxToJsonError> {
    let aliases: IndexMap<String, Vec<String>> = serde_json::from_str(aliases)?;
    let rules: NormalizationRuleSet = serde_json::from_str(rules)?;
    let banks: Vec<BankEntry> = serde_json::from_str(banks)?;
    ReferenceData::new(
        AliasRegistry::from_map(aliases),
        rules,
        BankLookup::from_entries(banks),
    )
}

/// クレートに埋め込まれた既定の参照データ
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinReferenceLoader;

impl ReferenceLoader for BuiltinReferenceLoader {
    fn load(&self) -> Result<ReferenceData, XlsxToJsonError> {
        parse_reference(BUILTIN_ALIASES, BUILTIN_RULES, BUILTIN_BANKS)
    }
}

/// ディレクトリ内のJSONファイルから読み込むローダー
///
/// `column_aliases.json`、`normalization_rules.json`、`banks.json`の3ファイルを読みます。
/// 別名の追加は`column_aliases.json`に書き戻されます。
#[derive(Debug, Clone)]
pub struct JsonReferenceLoader {
    dir: PathBuf,
}

impl JsonReferenceLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, file: &str) -> Result<String, XlsxToJsonError> {
        let path = self.dir.join(file);
        if !path.is_file() {
            return Err(XlsxToJsonError::Config(format!(
                "Reference file not found: {}",
                path.display()
            )));
        }
        Ok(fs::read_to_string(path)?)
    }
}

impl ReferenceLoader for JsonReferenceLoader {
    fn load(&self) -> Result<ReferenceData, XlsxToJsonError> {
        debug!("Loading reference data from {}", self.dir.display());
        parse_reference(
            &self.read(COLUMN_ALIASES_FILE)?,
            &self.read(NORMALIZATION_RULES_FILE)?,
            &self.read(BANKS_FILE)?,
        )
    }

    fn add_alias(&self, canonical: &str, alias: &str) -> Result<(), XlsxToJsonError> {
        let mut raw: IndexMap<String, Vec<String>> =
            serde_json::from_str(&self.read(COLUMN_ALIASES_FILE)?)?;
        raw.entry(canonical.to_string())
            .or_default()
            .push(alias.to_string());
        let json = serde_json::to_string_pretty(&raw)?;
        fs::write(self.dir.join(COLUMN_ALIASES_FILE), json)?;
        Ok(())
    }
}

/// メモリ内の参照データを返すローダー
///
/// 別名の追加はメモリ内のデータに反映されます。
#[derive(Debug)]
pub struct StaticReferenceLoader {
    data: RwLock<ReferenceData>,
}

impl StaticReferenceLoader {
    pub fn new(data: ReferenceData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl ReferenceLoader for StaticReferenceLoader {
    fn load(&self) -> Result<ReferenceData, XlsxToJsonError> {
        self.data
            .read()
            .map(|data| data.clone())
            .map_err(|_| XlsxToJsonError::Config("Reference data lock poisoned".to_string()))
    }

    fn add_alias(&self, canonical: &str, alias: &str) -> Result<(), XlsxToJsonError> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| XlsxToJsonError::Config("Reference data lock poisoned".to_string()))?;
        let updated = guard.with_alias(canonical, alias)?;
        *guard = updated;
        Ok(())
    }
}
