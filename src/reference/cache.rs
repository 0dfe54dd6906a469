//! Reference Cache
//!
//! 参照データを遅延読み込みしてメモ化するキャッシュ。
//! 無効化や別名追加は「再構築してから差し替え」で行い、読み手が中途半端な
//! インデックスを観測することはありません。

use log::info;
use std::sync::{Arc, RwLock};

use crate::error::XlsxToJsonError;
use crate::reference::{BuiltinReferenceLoader, ReferenceData, ReferenceLoader};

/// 別名追加の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    /// 新しく追加された
    Added,
    /// 既に登録済み（大文字小文字・空白を無視して一致）
    Exists,
}

/// 参照データキャッシュ
///
/// プロセス全体の隠れたシングルトンではなく、明示的に所有して
/// `ConverterBuilder::with_reference_cache`で注入します。
#[derive(Debug)]
pub struct ReferenceCache {
    loader: Box<dyn ReferenceLoader>,
    current: RwLock<Option<Arc<ReferenceData>>>,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(BuiltinReferenceLoader)
    }
}

fn poisoned() -> XlsxToJsonError {
    XlsxToJsonError::Config("Reference cache lock poisoned".to_string())
}

impl ReferenceCache {
    pub fn new(loader: impl ReferenceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            current: RwLock::new(None),
        }
    }

    /// 読み込み済みのデータで初期化する
    pub fn with_data(data: ReferenceData) -> Self {
        Self::new(crate::reference::StaticReferenceLoader::new(data))
    }

    /// 現在のスナップショットを取得する（未読み込みなら読み込む）
    pub fn get(&self) -> Result<Arc<ReferenceData>, XlsxToJsonError> {
        if let Some(data) = self.current.read().map_err(|_| poisoned())?.as_ref() {
            return Ok(Arc::clone(data));
        }

        // ロックの外で読み込み、書き込み時に他のスレッドが先に設定していればそれを使う
        let loaded = Arc::new(self.loader.load()?);
        let mut guard = self.current.write().map_err(|_| poisoned())?;
        match guard.as_ref() {
            Some(existing) => Ok(Arc::clone(existing)),
            None => {
                *guard = Some(Arc::clone(&loaded));
                Ok(loaded)
            }
        }
    }

    /// キャッシュを破棄する（次の`get`で再読み込み）
    pub fn invalidate(&self) -> Result<(), XlsxToJsonError> {
        *self.current.write().map_err(|_| poisoned())? = None;
        Ok(())
    }

    /// 読み込み済みかどうか
    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// 正規フィールドに別名を追加する
    ///
    /// 未知列のレビュー結果を新しい別名として取り込むために使います。
    ///
    /// # 戻り値
    ///
    /// * `Ok(AliasOutcome::Added)` - 永続化して新しいスナップショットに差し替えた場合
    /// * `Ok(AliasOutcome::Exists)` - 既に登録済みの場合
    /// * `Err(XlsxToJsonError::Config)` - 入力が空、または正規フィールドが未知の場合
    pub fn add_alias(&self, canonical: &str, alias: &str) -> Result<AliasOutcome, XlsxToJsonError> {
        let canonical = canonical.trim();
        let alias = alias.trim();
        if canonical.is_empty() || alias.is_empty() {
            return Err(XlsxToJsonError::Config(
                "Both canonical field and alias must be provided".to_string(),
            ));
        }

        // 確認・永続化・差し替えを1つの書き込みロックの中で行う
        let mut guard = self.current.write().map_err(|_| poisoned())?;
        let snapshot = match guard.as_ref() {
            Some(data) => Arc::clone(data),
            None => {
                let loaded = Arc::new(self.loader.load()?);
                *guard = Some(Arc::clone(&loaded));
                loaded
            }
        };
        if !snapshot.registry().contains(canonical) {
            return Err(XlsxToJsonError::Config(format!(
                "Unknown canonical field: '{}'",
                canonical
            )));
        }
        if snapshot.registry().has_alias(canonical, alias) {
            return Ok(AliasOutcome::Exists);
        }

        let rebuilt = Arc::new(snapshot.with_alias(canonical, alias)?);
        self.loader.add_alias(canonical, alias)?;
        *guard = Some(rebuilt);
        drop(guard);

        info!("Added alias '{}' for canonical field '{}'", alias, canonical);
        Ok(AliasOutcome::Added)
    }
}
