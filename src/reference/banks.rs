//! Bank Lookup
//!
//! 銀行名のバリアントを参照用のアラビア語名（と連絡先）に正規化する。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reference::normalize_label;

/// 銀行参照リストの1エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
    /// 正規のアラビア語名
    pub arabic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// 正規化済み別名 → 銀行エントリ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BankLookup {
    entries: Vec<BankEntry>,
    index: HashMap<String, usize>,
}

impl BankLookup {
    /// エントリのリストから構築する（アラビア語名が空のエントリは無視）
    pub fn from_entries(entries: Vec<BankEntry>) -> Self {
        let entries: Vec<BankEntry> = entries
            .into_iter()
            .filter(|entry| !entry.arabic.trim().is_empty())
            .map(|mut entry| {
                entry.arabic = entry.arabic.trim().to_string();
                entry
            })
            .collect();

        let mut index = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            let names = std::iter::once(&entry.arabic)
                .chain(entry.english.iter())
                .chain(entry.aliases.iter());
            for name in names {
                let key = normalize_label(name);
                if !key.is_empty() {
                    index.insert(key, pos);
                }
            }
        }

        Self { entries, index }
    }

    /// 銀行名を参照名に正規化する
    ///
    /// 一致しない場合は`None`。呼び出し側はトリムした元の値を使います。
    pub fn canonicalize(&self, name: &str) -> Option<&str> {
        self.find(name).map(|entry| entry.arabic.as_str())
    }

    /// 銀行名からエントリ全体（住所・メールなど）を取得する
    pub fn find(&self, name: &str) -> Option<&BankEntry> {
        self.index
            .get(&normalize_label(name))
            .map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[BankEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
