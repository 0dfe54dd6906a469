//! Alias Registry
//!
//! 正規フィールド名と既知の列名バリアント（多言語）の対応表。

use indexmap::IndexMap;
use log::warn;
use std::collections::HashMap;

/// ラベルを正規化する（トリム、小文字化、内部空白の圧縮）
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 正規フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalField {
    /// 一意なフィールド名（例: `bank_name`）
    pub name: String,
    /// 既知の別名（登録時の表記のまま）
    pub aliases: Vec<String>,
    /// 必須フィールドかどうか（ルールセットから決まる）
    pub required: bool,
}

/// 別名レジストリ
///
/// フィールドは登録順に保持されます。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AliasRegistry {
    fields: Vec<CanonicalField>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{canonical: [alias, ...]}`形式のマップから生成する（マップの順を保持）
    pub fn from_map(map: IndexMap<String, Vec<String>>) -> Self {
        let mut registry = Self::new();
        for (name, aliases) in map {
            registry.insert_field(name, aliases);
        }
        registry
    }

    /// フィールドを追加する（同名のフィールドがあれば別名を統合する）
    pub fn insert_field(&mut self, name: impl Into<String>, aliases: Vec<String>) {
        let name = name.into();
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.aliases.extend(aliases),
            None => self.fields.push(CanonicalField {
                name,
                aliases,
                required: false,
            }),
        }
    }

    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// 別名が（正規化後に）すでに登録されているか
    pub fn has_alias(&self, canonical: &str, alias: &str) -> bool {
        let key = normalize_label(alias);
        self.get(canonical)
            .map(|field| field.aliases.iter().any(|a| normalize_label(a) == key))
            .unwrap_or(false)
    }

    /// 別名を追加する
    ///
    /// # 戻り値
    ///
    /// * `true` - 追加された場合
    /// * `false` - 正規フィールドが存在しない、または別名が既に存在する場合
    pub fn add_alias(&mut self, canonical: &str, alias: &str) -> bool {
        if self.has_alias(canonical, alias) {
            return false;
        }
        match self.fields.iter_mut().find(|field| field.name == canonical) {
            Some(field) => {
                field.aliases.push(alias.to_string());
                true
            }
            None => false,
        }
    }

    pub(crate) fn mark_required(&mut self, required: &[String]) {
        for field in &mut self.fields {
            field.required = required.contains(&field.name);
        }
    }

    /// 永続化用のマップ表現
    pub fn to_map(&self) -> IndexMap<String, Vec<String>> {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field.aliases.clone()))
            .collect()
    }
}

/// 別名インデックス
///
/// 正規化済みの別名 → 正規フィールド名。レジストリから一度だけ構築され、
/// 実行中は変更されません。別名を追加する場合は新しいインデックスを構築し直します。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AliasIndex {
    entries: Vec<(String, String)>,
    lookup: HashMap<String, usize>,
}

impl AliasIndex {
    /// レジストリからインデックスを構築する
    ///
    /// 正規フィールド名自体も暗黙の別名として登録されます。
    /// 同じ別名が複数のフィールドに登録されている場合は、後の登録が優先されます。
    pub fn build(registry: &AliasRegistry) -> Self {
        let mut index = Self::default();
        for field in registry.fields() {
            index.insert(&field.name, &field.name);
            for alias in &field.aliases {
                index.insert(alias, &field.name);
            }
        }
        index
    }

    fn insert(&mut self, alias: &str, canonical: &str) {
        let key = normalize_label(alias);
        if key.is_empty() {
            return;
        }
        match self.lookup.get(&key) {
            Some(&pos) => {
                if self.entries[pos].1 != canonical {
                    warn!(
                        "Alias '{}' is registered for both '{}' and '{}'; using '{}'",
                        alias, self.entries[pos].1, canonical, canonical
                    );
                    self.entries[pos].1 = canonical.to_string();
                }
            }
            None => {
                self.lookup.insert(key.clone(), self.entries.len());
                self.entries.push((key, canonical.to_string()));
            }
        }
    }

    /// 正規化済みラベルの完全一致検索
    pub fn exact(&self, normalized: &str) -> Option<&str> {
        self.lookup
            .get(normalized)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// (正規化済み別名, 正規フィールド名) を登録順に返す
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(alias, canonical)| (alias.as_str(), canonical.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
