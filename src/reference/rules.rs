//! Normalization Rules
//!
//! 正規フィールドをテキスト・数値・日付のクラスに分類するルールセット。

use serde::{Deserialize, Serialize};

use crate::error::XlsxToJsonError;
use crate::reference::AliasRegistry;

/// フィールドに適用されるルールのクラス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// トリムした文字列
    Text,
    /// 通貨・数値（アラビア数字表示に整形）
    Numeric,
    /// 日付（`YYYY-MM-DD`に整形）
    Date,
}

/// 正規化ルールセット
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormalizationRuleSet {
    #[serde(default)]
    pub text_fields: Vec<String>,
    #[serde(default)]
    pub numeric_fields: Vec<String>,
    #[serde(default)]
    pub date_fields: Vec<String>,
    /// 省略時はレジストリの全フィールドが必須になる
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,
}

impl NormalizationRuleSet {
    /// フィールドに対応するルールを返す
    ///
    /// 複数のクラスに登録されている場合は、テキスト → 数値 → 日付の順に適用されるため、
    /// 最後のクラスが結果を決めます。
    pub fn rule_for(&self, field: &str) -> Option<FieldRule> {
        let contains = |list: &[String]| list.iter().any(|name| name == field);
        if contains(&self.date_fields) {
            Some(FieldRule::Date)
        } else if contains(&self.numeric_fields) {
            Some(FieldRule::Numeric)
        } else if contains(&self.text_fields) {
            Some(FieldRule::Text)
        } else {
            None
        }
    }

    /// 必須フィールド（省略時はレジストリの全フィールド）
    pub fn resolved_required(&self, registry: &AliasRegistry) -> Vec<String> {
        match &self.required_fields {
            Some(required) => required.clone(),
            None => registry.field_names().map(str::to_string).collect(),
        }
    }

    /// ルールが参照するすべてのフィールドがレジストリに存在することを検証
    pub fn validate_against(&self, registry: &AliasRegistry) -> Result<(), XlsxToJsonError> {
        let referenced = self
            .text_fields
            .iter()
            .chain(self.numeric_fields.iter())
            .chain(self.date_fields.iter())
            .chain(self.required_fields.iter().flatten());

        let unknown: Vec<&str> = referenced
            .filter(|name| !registry.contains(name))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(XlsxToJsonError::Config(format!(
                "Normalization rules reference unknown fields: {}",
                unknown.join(", ")
            )))
        }
    }
}
