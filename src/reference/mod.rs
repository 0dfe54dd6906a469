//! Reference Data Module
//!
//! 別名レジストリ、正規化ルール、銀行参照リストを読み込み、
//! 変換中は読み取り専用のスナップショットとして提供するモジュール。

mod aliases;
mod banks;
mod cache;
mod loader;
mod rules;

pub use aliases::{normalize_label, AliasIndex, AliasRegistry, CanonicalField};
pub use banks::{BankEntry, BankLookup};
pub use cache::{AliasOutcome, ReferenceCache};
pub use loader::{
    BuiltinReferenceLoader, JsonReferenceLoader, ReferenceLoader, StaticReferenceLoader,
};
pub use rules::{FieldRule, NormalizationRuleSet};

use crate::error::XlsxToJsonError;

/// 参照データのスナップショット
///
/// レジストリ・ルール・銀行リストと、レジストリから導出した別名インデックスを保持します。
/// 構築後は変更されません（別名の追加は新しいスナップショットを作ります）。
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    registry: AliasRegistry,
    index: AliasIndex,
    rules: NormalizationRuleSet,
    required: Vec<String>,
    banks: BankLookup,
}

impl ReferenceData {
    /// 参照データを検証して構築する
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxToJsonError::Config)` - ルールがレジストリに存在しないフィールドを参照する場合
    pub fn new(
        mut registry: AliasRegistry,
        rules: NormalizationRuleSet,
        banks: BankLookup,
    ) -> Result<Self, XlsxToJsonError> {
        rules.validate_against(&registry)?;
        let required = rules.resolved_required(&registry);
        registry.mark_required(&required);
        let index = AliasIndex::build(&registry);
        Ok(Self {
            registry,
            index,
            rules,
            required,
            banks,
        })
    }

    /// 組み込みの既定参照データ
    pub fn builtin() -> Result<Self, XlsxToJsonError> {
        BuiltinReferenceLoader.load()
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub fn alias_index(&self) -> &AliasIndex {
        &self.index
    }

    pub fn rules(&self) -> &NormalizationRuleSet {
        &self.rules
    }

    /// 必須フィールド（ルールの順序のまま）
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    pub fn banks(&self) -> &BankLookup {
        &self.banks
    }

    /// 別名を追加した新しいスナップショットを構築する
    ///
    /// インデックスは新しいレジストリから再構築されます。
    pub fn with_alias(&self, canonical: &str, alias: &str) -> Result<Self, XlsxToJsonError> {
        let mut registry = self.registry.clone();
        if !registry.contains(canonical) {
            return Err(XlsxToJsonError::Config(format!(
                "Unknown canonical field: '{}'",
                canonical
            )));
        }
        registry.add_alias(canonical, alias);
        Self::new(registry, self.rules.clone(), self.banks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_reference_data() {
        let data = ReferenceData::builtin().unwrap();
        assert_eq!(data.required_fields().len(), 6);
        assert!(data.registry().contains("guarantee_number"));
        assert_eq!(data.alias_index().exact("contract no."), Some("contract_number"));
        assert_eq!(data.banks().canonicalize("Riyad Bank"), Some("بنك الرياض"));
        assert!(data.registry().get("amount").unwrap().required);
    }

    #[test]
    fn test_with_alias_rebuilds_index() {
        let data = ReferenceData::builtin().unwrap();
        assert_eq!(data.alias_index().exact("قيمة"), None);

        let updated = data.with_alias("amount", "قيمة").unwrap();
        assert_eq!(updated.alias_index().exact("قيمة"), Some("amount"));
        // 元のスナップショットは変わらない
        assert_eq!(data.alias_index().exact("قيمة"), None);
    }

    #[test]
    fn test_with_alias_unknown_field() {
        let data = ReferenceData::builtin().unwrap();
        assert!(matches!(
            data.with_alias("fees", "Fees"),
            Err(XlsxToJsonError::Config(_))
        ));
    }
}
