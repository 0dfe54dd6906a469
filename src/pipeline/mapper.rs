//! Column Mapper
//!
//! スプレッドシートの実際のヘッダーを正規フィールド名に解決する。
//! 別名インデックスの完全一致を優先し、見つからない場合は文字列類似度で補完します。

use log::{debug, warn};
use similar::{DiffOp, TextDiff};

use crate::reference::{normalize_label, AliasIndex};

/// 類似度マッチの既定しきい値
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.9;

/// 2つの文字列の類似度（0.0〜1.0）
///
/// 文字単位の差分から `2 * 一致文字数 / 合計文字数` を計算します。
/// しきい値ちょうどの比較がずれないよう、一致数から`f64`で直接求めます。
pub fn similarity(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let diff = TextDiff::from_chars(a, b);
    let matched: usize = diff
        .ops()
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();
    2.0 * matched as f64 / total as f64
}

/// 1つのヘッダーの解決結果
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// 別名インデックスに完全一致
    Exact(String),
    /// 類似度マッチ
    Fuzzy {
        canonical: String,
        alias: String,
        score: f64,
    },
    /// 解決できない
    Unknown,
}

impl Resolution {
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Resolution::Exact(canonical) => Some(canonical),
            Resolution::Fuzzy { canonical, .. } => Some(canonical),
            Resolution::Unknown => None,
        }
    }
}

/// 列マッピングの結果
///
/// `targets`は元の列位置ごとの正規フィールド名です（未知列は`None`）。
/// 同じラベルが重複していても位置で区別できます。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMapping {
    pub targets: Vec<Option<String>>,
    pub unknown: Vec<String>,
}

impl ColumnMapping {
    /// 解決された正規フィールド名（重複なし、出現順）
    pub fn resolved_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for target in self.targets.iter().flatten() {
            if !fields.contains(&target.as_str()) {
                fields.push(target);
            }
        }
        fields
    }

    /// 正規フィールドに対応する元の列位置
    ///
    /// 複数の列が同じフィールドに解決された場合は最後の列を返します。
    pub fn source_for(&self, canonical: &str) -> Option<usize> {
        self.targets
            .iter()
            .rposition(|target| target.as_deref() == Some(canonical))
    }
}

/// 列マッパー
#[derive(Debug, Clone)]
pub struct ColumnMapper<'a> {
    index: &'a AliasIndex,
    threshold: f64,
}

impl<'a> ColumnMapper<'a> {
    pub fn new(index: &'a AliasIndex) -> Self {
        Self::with_threshold(index, DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn with_threshold(index: &'a AliasIndex, threshold: f64) -> Self {
        Self { index, threshold }
    }

    /// ヘッダーのリストをマッピングする
    pub fn map_columns(&self, labels: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::default();
        for label in labels {
            let resolution = self.resolve(label);
            match &resolution {
                Resolution::Exact(canonical) => {
                    debug!("Column '{}' -> '{}' (exact)", label, canonical);
                }
                Resolution::Fuzzy {
                    canonical,
                    alias,
                    score,
                } => {
                    warn!(
                        "Column '{}' -> '{}' (fuzzy match on '{}', score {:.3})",
                        label, canonical, alias, score
                    );
                }
                Resolution::Unknown => mapping.unknown.push(label.clone()),
            }
            mapping
                .targets
                .push(resolution.canonical().map(str::to_string));
        }
        mapping
    }

    /// 1つのラベルを解決する
    ///
    /// 空のラベルは常に`Unknown`です。
    pub fn resolve(&self, label: &str) -> Resolution {
        let key = normalize_label(label);
        if key.is_empty() {
            return Resolution::Unknown;
        }
        if let Some(canonical) = self.index.exact(&key) {
            return Resolution::Exact(canonical.to_string());
        }
        self.match_fuzzy(&key)
    }

    /// 最も類似度の高い別名を選ぶ
    ///
    /// 同点の場合は正規フィールド名の辞書順、次に別名の辞書順で決めます。
    /// インデックスの走査順には依存しません。
    fn match_fuzzy(&self, key: &str) -> Resolution {
        let mut best: Option<(f64, &str, &str)> = None;
        for (alias, canonical) in self.index.entries() {
            let score = similarity(key, alias);
            let better = match best {
                None => true,
                Some((best_score, best_canonical, best_alias)) => {
                    score > best_score
                        || (score == best_score
                            && (canonical, alias) < (best_canonical, best_alias))
                }
            };
            if better {
                best = Some((score, canonical, alias));
            }
        }

        match best {
            Some((score, canonical, alias)) if score >= self.threshold => Resolution::Fuzzy {
                canonical: canonical.to_string(),
                alias: alias.to_string(),
                score,
            },
            _ => Resolution::Unknown,
        }
    }
}
