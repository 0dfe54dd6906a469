//! Type Inferencer
//!
//! 明示的なルールを持たない列について、先頭のサンプル値から型を推論する。

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use crate::api::InferredType;
use crate::formatter::{strip_amount_text, to_ascii_digits};
use crate::reference::FieldRule;
use crate::types::CellValue;

/// 既定のサンプル数
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}|\d{1,2}:\d{2}")
            .expect("date pattern is a valid regex")
    })
}

fn digit_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+([-/]\d+)*$").expect("digit code pattern is a valid regex"))
}

/// サンプルの分析結果
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAnalysis {
    pub inferred: InferredType,
    /// サンプル中に現れたカテゴリ（重複なし、順序固定）
    pub types_found: Vec<InferredType>,
    pub numeric_ratio: f64,
    pub text_ratio: f64,
}

impl ColumnAnalysis {
    /// ルールを持つ列の分析結果（ルールのクラスをそのまま型とする）
    pub fn for_rule(rule: FieldRule) -> Self {
        let inferred = match rule {
            FieldRule::Text => InferredType::Text,
            FieldRule::Numeric => InferredType::NumericString,
            FieldRule::Date => InferredType::DateLike,
        };
        Self {
            inferred,
            types_found: vec![inferred],
            numeric_ratio: if rule == FieldRule::Numeric { 1.0 } else { 0.0 },
            text_ratio: if rule == FieldRule::Text { 1.0 } else { 0.0 },
        }
    }

    fn empty() -> Self {
        Self {
            inferred: InferredType::Empty,
            types_found: Vec::new(),
            numeric_ratio: 0.0,
            text_ratio: 0.0,
        }
    }

    /// 複数のカテゴリが混在しているか
    pub fn mixed_types(&self) -> bool {
        self.types_found.len() > 1
    }
}

/// 出力の`data_types`に載る列の説明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    #[serde(rename = "type")]
    pub inferred: InferredType,
    /// 最初の空でない出力値
    pub sample: String,
    /// 欠損を除いた出力値の種類数
    pub distinct_count: usize,
    pub types_found: Vec<InferredType>,
    pub numeric_ratio: f64,
    pub text_ratio: f64,
    pub mixed_types: bool,
}

impl ColumnProfile {
    /// 分析結果と正規化後の列値から生成する
    pub fn new<'v>(analysis: ColumnAnalysis, values: impl IntoIterator<Item = Option<&'v str>>) -> Self {
        let mut sample = None;
        let mut distinct = HashSet::new();
        for value in values.into_iter().flatten() {
            if sample.is_none() && !value.trim().is_empty() {
                sample = Some(value.to_string());
            }
            distinct.insert(value);
        }

        let mixed_types = analysis.mixed_types();
        Self {
            inferred: analysis.inferred,
            sample: sample.unwrap_or_default(),
            distinct_count: distinct.len(),
            types_found: analysis.types_found,
            numeric_ratio: analysis.numeric_ratio,
            text_ratio: analysis.text_ratio,
            mixed_types,
        }
    }
}

/// 型推論器
#[derive(Debug, Clone, Copy)]
pub struct TypeInferencer {
    sample_size: usize,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl TypeInferencer {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// 1つの値を分類する（空の値は`None`）
    ///
    /// 数値 → 日付らしさ → テキストの順に判定します。
    pub fn classify(&self, cell: &CellValue) -> Option<InferredType> {
        match cell {
            CellValue::Empty => None,
            CellValue::Number(_) => Some(InferredType::NumericString),
            CellValue::Date(_) => Some(InferredType::DateLike),
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) if is_numeric_text(s) => Some(InferredType::NumericString),
            CellValue::Text(s) if is_date_like_text(s) => Some(InferredType::DateLike),
            CellValue::Text(_) => Some(InferredType::Text),
        }
    }

    /// 列の先頭`sample_size`件を分析する
    pub fn analyze<'v>(&self, values: impl IntoIterator<Item = &'v CellValue>) -> ColumnAnalysis {
        let mut found = BTreeSet::new();
        let mut total = 0usize;
        let mut numeric = 0usize;
        let mut text = 0usize;
        let mut all_digit_codes = true;
        let mut zero_padded = false;

        for cell in values.into_iter().take(self.sample_size) {
            let Some(category) = self.classify(cell) else {
                continue;
            };
            total += 1;
            match category {
                InferredType::NumericString => numeric += 1,
                InferredType::Text => text += 1,
                _ => {}
            }
            found.insert(category);
            all_digit_codes &= is_digit_code(cell);
            zero_padded |= is_zero_padded(cell);
        }

        if total == 0 {
            return ColumnAnalysis::empty();
        }

        let types_found: Vec<InferredType> = found.into_iter().collect();
        let inferred = if all_digit_codes
            && zero_padded
            && !types_found.contains(&InferredType::Text)
        {
            InferredType::TextPreserveFormat
        } else if types_found.len() == 1 {
            types_found[0]
        } else {
            InferredType::Mixed
        };

        ColumnAnalysis {
            inferred,
            types_found,
            numeric_ratio: numeric as f64 / total as f64,
            text_ratio: text as f64 / total as f64,
        }
    }
}

/// 区切り記号・通貨記号・空白を取り除いた後に数値として読めるか
fn is_numeric_text(text: &str) -> bool {
    let cleaned: String = strip_amount_text(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    !cleaned.is_empty()
        && cleaned
            .parse::<f64>()
            .map(|value| value.is_finite())
            .unwrap_or(false)
}

fn is_date_like_text(text: &str) -> bool {
    date_pattern().is_match(&to_ascii_digits(text))
}

/// 数字（と`-` `/`区切り）だけから成るコードか
fn is_digit_code(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => digit_code_pattern().is_match(&to_ascii_digits(s.trim())),
        CellValue::Number(n) => n.fract() == 0.0 && *n >= 0.0,
        CellValue::Date(_) | CellValue::Empty => false,
    }
}

/// 先頭ゼロを持つ2文字以上の数字コードか
fn is_zero_padded(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => {
            let s = to_ascii_digits(s.trim());
            s.len() > 1 && s.starts_with('0') && digit_code_pattern().is_match(&s)
        }
        _ => false,
    }
}
