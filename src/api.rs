//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// シート選択方式
///
/// 変換対象のシートを選択する方法を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// インデックス指定（0始まり、デフォルトは最初のシート）
    ///
    /// 例: `SheetSelector::Index(0)` は最初のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),

    /// すべてのシートを変換
    ///
    /// 出力は`sheets`マップを持つ複数シート形式になります。
    All,
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

/// シート名を明示する接頭辞（`name:all`、`name:2024`など）
pub const SHEET_NAME_PREFIX: &str = "name:";

impl FromStr for SheetSelector {
    type Err = std::convert::Infallible;

    /// `all`（大文字小文字を区別しない）、数値、またはシート名として解釈する
    ///
    /// `all`や数字だけの名前のシートは`name:`接頭辞で名前として指定します。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(name) = trimmed.strip_prefix(SHEET_NAME_PREFIX) {
            return Ok(SheetSelector::Name(name.to_string()));
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(SheetSelector::All);
        }
        match trimmed.parse::<usize>() {
            Ok(index) => Ok(SheetSelector::Index(index)),
            Err(_) => Ok(SheetSelector::Name(trimmed.to_string())),
        }
    }
}

/// 列の推論型
///
/// 明示的なルールを持たない列について、サンプル値から分類した結果です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    /// 空でない値がサンプルに存在しない
    Empty,

    /// 数値として解析できる
    NumericString,

    /// 日付のような値
    DateLike,

    /// 通常のテキスト
    Text,

    /// 先頭ゼロを持つ数値コード（出力時は常に文字列のまま）
    TextPreserveFormat,

    /// 複数のカテゴリが混在（データ品質フラグ）
    Mixed,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Empty => "empty",
            InferredType::NumericString => "numeric_string",
            InferredType::DateLike => "date_like",
            InferredType::Text => "text",
            InferredType::TextPreserveFormat => "text_preserve_format",
            InferredType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
