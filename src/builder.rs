//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use log::{debug, info};
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::SheetSelector;
use crate::error::XlsxToJsonError;
use crate::output::ConversionOutput;
use crate::parser::WorkbookReader;
use crate::pipeline::{
    JsonLinesLogger, LogFacadeLogger, PipelineLogger, Preprocessor, DEFAULT_FUZZY_THRESHOLD,
    DEFAULT_SAMPLE_SIZE,
};
use crate::reference::{AliasOutcome, ReferenceCache, ReferenceData};
use crate::security::{validate_extension, validate_input_path, SecurityConfig, SUPPORTED_EXTENSIONS};
use crate::types::ProcessingMetadata;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConversionConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// クリーニングを行うか
    pub cleaning: bool,

    /// ファジーマッチの閾値（0.0〜1.0）
    pub fuzzy_threshold: f64,

    /// 型推論のサンプル数
    pub sample_size: usize,

    /// セキュリティ制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::default(),
            cleaning: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use guarantee_xlsx::{ConverterBuilder, SheetSelector};
///
/// # fn main() -> Result<(), guarantee_xlsx::XlsxToJsonError> {
/// let converter = ConverterBuilder::new()
///     .with_sheet_selector(SheetSelector::All)
///     .with_cleaning(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    config: ConversionConfig,
    reference: Option<Arc<ReferenceCache>>,
    log_path: Option<PathBuf>,
    logger: Option<Arc<dyn PipelineLogger>>,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: 先頭のシート（インデックス0）
    /// - クリーニング: 有効
    /// - ファジーマッチの閾値: 0.9
    /// - 型推論のサンプル数: 10
    /// - 参照データ: 組み込みの既定データ
    /// - パイプラインログ: `log`ファサードへ転送
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
            reference: None,
            log_path: None,
            logger: None,
        }
    }

    /// 変換対象のシートを選択する
    ///
    /// `SheetSelector::All`の場合、出力は複数シート形式になります。
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// クリーニング（ルール適用・空行削除）の有効/無効
    ///
    /// 無効の場合でも銀行名の正規化とnull変換は行われます。
    pub fn with_cleaning(mut self, cleaning: bool) -> Self {
        self.config.cleaning = cleaning;
        self
    }

    /// ファジーマッチの閾値を設定する（`build()`で0.0〜1.0を検証）
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.config.fuzzy_threshold = threshold;
        self
    }

    /// 型推論のサンプル数を設定する（1以上）
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.config.sample_size = sample_size;
        self
    }

    /// 共有の参照データキャッシュを使用する
    ///
    /// 複数の`Converter`で同じキャッシュを共有すると、別名の追加が全体に反映されます。
    pub fn with_reference_cache(mut self, cache: Arc<ReferenceCache>) -> Self {
        self.reference = Some(cache);
        self
    }

    /// 固定の参照データを使用する
    pub fn with_reference_data(mut self, data: ReferenceData) -> Self {
        self.reference = Some(Arc::new(ReferenceCache::with_data(data)));
        self
    }

    /// パイプラインログをJSON Lines形式でファイルに追記する
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// 任意のパイプラインロガーを使用する
    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// 入力ファイルの最大サイズ（バイト）
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合
    /// * `Err(XlsxToJsonError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * ファジーマッチの閾値が0.0〜1.0の範囲外
    /// * サンプル数が0
    /// * 入力サイズの上限が0
    /// * `with_log_path`と`with_logger`の両方が指定された
    /// * ログファイルの親ディレクトリを作成できない（`Io`）
    pub fn build(self) -> Result<Converter, XlsxToJsonError> {
        let threshold = self.config.fuzzy_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(XlsxToJsonError::Config(format!(
                "Fuzzy threshold must be between 0.0 and 1.0 (got {})",
                threshold
            )));
        }

        if self.config.sample_size == 0 {
            return Err(XlsxToJsonError::Config(
                "Sample size must be at least 1".to_string(),
            ));
        }

        if self.config.security.max_input_file_size == 0 {
            return Err(XlsxToJsonError::Config(
                "Maximum input size must be greater than 0".to_string(),
            ));
        }

        let logger: Arc<dyn PipelineLogger> = match (self.log_path, self.logger) {
            (Some(_), Some(_)) => {
                return Err(XlsxToJsonError::Config(
                    "with_log_path and with_logger cannot be combined".to_string(),
                ))
            }
            (Some(path), None) => Arc::new(JsonLinesLogger::new(path)?),
            (None, Some(logger)) => logger,
            (None, None) => Arc::new(LogFacadeLogger),
        };

        Ok(Converter {
            config: self.config,
            reference: self
                .reference
                .unwrap_or_else(|| Arc::new(ReferenceCache::default())),
            logger,
        })
    }
}

/// 変換処理のファサード
///
/// Excelファイルを正規化済みの保証書レコード（JSON）に変換するメインエントリーポイントです。
/// シートは1枚ずつ順に処理され、どれか1枚でも失敗すると変換全体が失敗します。
///
/// # 使用例
///
/// ```rust,no_run
/// use guarantee_xlsx::ConverterBuilder;
///
/// # fn main() -> Result<(), guarantee_xlsx::XlsxToJsonError> {
/// let converter = ConverterBuilder::new().build()?;
/// let output = converter.convert_file("guarantees.xlsx")?;
/// println!("{}", output.to_json_pretty()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    config: ConversionConfig,
    reference: Arc<ReferenceCache>,
    logger: Arc<dyn PipelineLogger>,
}

impl Converter {
    /// サポートする拡張子（小文字、ドットなし）
    pub fn supported_extensions() -> &'static [&'static str] {
        SUPPORTED_EXTENSIONS
    }

    /// ファイルを変換する
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxToJsonError::Input)` - ファイルが存在しない、または拡張子がサポート外の場合
    ///   （解析は開始されません）
    pub fn convert_file(&self, path: impl AsRef<Path>) -> Result<ConversionOutput, XlsxToJsonError> {
        let path = path.as_ref();
        validate_input_path(path)?;
        let len = fs::metadata(path)?.len();
        let len = usize::try_from(len).map_err(|_| {
            XlsxToJsonError::SecurityViolation(format!(
                "Input file size exceeds addressable memory: {} bytes",
                len
            ))
        })?;
        self.config.security.check_input_size(len)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = fs::read(path)?;
        self.convert_bytes(&file_name, &bytes)
    }

    /// メモリ上のバイト列を変換する
    ///
    /// # 引数
    ///
    /// * `file_name` - 元のファイル名（拡張子の検証と出力の`file_name`に使用）
    /// * `bytes` - ワークブックのバイト列
    ///
    /// # 処理フロー
    ///
    /// 1. 拡張子とサイズの検証
    /// 2. ワークブックを開いてシートを選択
    /// 3. 参照データのスナップショットを取得
    /// 4. 各シートについてパイプラインを実行（順に、1枚ずつ）
    /// 5. 単一シート / 複数シートの出力を組み立てる
    pub fn convert_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ConversionOutput, XlsxToJsonError> {
        validate_extension(file_name)?;
        let security = &self.config.security;
        let mut reader = WorkbookReader::open(bytes.to_vec(), security)?;
        let sheet_names = reader.select_sheets(&self.config.sheet_selector)?;

        // 変換中は同じスナップショットを使い続ける
        let reference = self.reference.get()?;
        let preprocessor = Preprocessor::new(&reference, self.logger.as_ref())
            .with_cleaning(self.config.cleaning)
            .with_fuzzy_threshold(self.config.fuzzy_threshold)
            .with_sample_size(self.config.sample_size);

        let mut processed = Vec::with_capacity(sheet_names.len());
        for sheet_name in &sheet_names {
            debug!("Processing sheet '{}' of {}", sheet_name, file_name);
            let table = reader.read_sheet(sheet_name, security)?;
            let metadata = ProcessingMetadata::new(file_name, sheet_name, self.config.cleaning);
            processed.push(preprocessor.process(table, metadata)?);
        }

        let output = match (&self.config.sheet_selector, processed.pop()) {
            (SheetSelector::All, last) => {
                processed.extend(last);
                ConversionOutput::multi(file_name, self.config.cleaning, processed)
            }
            (_, Some(sheet)) => ConversionOutput::single(file_name, sheet),
            (_, None) => {
                return Err(XlsxToJsonError::Input(format!(
                    "No sheet selected in {}",
                    file_name
                )))
            }
        };

        info!(
            "Converted {}: {} sheet(s), {} records",
            file_name,
            output.sheet_count(),
            output.records_count()
        );
        Ok(output)
    }

    /// リーダーから読み込み、整形済みJSONをライターに書き出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConversionOutput)` - 書き出した変換結果
    pub fn convert<R: Read, W: Write>(
        &self,
        file_name: &str,
        input: R,
        output: W,
    ) -> Result<ConversionOutput, XlsxToJsonError> {
        let bytes = self.read_limited(input)?;
        let result = self.convert_bytes(file_name, &bytes)?;

        let mut writer = BufWriter::new(output);
        writer.write_all(result.to_json_pretty()?.as_bytes())?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(result)
    }

    /// リーダーから読み込み、整形済みJSON文字列を返す
    pub fn convert_to_string<R: Read>(
        &self,
        file_name: &str,
        input: R,
    ) -> Result<String, XlsxToJsonError> {
        let bytes = self.read_limited(input)?;
        self.convert_bytes(file_name, &bytes)?.to_json_pretty()
    }

    /// ワークブック内のシート名（ブック内の順）
    pub fn sheet_names(&self, bytes: &[u8]) -> Result<Vec<String>, XlsxToJsonError> {
        Ok(WorkbookReader::open(bytes.to_vec(), &self.config.security)?.sheet_names())
    }

    /// 現在の参照データのスナップショット
    pub fn reference(&self) -> Result<Arc<ReferenceData>, XlsxToJsonError> {
        self.reference.get()
    }

    pub fn reference_cache(&self) -> &Arc<ReferenceCache> {
        &self.reference
    }

    /// 正規フィールドに別名を追加する
    ///
    /// 以降の変換から新しい別名が使われます。
    pub fn add_alias(&self, canonical: &str, alias: &str) -> Result<AliasOutcome, XlsxToJsonError> {
        self.reference.add_alias(canonical, alias)
    }

    /// サイズ上限を超えない範囲で入力を読み込む
    fn read_limited<R: Read>(&self, input: R) -> Result<Vec<u8>, XlsxToJsonError> {
        let limit = self.config.security.max_input_file_size;
        let mut buffer = Vec::new();
        input.take(limit.saturating_add(1)).read_to_end(&mut buffer)?;
        self.config.security.check_input_size(buffer.len())?;
        Ok(buffer)
    }
}
