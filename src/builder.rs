//! Builder Module
//!
//! Fluent Builder APIを提供し、`VbaExtractor`インスタンスを段階的に構築する。
//! `VbaExtractor`はファイルごとの取得・抽出を順に実行し、メッセージ列を組み立てます。

use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{
    normalize_extension, AggregateResponse, ExtractionResult, FileRecord, FileReference,
    ToolResponse, DEFAULT_EXTENSION,
};
use crate::error::VbaZeroError;
use crate::fetcher::{FileFetcher, HttpFetcher};
use crate::output::report;
use crate::parser::{CalamineExtractor, MacroExtractor};
use crate::security::{validate_extension, SecurityConfig};

/// 入力ファイルが空の場合のメッセージ
const NO_FILES_MESSAGE: &str = "No files provided";

/// 抽出処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ExtractionConfig {
    /// 拡張子が宣言されていないファイルに使用する拡張子
    pub default_extension: String,

    /// セキュリティ制限
    pub security: SecurityConfig,

    /// HTTPリクエストのタイムアウト（Noneの場合は無制限）
    pub timeout: Option<Duration>,

    /// 一時ファイルの作成先（Noneの場合はシステムの一時ディレクトリ）
    pub temp_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_extension: DEFAULT_EXTENSION.to_string(),
            security: SecurityConfig::default(),
            timeout: None,
            temp_dir: None,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
/// フェッチャーと抽出器を差し替えることで、ネットワークやファイルシステムを使わずに
/// 処理の流れを検証できます。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::time::Duration;
/// use vbazero::ExtractorBuilder;
///
/// # fn main() -> Result<(), vbazero::VbaZeroError> {
/// let extractor = ExtractorBuilder::new()
///     .with_default_extension(".xlsm")
///     .with_timeout(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ExtractorBuilder {
    /// 内部設定（構築中）
    config: ExtractionConfig,

    fetcher: Option<Box<dyn FileFetcher>>,

    extractor: Option<Box<dyn MacroExtractor>>,
}

impl ExtractorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - デフォルト拡張子: `.xlsm`
    /// - 最大ダウンロードサイズ: 100MB
    /// - タイムアウト: なし
    /// - 一時ディレクトリ: システムの一時ディレクトリ
    /// - フェッチャー: `HttpFetcher`
    /// - 抽出器: `CalamineExtractor`
    pub fn new() -> Self {
        Self::default()
    }

    /// 拡張子が宣言されていないファイルに使用する拡張子を指定する
    ///
    /// 先頭の`.`は省略できます。
    pub fn with_default_extension(mut self, extension: &str) -> Self {
        self.config.default_extension = normalize_extension(extension.trim());
        self
    }

    /// ダウンロードするファイルの最大サイズ（バイト）を指定する
    ///
    /// インラインで渡されたファイル内容にも同じ上限を適用します。
    pub fn with_max_download_size(mut self, bytes: u64) -> Self {
        self.config.security.max_download_size = bytes;
        self
    }

    /// HTTPリクエストのタイムアウトを指定する
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// 一時ファイルの作成先ディレクトリを指定する
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// ファイル取得の実装を差し替える
    pub fn with_fetcher(mut self, fetcher: impl FileFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// マクロ抽出の実装を差し替える
    pub fn with_extractor(mut self, extractor: impl MacroExtractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// 設定を検証し、`VbaExtractor`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `VbaZeroError::Config(String)`: 設定の検証に失敗した場合
    ///   * デフォルト拡張子が不正
    ///   * 最大ダウンロードサイズが0
    ///   * タイムアウトが0
    ///   * 一時ディレクトリが存在しない
    pub fn build(self) -> Result<VbaExtractor, VbaZeroError> {
        // 1. デフォルト拡張子の検証
        validate_extension(&self.config.default_extension).map_err(|msg| {
            VbaZeroError::Config(format!("Invalid default extension: {}", msg))
        })?;

        // 2. サイズ上限の検証
        if self.config.security.max_download_size == 0 {
            return Err(VbaZeroError::Config(
                "Maximum download size must be greater than zero".to_string(),
            ));
        }

        // 3. タイムアウトの検証
        if self.config.timeout == Some(Duration::ZERO) {
            return Err(VbaZeroError::Config(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        // 4. 一時ディレクトリの検証
        if let Some(dir) = &self.config.temp_dir {
            if !dir.is_dir() {
                return Err(VbaZeroError::Config(format!(
                    "Temporary directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        // 5. 協調オブジェクトの決定
        let config = self.config;
        let fetcher: Box<dyn FileFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Box::new(HttpFetcher::new(
                config.timeout,
                config.security.max_download_size,
            )),
        };
        let extractor: Box<dyn MacroExtractor> = match (self.extractor, &config.temp_dir) {
            (Some(extractor), _) => extractor,
            (None, Some(dir)) => Box::new(CalamineExtractor::new().with_temp_dir(dir)),
            (None, None) => Box::new(CalamineExtractor::new()),
        };

        Ok(VbaExtractor {
            config,
            fetcher,
            extractor,
        })
    }
}

/// 抽出処理のファサード
///
/// ファイル参照の一覧を受け取り、ファイルごとに取得・抽出を行い、
/// 発行順のメッセージ列（エラーテキスト、集約JSON、最終テキスト）を返します。
///
/// # 使用例
///
/// ```rust,no_run
/// use vbazero::{ExtractorBuilder, FileReference};
///
/// # fn main() -> Result<(), vbazero::VbaZeroError> {
/// let extractor = ExtractorBuilder::new().build()?;
/// let files = vec![FileReference::from_url("https://example.com/book.xlsm")];
/// let response = extractor.invoke(&files);
/// for text in response.texts() {
///     println!("{}", text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct VbaExtractor {
    config: ExtractionConfig,
    fetcher: Box<dyn FileFetcher>,
    extractor: Box<dyn MacroExtractor>,
}

impl VbaExtractor {
    /// ファイル一覧からVBAマクロを抽出する
    ///
    /// ファイル単位の失敗はメッセージとレコードに変換され、残りのファイルの処理は継続します。
    /// 抽出中のpanicはそのファイルの`error`に変換されます。それ以外の想定外のpanicも
    /// メッセージに変換し、集約レスポンスを必ず1つ含めます。
    ///
    /// # 処理フロー
    ///
    /// 1. 入力が空ならエラーの集約レスポンスを返す
    /// 2. 各ファイルについて処理（ループ）
    ///    - 拡張子の決定と検証
    ///    - ファイル内容の取得（URLまたはインライン）
    ///    - 一時ファイルへの書き出しとマクロ抽出
    /// 3. 集約レスポンス
    /// 4. 最終サマリーテキスト
    pub fn invoke(&self, files: &[FileReference]) -> ToolResponse {
        let mut response = ToolResponse::default();

        if files.is_empty() {
            log::warn!("{}", NO_FILES_MESSAGE);
            response.push_text(NO_FILES_MESSAGE);
            response.push_json(AggregateResponse::empty_input(NO_FILES_MESSAGE));
            return response;
        }

        let mut records = Vec::with_capacity(files.len());
        let mut successes: Vec<(String, ExtractionResult)> = Vec::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for file in files {
                self.process_file(file, &mut response, &mut records, &mut successes);
            }
        }));

        match outcome {
            Ok(()) => {
                let aggregate = AggregateResponse::from_records(files.len(), records);
                log::info!(
                    "Extracted VBA from {}/{} files",
                    aggregate.successful_extractions,
                    aggregate.total_files
                );
                response.push_json(aggregate);

                let successes: Vec<(&str, &ExtractionResult)> = successes
                    .iter()
                    .map(|(filename, result)| (filename.as_str(), result))
                    .collect();
                response.push_text(report::final_summary(&successes));
            }
            Err(payload) => {
                let detail = panic_message(&*payload);
                let message = format!("Error extracting VBA code: {}", detail);
                log::error!("{}", message);
                response.push_text(message);
                response.push_json(AggregateResponse::aborted(
                    files.len(),
                    records,
                    VbaZeroError::Unexpected(detail).to_string(),
                ));
            }
        }

        response
    }

    /// 1ファイルを処理し、結果をレコードとメッセージに反映する
    fn process_file(
        &self,
        file: &FileReference,
        response: &mut ToolResponse,
        records: &mut Vec<FileRecord>,
        successes: &mut Vec<(String, ExtractionResult)>,
    ) {
        let extension = file.resolved_extension(&self.config.default_extension);

        match self.extract_file(file, &extension) {
            Ok(result) => {
                log::info!("{}: {}", file.filename, result.summary);
                records.push(FileRecord::success(&file.filename, &extension, &result));
                successes.push((file.filename.clone(), result));
            }
            Err(e) => {
                let message = format!("Error processing file {}: {}", file.filename, e);
                log::warn!("{}", message);
                response.push_text(message.clone());
                records.push(FileRecord::failure(&file.filename, &extension, message));
            }
        }
    }

    fn extract_file(
        &self,
        file: &FileReference,
        extension: &str,
    ) -> Result<ExtractionResult, VbaZeroError> {
        validate_extension(extension).map_err(VbaZeroError::SecurityViolation)?;
        let bytes = self.resolve_bytes(file)?;

        // 壊れた入力でライブラリがpanicしても、そのファイルの失敗として扱う
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.extractor.extract(&bytes, extension)
        })) {
            Ok(result) => result,
            Err(payload) => {
                let detail = panic_message(&*payload);
                log::warn!("Extraction of {} panicked: {}", file.filename, detail);
                Ok(ExtractionResult::failed(detail))
            }
        }
    }

    /// ファイル内容を取得する
    ///
    /// URLがあれば取得し、なければインラインの内容を使用します。
    fn resolve_bytes<'a>(&self, file: &'a FileReference) -> Result<Cow<'a, [u8]>, VbaZeroError> {
        if let Some(url) = &file.url {
            log::debug!("Fetching {} from {}", file.filename, url);
            return self.fetcher.fetch(url).map(Cow::Owned);
        }

        match &file.content {
            Some(content) => {
                let max = self.config.security.max_download_size;
                if content.len() as u64 > max {
                    return Err(VbaZeroError::SecurityViolation(format!(
                        "Inline content exceeds maximum size: {} bytes (max: {} bytes)",
                        content.len(),
                        max
                    )));
                }
                Ok(Cow::Borrowed(content.as_slice()))
            }
            None => Err(VbaZeroError::MissingSource {
                filename: file.filename.clone(),
            }),
        }
    }
}

/// panicのペイロードからメッセージを取り出す
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
