//! Public API Types
//!
//! 公開APIで使用するデータ型を定義するモジュール。
//! 入力（ファイル参照）、ファイル単位の抽出結果、集約レスポンス、出力メッセージを含みます。

use serde::{Deserialize, Serialize};

/// 宣言された拡張子がない場合に使用する拡張子
pub const DEFAULT_EXTENSION: &str = ".xlsm";

/// 処理対象ファイルへの参照
///
/// 呼び出し元（プラグインホスト）から渡されるファイルハンドルです。
/// `url`があればHTTPで取得し、なければ`content`のバイト列をそのまま使用します。
///
/// # 使用例
///
/// ```rust
/// use vbazero::FileReference;
///
/// let remote = FileReference::from_url("https://example.com/files/report.xlsm");
/// assert_eq!(remote.filename, "report.xlsm");
///
/// let local = FileReference::new("book.xls")
///     .with_extension(".xls")
///     .with_content(vec![0xD0, 0xCF, 0x11, 0xE0]);
/// assert!(local.url.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileReference {
    /// 表示用ファイル名
    pub filename: String,

    /// ファイル拡張子（例: `.xlsm`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// ファイルの取得先URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// インラインのファイル内容
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl FileReference {
    /// ファイル名のみを持つ参照を生成する
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// URL文字列から参照を生成する
    ///
    /// ファイル名はURLパスの最後のセグメントから取得します。
    /// セグメントが取得できない場合はURL全体をファイル名とします。
    pub fn from_url(url: &str) -> Self {
        Self {
            filename: crate::fetcher::filename_from_url(url),
            url: Some(url.to_string()),
            ..Self::default()
        }
    }

    /// 拡張子を指定する
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// 取得先URLを指定する
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// インラインのファイル内容を指定する
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = Some(content);
        self
    }

    /// 使用する拡張子を決定する（先頭の`.`付き）
    ///
    /// 宣言された拡張子が空でなければそれを、そうでなければ`default`を返します。
    pub fn resolved_extension(&self, default: &str) -> String {
        let declared = self
            .extension
            .as_deref()
            .map(str::trim)
            .filter(|ext| !ext.is_empty() && *ext != ".");
        normalize_extension(declared.unwrap_or(default))
    }
}

/// 拡張子の先頭に`.`を付与する
pub(crate) fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

/// ツールパラメータ上のファイル指定
///
/// 構造化された参照と、URL文字列の両方を受け付けます。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileParam {
    /// URL文字列（`http://`または`https://`で始まるもの）
    Url(String),

    /// 構造化されたファイル参照
    Reference(FileReference),
}

impl From<FileParam> for FileReference {
    fn from(param: FileParam) -> Self {
        match param {
            FileParam::Reference(reference) => reference,
            FileParam::Url(raw) if crate::fetcher::is_remote_url(&raw) => {
                FileReference::from_url(&raw)
            }
            // URLとして解釈できない文字列は取得元なしの参照として扱い、処理時にエラーとする
            FileParam::Url(raw) => FileReference::new(raw),
        }
    }
}

/// プラグインホストから渡されるツールパラメータ
///
/// ```rust
/// use vbazero::ToolParameters;
///
/// let params: ToolParameters = serde_json::from_str(
///     r#"{"files": ["https://example.com/a.xlsm", {"filename": "b.xlsm", "url": "https://example.com/b"}]}"#,
/// ).unwrap();
/// assert_eq!(params.into_references().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolParameters {
    /// 処理対象ファイルの一覧
    #[serde(default)]
    pub files: Vec<FileParam>,
}

impl ToolParameters {
    /// ファイル参照の一覧に変換する
    pub fn into_references(self) -> Vec<FileReference> {
        self.files.into_iter().map(FileReference::from).collect()
    }
}

/// 抽出されたVBAモジュール
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// モジュール名（例: `Module1`, `ThisWorkbook`）
    pub module_name: String,

    /// モジュールのソースコード
    pub code: String,
}

impl ModuleInfo {
    pub fn new(module_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            code: code.into(),
        }
    }
}

/// ファイル単位のマクロ抽出結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// マクロが検出されたか
    pub found_macros: bool,

    /// 抽出されたモジュール（モジュール名の昇順）
    pub modules: Vec<ModuleInfo>,

    /// 結果の要約
    pub summary: String,

    /// 抽出中に発生したエラーの説明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// モジュールが見つかった場合の結果
    ///
    /// 空の一覧が渡された場合は[`ExtractionResult::no_macros`]と同じ結果になります。
    pub fn with_modules(modules: Vec<ModuleInfo>) -> Self {
        if modules.is_empty() {
            return Self::no_macros();
        }
        Self {
            found_macros: true,
            summary: format!("Found {} VBA modules", modules.len()),
            modules,
            error: None,
        }
    }

    /// マクロが見つからなかった場合の結果
    pub fn no_macros() -> Self {
        Self {
            found_macros: false,
            modules: Vec::new(),
            summary: "No VBA macros found in the file".to_string(),
            error: None,
        }
    }

    /// 抽出処理が失敗した場合の結果
    pub fn failed(error: impl std::fmt::Display) -> Self {
        let error = error.to_string();
        Self {
            found_macros: false,
            modules: Vec::new(),
            summary: format!("Error while processing the file: {}", error),
            error: Some(error),
        }
    }
}

/// 処理ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// 集約レスポンスの`results`に含まれるファイル単位のレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,

    /// 先頭の`.`を除いた拡張子
    pub original_format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_macros: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<ModuleInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub status: Status,
}

impl FileRecord {
    /// 抽出処理まで到達したファイルのレコード
    pub fn success(filename: &str, extension: &str, result: &ExtractionResult) -> Self {
        Self {
            filename: filename.to_string(),
            original_format: extension.trim_start_matches('.').to_string(),
            found_macros: Some(result.found_macros),
            summary: Some(result.summary.clone()),
            modules: Some(result.modules.clone()),
            error: result.error.clone(),
            status: Status::Success,
        }
    }

    /// 取得・一時ファイル作成の段階で失敗したファイルのレコード
    pub fn failure(filename: &str, extension: &str, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            original_format: extension.trim_start_matches('.').to_string(),
            found_macros: None,
            summary: None,
            modules: None,
            error: Some(message.into()),
            status: Status::Error,
        }
    }
}

/// 1回の呼び出しに対する集約レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub status: Status,
    pub total_files: usize,
    pub successful_extractions: usize,
    pub results: Vec<FileRecord>,

    /// 呼び出し全体に関するメッセージ（入力なし・想定外の失敗時のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AggregateResponse {
    /// レコードから集約レスポンスを組み立てる
    ///
    /// `successful_extractions`は`status == Success`のレコード数から計算します。
    pub fn from_records(total_files: usize, results: Vec<FileRecord>) -> Self {
        let successful_extractions = results
            .iter()
            .filter(|record| record.status == Status::Success)
            .count();
        let status = if successful_extractions > 0 {
            Status::Success
        } else {
            Status::Error
        };
        Self {
            status,
            total_files,
            successful_extractions,
            results,
            message: None,
        }
    }

    /// 入力ファイルがない場合のレスポンス
    pub fn empty_input(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::from_records(0, Vec::new())
        }
    }

    /// 想定外の失敗で中断した場合のレスポンス
    ///
    /// 中断までに集めたレコードを保持し、ステータスもそれらのレコードから決定します。
    pub fn aborted(total_files: usize, results: Vec<FileRecord>, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::from_records(total_files, results)
        }
    }
}

/// 呼び出し元へ返すメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum ToolMessage {
    /// 人間向けのテキスト
    Text(String),

    /// 構造化された集約レスポンス
    Json(AggregateResponse),
}

/// 1回の呼び出しで生成されたメッセージ列（発行順）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub messages: Vec<ToolMessage>,
}

impl ToolResponse {
    pub(crate) fn push_text(&mut self, text: impl Into<String>) {
        self.messages.push(ToolMessage::Text(text.into()));
    }

    pub(crate) fn push_json(&mut self, aggregate: AggregateResponse) {
        self.messages.push(ToolMessage::Json(aggregate));
    }

    /// 集約レスポンスを取得する
    pub fn aggregate(&self) -> Option<&AggregateResponse> {
        self.messages.iter().find_map(|message| match message {
            ToolMessage::Json(aggregate) => Some(aggregate),
            ToolMessage::Text(_) => None,
        })
    }

    /// テキストメッセージを発行順に取得する
    pub fn texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                ToolMessage::Text(text) => Some(text.as_str()),
                ToolMessage::Json(_) => None,
            })
            .collect()
    }

    /// 最後のテキストメッセージ（通常は最終サマリー）を取得する
    pub fn final_text(&self) -> Option<&str> {
        self.texts().last().copied()
    }

    /// 集約レスポンスのステータスが成功か
    pub fn is_success(&self) -> bool {
        self.aggregate()
            .map(|aggregate| aggregate.status == Status::Success)
            .unwrap_or(false)
    }
}
