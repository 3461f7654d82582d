//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// vbazeroクレート全体で使用するエラー型
///
/// ファイルの取得、一時ファイルへの書き出し、VBAプロジェクトの解析中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// `VbaExtractor::invoke()`はこのエラーを呼び出し元に返さず、
/// ファイル単位の結果レコード（`status: "error"`または`error`フィールド）に変換します。
///
/// # 使用例
///
/// ```rust,no_run
/// use vbazero::VbaZeroError;
/// use std::fs::File;
///
/// fn read_workbook(path: &str) -> Result<(), VbaZeroError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum VbaZeroError {
    /// I/O操作中に発生したエラー
    ///
    /// 一時ファイルの作成・書き込み失敗、ローカルファイルの読み込み失敗など。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse workbook: {0}")]
    Parse(#[from] calamine::Error),

    /// VBAプロジェクトの解析中に発生したエラー
    ///
    /// モジュールの解凍失敗など、calamineの`vba`モジュールが返すエラーです。
    #[error("Failed to read VBA project: {0}")]
    Vba(#[from] calamine::vba::VbaError),

    /// ZIPコンテナ（docm/pptmなど）の解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// HTTPサーバーが2xx以外のステータスを返したエラー
    ///
    /// # 例
    ///
    /// ```rust
    /// use vbazero::VbaZeroError;
    ///
    /// let error = VbaZeroError::Fetch {
    ///     url: "https://example.com/book.xlsm".to_string(),
    ///     status: 404,
    /// };
    /// assert_eq!(error.to_string(), "Failed to download file from URL: 404");
    /// ```
    #[error("Failed to download file from URL: {status}")]
    Fetch {
        /// 取得対象のURL
        url: String,
        /// HTTPステータスコード
        status: u16,
    },

    /// 接続失敗・DNS解決失敗など、レスポンスを受け取る前に発生したエラー
    #[error("Network error while fetching {url}: {message}")]
    Network {
        /// 取得対象のURL
        url: String,
        /// 下位レイヤーのエラーメッセージ
        message: String,
    },

    /// URLもインラインデータも持たないファイル参照
    #[error("File '{filename}' has neither a URL nor inline content")]
    MissingSource {
        /// 表示用ファイル名
        filename: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ExtractorBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ダウンロードサイズの上限超過や、一時ファイルのパスを操作し得る拡張子など。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// ファイル単位の処理境界の外側で発生した想定外の失敗（panicなど）
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}
