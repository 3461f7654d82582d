//! Fetcher Module
//!
//! ファイル参照のURLからバイト列を取得するモジュール。
//! 取得処理は`FileFetcher`トレイトとして抽象化され、テストではモックに差し替えられます。

use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::error::VbaZeroError;

/// URLからファイル内容を取得する能力
pub trait FileFetcher: std::fmt::Debug {
    /// URLのファイル内容を取得する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 2xxレスポンスの本文
    /// * `Err(VbaZeroError::Fetch)` - 2xx以外のステータス
    /// * `Err(VbaZeroError::Network)` - レスポンスを受け取れなかった場合
    fn fetch(&self, url: &str) -> Result<Vec<u8>, VbaZeroError>;
}

/// `ureq`によるブロッキングHTTPフェッチャー
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_size: u64,
}

impl HttpFetcher {
    /// フェッチャーを生成する
    ///
    /// # 引数
    ///
    /// * `timeout` - リクエスト全体のタイムアウト（`None`の場合は無制限）
    /// * `max_size` - 受け付ける本文の最大サイズ（バイト）
    pub fn new(timeout: Option<Duration>, max_size: u64) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            max_size,
        }
    }
}

impl FileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, VbaZeroError> {
        log::debug!("GET {}", url);

        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(VbaZeroError::Fetch {
                    url: url.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(VbaZeroError::Network {
                    url: url.to_string(),
                    message: transport.to_string(),
                })
            }
        };

        // 上限+1バイトまで読み、超過していればエラーとする
        let mut buffer = Vec::new();
        response
            .into_reader()
            .take(self.max_size + 1)
            .read_to_end(&mut buffer)?;

        if buffer.len() as u64 > self.max_size {
            return Err(VbaZeroError::SecurityViolation(format!(
                "Downloaded file exceeds maximum size: {} bytes",
                self.max_size
            )));
        }

        log::debug!("Fetched {} bytes from {}", buffer.len(), url);
        Ok(buffer)
    }
}

/// 文字列が取得可能なリモートURL（http/https）かを判定する
pub fn is_remote_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// URLから表示用のファイル名を取得する
///
/// パスの最後の空でないセグメントを使用し、取得できなければURL全体を返します。
pub(crate) fn filename_from_url(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.to_string())
}
