//! Output Format Module
//!
//! 呼び出し結果（メッセージ列）の出力形式と、最終サマリーテキストの生成を提供するモジュール。

mod formatters;
pub(crate) mod report;

use crate::api::ToolResponse;
use crate::error::VbaZeroError;
use std::io::Write;

pub use formatters::*;

/// メッセージ列の出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum MessageFormat {
    /// 1メッセージ1行のJSON（デフォルト）
    ///
    /// ```text
    /// {"type":"text","message":"Error processing file a.xlsm: ..."}
    /// {"type":"json","message":{"status":"success",...}}
    /// {"type":"text","message":"Extracted VBA code from b.xlsm: Found 2 VBA modules"}
    /// ```
    #[default]
    JsonLines,

    /// 人間向けのテキスト
    Text,
}

impl MessageFormat {
    /// メッセージ列を指定された形式で出力する
    ///
    /// # 引数
    ///
    /// * `response` - 出力するメッセージ列
    /// * `writer` - 出力先のライター
    pub fn render<W: Write>(
        &self,
        response: &ToolResponse,
        writer: &mut W,
    ) -> Result<(), VbaZeroError> {
        match self {
            MessageFormat::JsonLines => JsonLinesFormatter.render(response, writer),
            MessageFormat::Text => TextFormatter.render(response, writer),
        }
    }
}
