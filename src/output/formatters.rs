//! Output Formatters Implementation
//!
//! 各メッセージ出力形式の実装を提供するモジュール。

use crate::api::{ToolMessage, ToolResponse};
use crate::error::VbaZeroError;
use std::io::Write;

/// JSON Lines形式のフォーマッター
///
/// 1メッセージを1行のJSONオブジェクトとして出力します。
pub struct JsonLinesFormatter;

impl JsonLinesFormatter {
    pub fn render<W: Write>(
        &self,
        response: &ToolResponse,
        writer: &mut W,
    ) -> Result<(), VbaZeroError> {
        for message in &response.messages {
            serde_json::to_writer(&mut *writer, message).map_err(|e| {
                VbaZeroError::Config(format!("JSON serialization error: {}", e))
            })?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// テキスト形式のフォーマッター
///
/// テキストメッセージはそのまま、集約レスポンスは整形したJSONとして出力します。
pub struct TextFormatter;

impl TextFormatter {
    pub fn render<W: Write>(
        &self,
        response: &ToolResponse,
        writer: &mut W,
    ) -> Result<(), VbaZeroError> {
        for (idx, message) in response.messages.iter().enumerate() {
            if idx > 0 {
                writeln!(writer)?;
            }
            match message {
                ToolMessage::Text(text) => writeln!(writer, "{}", text)?,
                ToolMessage::Json(aggregate) => {
                    serde_json::to_writer_pretty(&mut *writer, aggregate).map_err(|e| {
                        VbaZeroError::Config(format!("JSON serialization error: {}", e))
                    })?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }
}
