//! Parser Module
//!
//! calamineを使用したVBAマクロ抽出の実装。
//! 抽出処理は`MacroExtractor`トレイトとして抽象化されています。

mod vba;

pub use vba::{CalamineExtractor, MacroExtractor};
