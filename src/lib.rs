//! vbazero - Download Office macro documents and extract their embedded VBA modules
//!
//! This crate takes a batch of file references (URLs or inline bytes), fetches each file,
//! reads its VBA project with `calamine`, and returns an ordered list of messages:
//! per-file error texts, one structured aggregate, and one human-readable summary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vbazero::{ExtractorBuilder, FileReference, ToolMessage};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new().build()?;
//!
//!     let files = vec![
//!         FileReference::from_url("https://example.com/files/budget.xlsm"),
//!         FileReference::new("report.xls")
//!             .with_extension(".xls")
//!             .with_url("https://example.com/download?id=42"),
//!     ];
//!
//!     let response = extractor.invoke(&files);
//!     for message in &response.messages {
//!         match message {
//!             ToolMessage::Text(text) => println!("{}", text),
//!             ToolMessage::Json(aggregate) => {
//!                 println!("{}", serde_json::to_string_pretty(aggregate)?)
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Inline Content
//!
//! Files that are already in memory skip the download step:
//!
//! ```rust,no_run
//! use vbazero::{ExtractorBuilder, FileReference};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = ExtractorBuilder::new().build()?;
//! let bytes = std::fs::read("macro.xlsm")?;
//! let response = extractor.invoke(&[FileReference::new("macro.xlsm").with_content(bytes)]);
//! println!("{}", response.final_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! # Plugin Parameters
//!
//! ```rust,no_run
//! use vbazero::{ExtractorBuilder, MessageFormat, ToolParameters};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params: ToolParameters = serde_json::from_str(
//!     r#"{"files": [{"filename": "a.xlsm", "extension": ".xlsm", "url": "https://example.com/a"}]}"#,
//! )?;
//! let extractor = ExtractorBuilder::new().build()?;
//! let response = extractor.invoke(&params.into_references());
//! MessageFormat::JsonLines.render(&response, &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod error;
mod fetcher;
mod output;
mod parser;
mod security;
mod transient;

// 公開API
pub use api::{
    AggregateResponse, ExtractionResult, FileParam, FileRecord, FileReference, ModuleInfo,
    Status, ToolMessage, ToolParameters, ToolResponse, DEFAULT_EXTENSION,
};
pub use builder::{ExtractorBuilder, VbaExtractor};
pub use error::VbaZeroError;
pub use fetcher::{is_remote_url, FileFetcher, HttpFetcher};
pub use output::MessageFormat;
pub use parser::{CalamineExtractor, MacroExtractor};
