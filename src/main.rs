//! vbazero CLI
//!
//! URLまたはローカルファイルを受け取り、VBAマクロを抽出してメッセージ列を出力します。

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use vbazero::{
    is_remote_url, ExtractorBuilder, FileReference, MessageFormat, ToolParameters,
};

/// Extract embedded VBA macro code from Office documents (xls/xlsm/xlsb, doc/docm, pptm)
#[derive(Debug, Parser)]
#[command(name = "vbazero", version, about)]
struct Cli {
    /// URLs to download or local workbook paths
    files: Vec<String>,

    /// Tool parameters JSON document ({"files": [...]}); use "-" for stdin
    #[arg(long, value_name = "PATH")]
    request: Option<String>,

    /// Message output format
    #[arg(long, value_enum, default_value_t = Format::JsonLines)]
    format: Format,

    /// Extension used when a file does not declare one
    #[arg(long, env = "VBAZERO_DEFAULT_EXTENSION", default_value = ".xlsm")]
    default_extension: String,

    /// Maximum accepted file size in bytes
    #[arg(long, env = "VBAZERO_MAX_DOWNLOAD_SIZE")]
    max_download_size: Option<u64>,

    /// HTTP request timeout in seconds (no timeout when omitted)
    #[arg(long, env = "VBAZERO_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Directory for transient workbook files
    #[arg(long, env = "VBAZERO_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    JsonLines,
    Text,
}

impl From<Format> for MessageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::JsonLines => MessageFormat::JsonLines,
            Format::Text => MessageFormat::Text,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// 集約レスポンスが成功ならtrueを返す
fn run(cli: &Cli) -> Result<bool> {
    let mut builder = ExtractorBuilder::new().with_default_extension(&cli.default_extension);
    if let Some(size) = cli.max_download_size {
        builder = builder.with_max_download_size(size);
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.with_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &cli.temp_dir {
        builder = builder.with_temp_dir(dir);
    }
    let extractor = builder.build()?;

    let files = collect_files(cli)?;
    let response = extractor.invoke(&files);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    MessageFormat::from(cli.format).render(&response, &mut handle)?;

    Ok(response.is_success())
}

/// リクエストJSONと位置引数からファイル参照を集める
fn collect_files(cli: &Cli) -> Result<Vec<FileReference>> {
    let mut files = Vec::new();

    if let Some(source) = &cli.request {
        let raw = if source == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            buffer
        } else {
            fs::read_to_string(source)
                .with_context(|| format!("Failed to read request file {}", source))?
        };
        let params: ToolParameters =
            serde_json::from_str(&raw).context("Invalid request JSON")?;
        files.extend(params.into_references());
    }

    for arg in &cli.files {
        files.push(file_from_arg(arg)?);
    }

    if files.is_empty() && cli.request.is_none() {
        bail!("No input: pass file paths/URLs or --request");
    }

    Ok(files)
}

/// 位置引数をファイル参照に変換する
///
/// URLはそのまま、ローカルパスは読み込んでインラインの内容とします。
fn file_from_arg(arg: &str) -> Result<FileReference> {
    if is_remote_url(arg) {
        return Ok(FileReference::from_url(arg));
    }

    let path = Path::new(arg);
    let content = fs::read(path).with_context(|| format!("Failed to read {}", arg))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| arg.to_string());

    let mut reference = FileReference::new(filename).with_content(content);
    if let Some(ext) = path.extension() {
        reference = reference.with_extension(format!(".{}", ext.to_string_lossy()));
    }
    Ok(reference)
}
