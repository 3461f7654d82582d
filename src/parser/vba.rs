//! VBA Extractor
//!
//! calamineの`vba`モジュールを使用して、ワークブックに埋め込まれた
//! VBAプロジェクトからモジュールのソースコードを取り出します。

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use calamine::vba::VbaProject;
use calamine::{open_workbook_auto, Reader};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::api::{ExtractionResult, ModuleInfo};
use crate::error::VbaZeroError;
use crate::transient::TransientFile;

/// OLE2（Compound File Binary）のシグネチャ
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// ZIPのローカルファイルヘッダのシグネチャ
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// VBAストレージに必ず存在するストリーム名
const VBA_PROJECT_STREAM: &str = "_VBA_PROJECT";

/// OOXMLコンテナ内のVBAプロジェクトの位置（Word, PowerPoint, Excel）
const VBA_PARTS: [&str; 3] = ["word/vbaProject.bin", "ppt/vbaProject.bin", "xl/vbaProject.bin"];

/// ファイル内容からマクロを抽出する能力
pub trait MacroExtractor: std::fmt::Debug {
    /// ファイル内容からVBAモジュールを抽出する
    ///
    /// # 引数
    ///
    /// * `bytes` - ファイル内容
    /// * `extension` - ファイル形式のヒントとなる拡張子（先頭の`.`付き）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExtractionResult)` - 抽出処理が実行された場合。解析の失敗は
    ///   `ExtractionResult::error`に格納されます。
    /// * `Err(VbaZeroError)` - 解析の前段（一時ファイルの作成など）で失敗した場合
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<ExtractionResult, VbaZeroError>;
}

/// calamineによるVBA抽出
///
/// calamineはファイルパスの拡張子から形式（xlsx/xlsm/xlsb/xls/ods）を判定するため、
/// 内容を拡張子付きの一時ファイルに書き出してから解析します。
///
/// 拡張子による解析に失敗した場合は内容のシグネチャで判定し直します。
/// Word/PowerPointの文書（doc/docm/pptm）や、拡張子が実際の形式と異なる
/// ファイルもこの経路で扱われます。
#[derive(Debug, Clone, Default)]
pub struct CalamineExtractor {
    /// 一時ファイルの作成先（`None`の場合はシステムの一時ディレクトリ）
    temp_dir: Option<PathBuf>,
}

impl CalamineExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一時ファイルの作成先を指定する
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl MacroExtractor for CalamineExtractor {
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<ExtractionResult, VbaZeroError> {
        let transient = TransientFile::persist(bytes, extension, self.temp_dir.as_deref())?;

        let result = match read_vba_modules(transient.path()) {
            Ok(found) => found_result(found),
            Err(e) => match sniff_vba_modules(bytes) {
                Some(Ok(found)) => {
                    log::debug!("Read VBA project by content signature after: {}", e);
                    found_result(found)
                }
                Some(Err(sniffed)) => {
                    log::debug!("Content-based VBA read failed: {}", sniffed);
                    log::warn!("VBA extraction failed: {}", e);
                    ExtractionResult::failed(e)
                }
                None => {
                    log::warn!("VBA extraction failed: {}", e);
                    ExtractionResult::failed(e)
                }
            },
        };

        // 削除の失敗は抽出結果を変えない（ドロップ時にも削除が試みられる）
        if let Err(e) = transient.remove() {
            log::warn!("Failed to remove transient file: {}", e);
        }

        Ok(result)
    }
}

fn found_result(found: Option<Vec<ModuleInfo>>) -> ExtractionResult {
    match found {
        Some(modules) => ExtractionResult::with_modules(modules),
        None => ExtractionResult::no_macros(),
    }
}

/// ワークブックのVBAプロジェクトからモジュールを読み出す
///
/// # 戻り値
///
/// * `Ok(Some(modules))` - VBAプロジェクトが存在する場合（モジュール名の昇順）
/// * `Ok(None)` - VBAプロジェクトが存在しない場合
/// * `Err(VbaZeroError)` - ワークブックまたはVBAプロジェクトの解析に失敗した場合
pub(crate) fn read_vba_modules(path: &Path) -> Result<Option<Vec<ModuleInfo>>, VbaZeroError> {
    let mut workbook = open_workbook_auto(path)?;

    let project = match workbook.vba_project() {
        Some(project) => project?,
        None => return Ok(None),
    };

    let modules = project_modules(&project)?;
    log::debug!("Read {} VBA modules from {}", modules.len(), path.display());
    Ok(Some(modules))
}

/// 内容のシグネチャからコンテナ形式を判定してVBAモジュールを読み出す
///
/// # 戻り値
///
/// * `None` - OLE2でもZIPでもない場合
/// * `Some(Ok(None))` - コンテナにVBAプロジェクトが含まれない場合
/// * `Some(Ok(Some(modules)))` - VBAプロジェクトを読み出せた場合
/// * `Some(Err(_))` - コンテナまたはVBAプロジェクトの解析に失敗した場合
pub(crate) fn sniff_vba_modules(
    bytes: &[u8],
) -> Option<Result<Option<Vec<ModuleInfo>>, VbaZeroError>> {
    if bytes.starts_with(&OLE_MAGIC) {
        Some(read_ole_container(bytes))
    } else if bytes.starts_with(&ZIP_MAGIC) {
        Some(read_zip_container(bytes))
    } else {
        None
    }
}

/// OLE2コンテナ（xls/doc/ppt、またはvbaProject.bin単体）
///
/// calamineはストリームを名前だけで検索するため、VBAストレージの位置
/// （`_VBA_PROJECT_CUR/VBA`や`Macros/VBA`）によらずファイル全体を渡せる。
fn read_ole_container(bytes: &[u8]) -> Result<Option<Vec<ModuleInfo>>, VbaZeroError> {
    if !contains_utf16_name(bytes, VBA_PROJECT_STREAM) {
        return Ok(None);
    }
    parse_project(bytes).map(Some)
}

/// OOXMLコンテナ（xlsm/docm/pptm）
fn read_zip_container(bytes: &[u8]) -> Result<Option<Vec<ModuleInfo>>, VbaZeroError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| VbaZeroError::Zip(e.to_string()))?;

    for part in VBA_PARTS {
        let mut file = match archive.by_name(part) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(VbaZeroError::Zip(e.to_string())),
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        log::debug!("Found {} ({} bytes)", part, data.len());
        return parse_project(&data).map(Some);
    }

    Ok(None)
}

fn parse_project(data: &[u8]) -> Result<Vec<ModuleInfo>, VbaZeroError> {
    let mut reader = data;
    let project = VbaProject::new(&mut reader, data.len())?;
    project_modules(&project)
}

fn project_modules(project: &VbaProject) -> Result<Vec<ModuleInfo>, VbaZeroError> {
    let mut modules = Vec::new();
    for name in project.get_module_names() {
        let code = project.get_module(name)?;
        modules.push(ModuleInfo::new(name, code));
    }
    Ok(modules)
}

/// ディレクトリエントリ名（UTF-16LE）がバイト列に含まれるか
fn contains_utf16_name(bytes: &[u8], name: &str) -> bool {
    let needle: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    bytes.windows(needle.len()).any(|window| window == needle.as_slice())
}
