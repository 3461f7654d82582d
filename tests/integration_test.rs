//! Integration Tests for vbazero
//!
//! HTTPスタブサーバーとrust_xlsxwriterで生成したワークブックを使い、
//! 取得から抽出、メッセージ生成までの一連の流れを検証します。

use rust_xlsxwriter::*;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use vbazero::{ExtractorBuilder, FileReference, Status, ToolMessage};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// マクロを含まない通常のワークブック
    pub fn generate_plain_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Header1")?;
        worksheet.write_string(1, 0, "Data1")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// VBAプロジェクト（Module1, Sheet1, ThisWorkbook）を含むワークブック
    pub fn generate_macro_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        workbook.add_vba_project("tests/fixtures/vbaProject.bin")?;
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Macro")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// FATが空のままディレクトリの開始セクタを指すOLE2ヘッダ
    pub fn generate_broken_ole() -> Vec<u8> {
        let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        data.resize(512, 0);
        data[24..26].copy_from_slice(&0x003E_u16.to_le_bytes()); // minor version
        data[26..28].copy_from_slice(&3_u16.to_le_bytes()); // major version
        data[28..30].copy_from_slice(&0xFFFE_u16.to_le_bytes()); // byte order
        data[30..32].copy_from_slice(&9_u16.to_le_bytes()); // sector shift
        data[32..34].copy_from_slice(&6_u16.to_le_bytes()); // mini sector shift
        data[44..48].copy_from_slice(&0_u32.to_le_bytes()); // FAT sectors
        data[48..52].copy_from_slice(&0_u32.to_le_bytes()); // first directory sector
        data[56..60].copy_from_slice(&4096_u32.to_le_bytes()); // mini stream cutoff
        data[60..64].copy_from_slice(&0xFFFF_FFFE_u32.to_le_bytes()); // first mini FAT sector
        data[68..72].copy_from_slice(&0xFFFF_FFFE_u32.to_le_bytes()); // first DIFAT sector
        for slot in data[76..512].chunks_mut(4) {
            slot.copy_from_slice(&0xFFFF_FFFF_u32.to_le_bytes());
        }
        data.resize(1024, 0);
        data
    }
}

/// パスごとに固定のレスポンスを返すHTTPスタブを起動し、ベースURLを返す
fn serve(routes: HashMap<&'static str, (u16, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => continue,
            };

            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let path = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or("/")
                .to_string();

            // ヘッダーを読み捨てる
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }

            let (status, body) = routes
                .get(path.as_str())
                .cloned()
                .unwrap_or((404, b"not found".to_vec()));
            let head = format!(
                "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    base
}

#[test]
fn test_plain_workbook_has_no_macros() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let base = serve(HashMap::from([("/plain.xlsx", (200, workbook))]));

    let extractor = ExtractorBuilder::new().build().unwrap();
    let files = vec![FileReference::new("plain.xlsx")
        .with_extension(".xlsx")
        .with_url(format!("{}/plain.xlsx", base))];

    let response = extractor.invoke(&files);

    let aggregate = response.aggregate().unwrap();
    assert_eq!(aggregate.status, Status::Success);
    assert_eq!(aggregate.total_files, 1);
    assert_eq!(aggregate.successful_extractions, 1);

    let record = &aggregate.results[0];
    assert_eq!(record.found_macros, Some(false));
    assert_eq!(record.modules.as_deref(), Some(&[][..]));
    assert_eq!(
        record.summary.as_deref(),
        Some("No VBA macros found in the file")
    );
    assert_eq!(record.original_format, "xlsx");
    assert_eq!(
        response.final_text(),
        Some("Extracted VBA code from plain.xlsx: No VBA macros found in the file")
    );
}

#[test]
fn test_default_extension_is_xlsm() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let base = serve(HashMap::from([("/download", (200, workbook))]));

    let extractor = ExtractorBuilder::new().build().unwrap();
    let files = vec![FileReference::new("book").with_url(format!("{}/download", base))];

    let response = extractor.invoke(&files);

    let record = &response.aggregate().unwrap().results[0];
    assert_eq!(record.original_format, "xlsm");
    assert_eq!(record.found_macros, Some(false));
    assert!(record.error.is_none());
}

#[test]
fn test_corrupt_file_is_captured() {
    let base = serve(HashMap::from([(
        "/corrupt.xlsm",
        (200, b"this is not a zip archive".to_vec()),
    )]));

    let extractor = ExtractorBuilder::new().build().unwrap();
    let files = vec![FileReference::from_url(&format!("{}/corrupt.xlsm", base))];

    let response = extractor.invoke(&files);

    let record = &response.aggregate().unwrap().results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.found_macros, Some(false));
    assert!(record.error.is_some());
    assert!(record
        .summary
        .as_deref()
        .unwrap()
        .starts_with("Error while processing the file: "));
}

#[test]
fn test_batch_with_http_404() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let base = serve(HashMap::from([
        ("/a.xlsx", (200, workbook.clone())),
        ("/c.xlsx", (200, workbook)),
    ]));

    let extractor = ExtractorBuilder::new().with_default_extension("xlsx").build().unwrap();
    let files = vec![
        FileReference::from_url(&format!("{}/a.xlsx", base)),
        FileReference::from_url(&format!("{}/missing.xlsx", base)),
        FileReference::from_url(&format!("{}/c.xlsx", base)),
    ];

    let response = extractor.invoke(&files);

    // 404のエラーテキスト → 集約JSON → 最終レポート
    assert_eq!(response.messages.len(), 3);
    match &response.messages[0] {
        ToolMessage::Text(text) => {
            assert!(text.starts_with("Error processing file missing.xlsx: "));
            assert!(text.contains("404"));
        }
        other => panic!("Expected error text, got {:?}", other),
    }
    assert!(matches!(response.messages[1], ToolMessage::Json(_)));

    let aggregate = response.aggregate().unwrap();
    assert_eq!(aggregate.total_files, 3);
    assert_eq!(aggregate.successful_extractions, 2);
    assert_eq!(aggregate.results[1].status, Status::Error);
    assert_eq!(aggregate.results[1].filename, "missing.xlsx");

    let report = response.final_text().unwrap();
    assert!(report.contains("ファイル 1: a.xlsx"));
    assert!(report.contains("ファイル 2: c.xlsx"));
}

#[test]
fn test_transient_files_are_cleaned_up() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let base = serve(HashMap::from([
        ("/ok.xlsx", (200, workbook)),
        ("/bad.xlsm", (200, b"garbage".to_vec())),
    ]));
    let temp_dir = tempfile::tempdir().unwrap();

    let extractor = ExtractorBuilder::new()
        .with_temp_dir(temp_dir.path())
        .build()
        .unwrap();
    let files = vec![
        FileReference::from_url(&format!("{}/ok.xlsx", base)).with_extension(".xlsx"),
        FileReference::from_url(&format!("{}/bad.xlsm", base)),
        FileReference::from_url(&format!("{}/gone.xlsm", base)),
        FileReference::new("inline.xlsm").with_content(b"also garbage".to_vec()),
    ];

    let response = extractor.invoke(&files);

    assert_eq!(response.aggregate().unwrap().successful_extractions, 3);
    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "transient files left: {:?}", leftovers);
}

#[test]
fn test_inline_workbook() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let extractor = ExtractorBuilder::new().build().unwrap();

    let response = extractor.invoke(&[FileReference::new("local.xlsx")
        .with_extension("xlsx")
        .with_content(workbook)]);

    let record = &response.aggregate().unwrap().results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.found_macros, Some(false));
}

#[test]
fn test_empty_input() {
    let extractor = ExtractorBuilder::new().build().unwrap();

    let response = extractor.invoke(&[]);

    assert_eq!(response.texts(), vec!["No files provided"]);
    let json = serde_json::to_value(response.aggregate().unwrap()).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["results"], serde_json::json!([]));
}

#[test]
fn test_aggregate_json_schema() {
    let workbook = fixtures::generate_plain_workbook().unwrap();
    let base = serve(HashMap::from([("/s.xlsx", (200, workbook))]));

    let extractor = ExtractorBuilder::new().build().unwrap();
    let files = vec![
        FileReference::from_url(&format!("{}/s.xlsx", base)).with_extension(".xlsx"),
        FileReference::from_url(&format!("{}/nope.xlsx", base)),
    ];

    let response = extractor.invoke(&files);
    let json = serde_json::to_value(response.aggregate().unwrap()).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["total_files"], 2);
    assert_eq!(json["successful_extractions"], 1);

    let ok = &json["results"][0];
    assert_eq!(ok["filename"], "s.xlsx");
    assert_eq!(ok["original_format"], "xlsx");
    assert_eq!(ok["found_macros"], false);
    assert_eq!(ok["modules"], serde_json::json!([]));
    assert_eq!(ok["status"], "success");

    let failed = &json["results"][1];
    assert_eq!(failed["status"], "error");
    assert!(failed["error"].as_str().unwrap().contains("404"));
    assert!(failed.get("modules").is_none());
}

#[test]
fn test_macro_workbook_modules() {
    let workbook = fixtures::generate_macro_workbook().unwrap();
    let base = serve(HashMap::from([("/macro.xlsm", (200, workbook))]));
    let temp_dir = tempfile::tempdir().unwrap();

    let extractor = ExtractorBuilder::new()
        .with_temp_dir(temp_dir.path())
        .build()
        .unwrap();
    let files = vec![FileReference::from_url(&format!("{}/macro.xlsm", base))];

    let response = extractor.invoke(&files);

    let record = &response.aggregate().unwrap().results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.found_macros, Some(true));
    assert!(record.error.is_none());
    assert_eq!(record.summary.as_deref(), Some("Found 3 VBA modules"));

    let modules = record.modules.as_ref().unwrap();
    let names: Vec<&str> = modules.iter().map(|m| m.module_name.as_str()).collect();
    assert_eq!(names, vec!["Module1", "Sheet1", "ThisWorkbook"]);
    assert!(modules[0].code.contains("Sub Macro1()"));
    assert!(modules[0].code.contains("ActiveCell.FormulaR1C1 = \"123\""));
    assert!(modules[2].code.contains("Attribute VB_Name = \"ThisWorkbook\""));

    assert_eq!(
        response.final_text(),
        Some("Extracted VBA code from macro.xlsm: Found 3 VBA modules")
    );

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "transient files left: {:?}", leftovers);
}

#[test]
fn test_broken_container_does_not_stop_batch() {
    let plain = fixtures::generate_plain_workbook().unwrap();
    let macro_book = fixtures::generate_macro_workbook().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();

    let extractor = ExtractorBuilder::new()
        .with_temp_dir(temp_dir.path())
        .build()
        .unwrap();
    let files = vec![
        FileReference::new("plain.xlsx")
            .with_extension("xlsx")
            .with_content(plain),
        FileReference::new("bad.xls")
            .with_extension("xls")
            .with_content(fixtures::generate_broken_ole()),
        FileReference::new("macro.xlsm").with_content(macro_book),
    ];

    let response = extractor.invoke(&files);

    // 集約JSONと最終テキストのみ（抽出の失敗はファイル単位のテキストを出さない）
    assert_eq!(response.messages.len(), 2);
    let aggregate = response.aggregate().unwrap();
    assert_eq!(aggregate.status, Status::Success);
    assert_eq!(aggregate.results.len(), 3);
    assert_eq!(aggregate.successful_extractions, 3);
    assert!(aggregate.message.is_none());

    let broken = &aggregate.results[1];
    assert_eq!(broken.filename, "bad.xls");
    assert_eq!(broken.status, Status::Success);
    assert_eq!(broken.found_macros, Some(false));

    assert_eq!(aggregate.results[2].found_macros, Some(true));

    let report = response.final_text().unwrap();
    assert!(report.contains("ファイル 1: plain.xlsx"));
    assert!(report.contains("ファイル 2: bad.xls"));
    assert!(report.contains("ファイル 3: macro.xlsm"));
    assert!(report.contains("モジュール: Module1"));

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "transient files left: {:?}", leftovers);
}

#[test]
fn test_xls_content_without_declared_extension() {
    // 拡張子の指定がなくxlsmとして開けない場合も、内容から判定する
    let vba_project = std::fs::read("tests/fixtures/vbaProject.bin").unwrap();
    let extractor = ExtractorBuilder::new().build().unwrap();

    let response = extractor.invoke(&[FileReference::new("legacy").with_content(vba_project)]);

    let record = &response.aggregate().unwrap().results[0];
    assert_eq!(record.original_format, "xlsm");
    assert_eq!(record.found_macros, Some(true));
    assert_eq!(record.modules.as_ref().unwrap().len(), 3);
}
