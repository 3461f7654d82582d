//! Summary Report
//!
//! 集約レスポンスの後に発行する、人間向けの最終テキストを組み立てる。

use crate::api::ExtractionResult;

/// 複数ファイルのレポートでセクションを区切る罫線の長さ
const RULE_WIDTH: usize = 50;

/// 抽出に成功したファイルの一覧から最終テキストを生成する
///
/// * 0件: 抽出できなかった旨の通知
/// * 1件: ファイル名と要約の1文
/// * 2件以上: ファイルごとのモジュール名とコードを罫線で区切ったレポート（入力順）
pub(crate) fn final_summary(successes: &[(&str, &ExtractionResult)]) -> String {
    match successes {
        [] => "No VBA code could be extracted from the provided files.".to_string(),
        [(filename, result)] => {
            format!("Extracted VBA code from {}: {}", filename, result.summary)
        }
        _ => multi_file_report(successes),
    }
}

fn multi_file_report(successes: &[(&str, &ExtractionResult)]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut report = String::new();

    for (idx, (filename, result)) in successes.iter().enumerate() {
        report.push_str(&format!("\n{}\n", rule));
        report.push_str(&format!("ファイル {}: {}\n", idx + 1, filename));
        report.push_str(&format!("{}\n\n", rule));
        report.push_str(&format!("概要: {}\n\n", result.summary));

        if result.found_macros {
            for module in &result.modules {
                report.push_str(&format!("モジュール: {}\n", module.module_name));
                report.push_str(&format!("コード:\n{}\n\n", module.code));
            }
        }
    }

    report.trim().to_string()
}
