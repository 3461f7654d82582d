//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! ダウンロードサイズの上限と、一時ファイル名に使用する拡張子の検証を提供します。

/// 拡張子として許容する最大文字数（先頭の`.`を含む）
const MAX_EXTENSION_LEN: usize = 16;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// ダウンロードするファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_download_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_download_size: 104_857_600, // 100MB
        }
    }
}

/// 拡張子の検証
///
/// 拡張子は一時ファイル名の接尾辞として使用されるため、
/// 一時ディレクトリの外を指すパスにならないことを保証します。
///
/// # 引数
///
/// * `extension` - 検証する拡張子（`.xlsm`または`xlsm`）
///
/// # 戻り値
///
/// * `Ok(())` - 拡張子が安全な場合
/// * `Err(String)` - 拡張子が危険な場合（空、パス区切り文字、`..`、長すぎるものなど）
pub(crate) fn validate_extension(extension: &str) -> Result<(), String> {
    let bare = extension.strip_prefix('.').unwrap_or(extension);

    if bare.is_empty() {
        return Err("Empty extension is not allowed".to_string());
    }

    if extension.len() > MAX_EXTENSION_LEN {
        return Err(format!(
            "Extension is too long: {} characters (max: {})",
            extension.len(),
            MAX_EXTENSION_LEN
        ));
    }

    if bare.contains("..") {
        return Err(format!("Path traversal detected in extension: {}", extension));
    }

    if bare.contains('/') || bare.contains('\\') {
        return Err(format!("Path separator in extension is not allowed: {}", extension));
    }

    if !bare
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(format!("Invalid character in extension: {}", extension));
    }

    Ok(())
}
