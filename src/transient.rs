//! Transient File Module
//!
//! パスベースのAPIしか持たない解析ライブラリに渡すための一時ファイルを扱う。
//! `TransientFile`がドロップされると、成功・失敗にかかわらずファイルは削除されます。

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::VbaZeroError;

/// 一時ファイル名の接頭辞
const PREFIX: &str = "vbazero-";

/// 処理中のファイル内容を保持する一時ファイル
#[derive(Debug)]
pub(crate) struct TransientFile {
    inner: NamedTempFile,
}

impl TransientFile {
    /// バイト列を一意な名前の一時ファイルに書き出す
    ///
    /// # 引数
    ///
    /// * `bytes` - 書き出すファイル内容
    /// * `extension` - ファイル名の接尾辞（検証済みの拡張子）
    /// * `dir` - 作成先ディレクトリ（`None`の場合はシステムの一時ディレクトリ）
    pub fn persist(
        bytes: &[u8],
        extension: &str,
        dir: Option<&Path>,
    ) -> Result<Self, VbaZeroError> {
        let mut builder = Builder::new();
        builder.prefix(PREFIX).suffix(extension);

        let mut inner = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        inner.write_all(bytes)?;
        inner.flush()?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), inner.path().display());
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// ファイルを明示的に削除する
    ///
    /// ドロップ時の削除と異なり、削除の失敗を呼び出し元に返します。
    pub fn remove(self) -> Result<PathBuf, VbaZeroError> {
        let path = self.inner.path().to_path_buf();
        self.inner.close()?;
        log::debug!("Removed {}", path.display());
        Ok(path)
    }
}
