use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// レクリスト（録音プロンプト一覧）の読み込み
///
/// 1行1音素のテキストファイルを順序を保ったまま読み込む。
/// 空白行は無視し、各行の前後の空白は取り除く。
///
/// ファイルハンドルは保持しない。`phonemes()` は呼び出しの度に
/// ファイルを読み直すため、外部での編集が次回読み込みに反映される。
///
/// # Examples
///
/// ```no_run
/// # use vb_studio::reclist::ReclistStore;
/// let store = ReclistStore::new("reclist.txt");
/// let phonemes = store.phonemes().unwrap();
/// for p in &phonemes {
///     println!("{}", p);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ReclistStore {
    path: PathBuf,
}

impl ReclistStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// レクリストファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 音素一覧をファイル順で取得
    ///
    /// # Errors
    ///
    /// ファイルが存在しない、または読み込めない場合にエラーを返す。
    pub fn phonemes(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("レクリストファイルの読み込みに失敗: {:?}", self.path))?;

        let phonemes = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(phonemes)
    }
}
