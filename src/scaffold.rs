use crate::config::VoicebankConfig;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// ボイスバンクのベースフォルダを作成する
///
/// `<folder_path>/<name>/` を作り、その下に収録ピッチ名のサンプル
/// フォルダと `character.txt` を生成する。カバー画像が設定されて
/// いればフォルダ内へコピーし、`character.txt` に記載する。
///
/// # Errors
///
/// 名前または親フォルダが未設定の場合、カバー画像の形式が
/// bmp/jpg以外の場合、ディレクトリやファイルの作成に失敗した場合に
/// エラーを返す。
///
/// # Examples
///
/// ```no_run
/// # use vb_studio::config::VoicebankConfig;
/// # use vb_studio::scaffold::create_base_folder;
/// let mut vb = VoicebankConfig::default();
/// vb.name = "MyBank".to_string();
/// vb.folder_path = "/home/user/voicebanks".to_string();
/// let root = create_base_folder(&vb).unwrap();
/// assert!(root.ends_with("MyBank"));
/// ```
pub fn create_base_folder(vb: &VoicebankConfig) -> Result<PathBuf> {
    let name = vb.name.trim();
    if name.is_empty() {
        bail!("ボイスバンク名が設定されていません");
    }
    if vb.folder_path.trim().is_empty() {
        bail!("ボイスバンクフォルダの親ディレクトリが設定されていません");
    }

    let root = Path::new(vb.folder_path.trim()).join(name);
    fs::create_dir_all(&root)
        .with_context(|| format!("ボイスバンクフォルダの作成に失敗: {:?}", root))?;

    // 収録ピッチ名のサンプルフォルダ
    let samples_dir = root.join(vb.pitch.trim());
    fs::create_dir_all(&samples_dir)
        .with_context(|| format!("サンプルフォルダの作成に失敗: {:?}", samples_dir))?;

    let mut character = String::new();
    character.push_str(&format!("name: {}\n", name));
    character.push_str(&format!("author: {}\n", vb.author.trim()));
    character.push_str(&format!("voice: {}\n", vb.voice.trim()));
    character.push_str(&format!("version: {}\n", vb.version.trim()));

    if !vb.cover_path.trim().is_empty() {
        let cover_path = Path::new(vb.cover_path.trim());
        let is_supported = cover_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                ext == "bmp" || ext == "jpg"
            })
            .unwrap_or(false);
        if !is_supported {
            bail!(
                "カバー画像はbmpまたはjpg形式のみ対応しています: {:?}",
                cover_path
            );
        }

        let file_name = cover_path
            .file_name()
            .with_context(|| format!("カバー画像のファイル名が不正です: {:?}", cover_path))?;
        character.push_str(&format!("cover: {}\n", file_name.to_string_lossy()));

        fs::copy(cover_path, root.join(file_name))
            .with_context(|| format!("カバー画像のコピーに失敗: {:?}", cover_path))?;
    }

    let character_path = root.join("character.txt");
    fs::write(&character_path, character)
        .with_context(|| format!("character.txtの書き込みに失敗: {:?}", character_path))?;

    log::info!("ボイスバンクフォルダを作成しました: {:?}", root);

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vb_config(temp_dir: &TempDir) -> VoicebankConfig {
        VoicebankConfig {
            name: "TestBank".to_string(),
            author: "author".to_string(),
            voice: "voice".to_string(),
            version: "1.0".to_string(),
            pitch: "A4".to_string(),
            folder_path: temp_dir.path().to_string_lossy().to_string(),
            cover_path: String::new(),
        }
    }

    #[test]
    fn test_creates_folder_tree() {
        let temp_dir = TempDir::new().unwrap();
        let vb = vb_config(&temp_dir);

        let root = create_base_folder(&vb).unwrap();
        assert!(root.is_dir());
        assert!(root.join("A4").is_dir());

        let character = fs::read_to_string(root.join("character.txt")).unwrap();
        assert!(character.contains("name: TestBank"));
        assert!(character.contains("author: author"));
        assert!(character.contains("voice: voice"));
        assert!(character.contains("version: 1.0"));
        assert!(!character.contains("cover:"));
    }

    #[test]
    fn test_copies_cover_image() {
        let temp_dir = TempDir::new().unwrap();
        let cover = temp_dir.path().join("cover.jpg");
        fs::write(&cover, b"jpeg data").unwrap();

        let mut vb = vb_config(&temp_dir);
        vb.cover_path = cover.to_string_lossy().to_string();

        let root = create_base_folder(&vb).unwrap();
        assert!(root.join("cover.jpg").exists());

        let character = fs::read_to_string(root.join("character.txt")).unwrap();
        assert!(character.contains("cover: cover.jpg"));
    }

    #[test]
    fn test_rejects_unsupported_cover_format() {
        let temp_dir = TempDir::new().unwrap();
        let cover = temp_dir.path().join("cover.png");
        fs::write(&cover, b"png data").unwrap();

        let mut vb = vb_config(&temp_dir);
        vb.cover_path = cover.to_string_lossy().to_string();

        assert!(create_base_folder(&vb).is_err());
    }

    #[test]
    fn test_missing_name_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut vb = vb_config(&temp_dir);
        vb.name = "  ".to_string();

        assert!(create_base_folder(&vb).is_err());
    }

    #[test]
    fn test_missing_folder_path_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut vb = vb_config(&temp_dir);
        vb.folder_path = String::new();

        assert!(create_base_folder(&vb).is_err());
    }
}
