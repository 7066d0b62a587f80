use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// ボイスバンクフォルダをzipにパッケージする
///
/// フォルダの中身を相対パスのままアーカイブし、
/// `<dest_dir>/<フォルダ名>.zip` として保存する。
///
/// # Errors
///
/// 入力フォルダまたは出力先が存在しない場合、アーカイブの作成に
/// 失敗した場合にエラーを返す。
pub fn package_voicebank(folder: &Path, dest_dir: &Path) -> Result<PathBuf> {
    if !folder.is_dir() {
        bail!("ボイスバンクフォルダが見つかりません: {:?}", folder);
    }
    if !dest_dir.is_dir() {
        bail!("zipの出力先フォルダが見つかりません: {:?}", dest_dir);
    }

    let name = folder
        .file_name()
        .with_context(|| format!("フォルダ名を取得できません: {:?}", folder))?;
    let zip_path = dest_dir.join(format!("{}.zip", name.to_string_lossy()));

    let file = fs::File::create(&zip_path)
        .with_context(|| format!("zipファイルの作成に失敗: {:?}", zip_path))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_dir(&mut writer, folder, folder, options)?;

    writer
        .finish()
        .with_context(|| format!("zipファイルのファイナライズに失敗: {:?}", zip_path))?;

    log::info!("ボイスバンクをパッケージしました: {:?}", zip_path);

    Ok(zip_path)
}

/// ディレクトリを再帰的にアーカイブへ追加
fn add_dir(
    writer: &mut zip::ZipWriter<fs::File>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("ディレクトリの読み込みに失敗: {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        // zipエントリ名は常に'/'区切りの相対パス
        let rel = path
            .strip_prefix(root)
            .with_context(|| "相対パスの計算に失敗")?
            .to_string_lossy()
            .replace('\\', "/");

        if path.is_dir() {
            writer
                .add_directory(rel.as_str(), options)
                .with_context(|| format!("ディレクトリエントリの追加に失敗: {}", rel))?;
            add_dir(writer, root, &path, options)?;
        } else {
            writer
                .start_file(rel.as_str(), options)
                .with_context(|| format!("ファイルエントリの追加に失敗: {}", rel))?;
            let data =
                fs::read(&path).with_context(|| format!("ファイルの読み込みに失敗: {:?}", path))?;
            writer.write_all(&data)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_voicebank() {
        let temp_dir = TempDir::new().unwrap();

        // ボイスバンクフォルダを模したツリーを作る
        let vb_root = temp_dir.path().join("TestBank");
        fs::create_dir_all(vb_root.join("A4")).unwrap();
        fs::write(vb_root.join("character.txt"), "name: TestBank\n").unwrap();
        fs::write(vb_root.join("A4").join("ka.wav"), b"wav data").unwrap();

        let dest = temp_dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let zip_path = package_voicebank(&vb_root, &dest).unwrap();
        assert_eq!(zip_path, dest.join("TestBank.zip"));
        assert!(zip_path.exists());

        // アーカイブの中身を確認
        let file = fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "character.txt"));
        assert!(names.iter().any(|n| n == "A4/ka.wav"));
    }

    #[test]
    fn test_missing_folder_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nothing");
        assert!(package_voicebank(&missing, temp_dir.path()).is_err());
    }

    #[test]
    fn test_missing_dest_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let vb_root = temp_dir.path().join("TestBank");
        fs::create_dir_all(&vb_root).unwrap();

        let missing_dest = temp_dir.path().join("no_dest");
        assert!(package_voicebank(&vb_root, &missing_dest).is_err());
    }
}
