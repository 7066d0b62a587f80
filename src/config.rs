use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// アプリケーション設定
///
/// グローバルな可変設定は持たず、この構造体を起動時に読み込んで
/// 各コンポーネントへ明示的に渡す。保存も明示的な操作で行う。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub voicebank: VoicebankConfig,
}

/// オーディオ入力設定
///
/// # デフォルト値
///
/// - `device_id`: "default" (システムのデフォルトデバイス)
///
/// サンプリングレート等は録音フォーマットとして固定のため
/// 設定項目にはない。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

/// デフォルトパス設定
///
/// 録音セッション起動時に使用するレクリストとサンプル保存先。
/// 空文字列は未設定を意味する。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// レクリストファイルのパス
    #[serde(default)]
    pub default_reclist: String,

    /// 録音WAVの保存先ディレクトリ
    #[serde(default)]
    pub default_samples_dir: String,
}

/// ボイスバンク情報
///
/// ベースフォルダ生成と `character.txt` の書き出しに使用する。
///
/// # デフォルト値
///
/// - `pitch`: "A4"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoicebankConfig {
    /// ボイスバンク名（フォルダ名になる）
    #[serde(default)]
    pub name: String,

    /// 作成者名（省略可）
    #[serde(default)]
    pub author: String,

    /// 声の担当者名（省略可）
    #[serde(default)]
    pub voice: String,

    /// バージョン文字列（省略可）
    #[serde(default)]
    pub version: String,

    /// 収録ピッチ（サンプルフォルダ名になる）
    #[serde(default = "default_pitch")]
    pub pitch: String,

    /// ベースフォルダを作成する親ディレクトリ
    #[serde(default)]
    pub folder_path: String,

    /// カバー画像のパス（bmp/jpgのみ、省略可）
    #[serde(default)]
    pub cover_path: String,
}

// Default functions
fn default_device_id() -> String {
    "default".to_string()
}

fn default_pitch() -> String {
    "A4".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            paths: PathsConfig::default(),
            voicebank: VoicebankConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            default_reclist: String::new(),
            default_samples_dir: String::new(),
        }
    }
}

impl Default for VoicebankConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            author: String::new(),
            voice: String::new(),
            version: String::new(),
            pitch: default_pitch(),
            folder_path: String::new(),
            cover_path: String::new(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vb_studio::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// デフォルト値を持つ設定ファイルを生成する。
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        Config::default().save(path)
    }

    /// 現在の設定をファイルに保存
    ///
    /// # Errors
    ///
    /// シリアライズまたは書き込みに失敗した場合にエラーを返す。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use vb_studio::config::Config;
    /// let config = Config::load_or_default("config.toml").unwrap();
    /// ```
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.device_id, "default");
        assert_eq!(config.voicebank.pitch, "A4");
        assert!(config.paths.default_reclist.is_empty());
        assert!(config.paths.default_samples_dir.is_empty());
    }

    #[test]
    fn test_write_and_read_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        // デフォルト設定を書き込み
        Config::write_default(path).unwrap();

        // 読み込み
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.audio.device_id, "default");
        assert_eq!(config.voicebank.pitch, "A4");
    }

    #[test]
    fn test_custom_config() {
        let toml_content = r#"
[audio]
device_id = "USB Audio Device"

[paths]
default_reclist = "/home/user/reclist.txt"
default_samples_dir = "/home/user/voicebank/A4"

[voicebank]
name = "TestBank"
author = "tester"
voice = "someone"
version = "1.0"
pitch = "C4"
folder_path = "/home/user"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.audio.device_id, "USB Audio Device");
        assert_eq!(config.paths.default_reclist, "/home/user/reclist.txt");
        assert_eq!(config.paths.default_samples_dir, "/home/user/voicebank/A4");
        assert_eq!(config.voicebank.name, "TestBank");
        assert_eq!(config.voicebank.pitch, "C4");
    }

    #[test]
    fn test_load_or_default_nonexistent() {
        let config = Config::load_or_default("nonexistent_file.toml").unwrap();
        // デフォルト設定が返されることを確認
        assert_eq!(config.audio.device_id, "default");
    }

    #[test]
    fn test_partial_config() {
        // 一部の設定のみ記述した場合、残りはデフォルト値が使われる
        let toml_content = r#"
[voicebank]
name = "PartialBank"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        // 指定した値
        assert_eq!(config.voicebank.name, "PartialBank");

        // デフォルト値
        assert_eq!(config.audio.device_id, "default");
        assert_eq!(config.voicebank.pitch, "A4");
    }

    #[test]
    fn test_save_round_trip() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut config = Config::default();
        config.paths.default_reclist = "/tmp/reclist.txt".to_string();
        config.voicebank.name = "Saved".to_string();
        config.save(temp_file.path()).unwrap();

        let loaded = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.paths.default_reclist, "/tmp/reclist.txt");
        assert_eq!(loaded.voicebank.name, "Saved");
    }
}
