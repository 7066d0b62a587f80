mod audio_input;
mod config;
mod error;
mod package;
mod reclist;
mod recorded_state;
mod sample_queue;
mod scaffold;
mod session;
mod tui;
mod types;
mod wav_writer;
mod waveform;

use anyhow::Result;
use audio_input::AudioInput;
use config::Config;
use env_logger::Env;
use reclist::ReclistStore;
use session::RecordingSession;
use std::path::Path;
use tui::TuiApp;
use types::AudioFormat;

fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // デバイス一覧表示モード
    if args.len() > 1 && args[1] == "--show-interfaces" {
        AudioInput::list_devices()?;
        return Ok(());
    }

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // zipパッケージモード
    if args.len() > 1 && args[1] == "--package" {
        if args.len() < 4 {
            anyhow::bail!(
                "使い方: vb-studio --package <ボイスバンクフォルダ> <出力先フォルダ>"
            );
        }
        let zip_path = package::package_voicebank(Path::new(&args[2]), Path::new(&args[3]))?;
        println!("zipを作成しました: {:?}", zip_path);
        return Ok(());
    }

    // ベースフォルダ作成モード
    if args.len() > 1 && args[1] == "--scaffold" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        let config = Config::load_or_default(config_path)?;
        let root = scaffold::create_base_folder(&config.voicebank)?;
        println!("ボイスバンクフォルダを作成しました: {:?}", root);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    log::info!("vb-studio を起動します");

    // --reclist / --samples で設定のデフォルトパスを上書き
    let mut reclist_path = config.paths.default_reclist.clone();
    let mut samples_dir = config.paths.default_samples_dir.clone();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--reclist" if i + 1 < args.len() => {
                reclist_path = args[i + 1].clone();
                i += 2;
            }
            "--samples" if i + 1 < args.len() => {
                samples_dir = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }

    // 録音セッションを構築
    let mut session = RecordingSession::new(config.audio.clone(), AudioFormat::default());
    if !samples_dir.is_empty() {
        session.set_samples_path(&samples_dir);
    }
    if !reclist_path.is_empty() {
        let store = ReclistStore::new(&reclist_path);
        if let Err(e) = session.load_reclist(&store) {
            log::warn!("レクリストの読み込みに失敗: {}", e);
        }
    }

    // TUIを起動
    let mut app = TuiApp::new(session);
    app.run()?;

    log::info!("vb-studio を終了しました");

    Ok(())
}
