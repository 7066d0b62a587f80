//! vb-studio - UTAU系歌声合成エンジン用ボイスバンク作成システム
//!
//! このクレートは、レクリスト（録音プロンプト一覧）に沿って音声を
//! 収録し、ボイスバンクを組み立てるためのシステムを提供します。
//!
//! # 主な機能
//!
//! - **レクリスト録音セッション**: レクリストを1行ずつ辿りながら録音し、
//!   既存ファイルの状態とテーブル表示を常に一致させる
//! - **ライブ波形表示**: 録音中の音声をリアルタイムに描画
//! - **録音済み状態の照合**: ファイルシステム上のWAVファイルを
//!   唯一の真実として録音状況を判定
//! - **WAVファイル出力**: 音素ごとにモノラル16bit/44.1kHzで保存
//! - **ベースフォルダ作成**: サンプルフォルダと`character.txt`の生成
//! - **zipパッケージ**: 完成したボイスバンクのアーカイブ
//!
//! # アーキテクチャ
//!
//! ```text
//! [Audio Device] → [AudioInput] ─┬→ [CaptureSession frames]
//!                                │            ↓
//!                                └→ [SampleQueue]   [WavWriter]
//!                                        ↓               ↓
//!                              [WaveformPresenter]  [WAV Files]
//!                                        ↓               ↓
//!                                     [TUI] ← [RecordingSession]
//! ```
//!
//! キャプチャコンテキストはフレーム列への追記とキューへのプッシュ
//! だけを行い、ファイル書き込み・状態遷移・描画はすべて
//! プレゼンテーションコンテキスト側が所有します。
//!
//! # 使用例
//!
//! ```no_run
//! use vb_studio::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod audio_input;
pub mod config;
pub mod error;
pub mod package;
pub mod reclist;
pub mod recorded_state;
pub mod sample_queue;
pub mod scaffold;
pub mod session;
pub mod tui;
pub mod types;
pub mod wav_writer;
pub mod waveform;
