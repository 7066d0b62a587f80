use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex};

/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// 1チャンクあたりのフレーム数
///
/// キャプチャコールバックはこの単位で音声データを送出する。
pub const CHUNK_FRAMES: usize = 1024;

/// 録音フォーマット情報（固定）
///
/// ボイスバンクの全録音ファイルはこのフォーマットで統一される。
/// 既存ファイルの互換性チェックにも同じ値を使用する。
///
/// # Examples
///
/// ```
/// # use vb_studio::types::AudioFormat;
/// let format = AudioFormat::default();
/// assert_eq!(format.sample_rate, 44100);
/// assert_eq!(format.channels, 1); // モノラル
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// サンプリングレート (Hz)
    pub sample_rate: u32,

    /// チャンネル数
    ///
    /// 1: モノラル, 2: ステレオ
    pub channels: u16,

    /// サンプル幅 (ビット)
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl AudioFormat {
    /// houndのWavSpecに変換
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// 既存WAVファイルのヘッダがこのフォーマットと一致するか
    ///
    /// チャンネル数・サンプル幅・サンプリングレートのいずれかが
    /// 異なる場合は不一致とみなす。
    pub fn matches(&self, spec: &hound::WavSpec) -> bool {
        spec.channels == self.channels
            && spec.sample_rate == self.sample_rate
            && spec.bits_per_sample == self.bits_per_sample
            && spec.sample_format == hound::SampleFormat::Int
    }
}

/// 音素の録音済み状態
///
/// ファイルシステム上の実体から導出されるキャッシュ値。
/// レクリスト読み込み時・エントリ選択時・保存完了時にのみ再計算される。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedState {
    /// `<samples_path>/<音素>.wav` が存在しない
    Absent,

    /// ファイルが存在し、ヘッダが録音フォーマットと完全一致する
    Present,

    /// ファイルは存在するがフォーマットが一致しない
    ///
    /// 録音済みとして数えるが、読み込み時に警告を表示する。
    PresentButIncompatible,
}

impl RecordedState {
    /// 録音済みとして扱うかどうか
    ///
    /// フォーマット不一致のファイルも「録音済み」に数える。
    pub fn is_recorded(&self) -> bool {
        !matches!(self, RecordedState::Absent)
    }
}

/// レクリストの1エントリ
///
/// 挿入順が録音順・表示順を定義するため、順序は変更しない。
/// `phoneme` は読み込み後に変更されない。`state` は状態リゾルバの
/// 再チェックまたは保存成功時にのみ更新される。
#[derive(Clone, Debug)]
pub struct ReclistEntry {
    /// 音素（録音ファイルのベース名になる）
    pub phoneme: String,

    /// 録音済み状態（ファイルシステムの実体のキャッシュ）
    pub state: RecordedState,
}

impl ReclistEntry {
    pub fn new(phoneme: String) -> Self {
        Self {
            phoneme,
            state: RecordedState::Absent,
        }
    }

    /// 録音済みかどうか
    pub fn is_recorded(&self) -> bool {
        self.state.is_recorded()
    }
}

/// アクティブな録音1回分の一時データ
///
/// 録音開始時に生成され、RecordingSessionが排他的に所有する。
/// 録音停止時にフレームがWAVファイルへ書き出されて破棄される。
/// 同時に存在するのは常に最大1つ。
///
/// `frames` はキャプチャコンテキストから追記され、停止時に
/// プレゼンテーションコンテキストが回収する。表示用キューの
/// ドレインとは独立しているため、描画側の遅延やスキップで
/// 録音データが失われることはない。
#[derive(Clone, Debug)]
pub struct CaptureSession {
    /// 録音対象の音素
    pub phoneme: String,

    /// 全録音時間分のフレーム列（キャプチャコールバックが追記）
    pub frames: Arc<Mutex<Vec<SampleI16>>>,

    /// 録音開始時刻
    pub started_at: DateTime<Local>,
}

impl CaptureSession {
    pub fn new(phoneme: &str) -> Self {
        Self {
            phoneme: phoneme.to_string(),
            frames: Arc::new(Mutex::new(Vec::new())),
            started_at: Local::now(),
        }
    }

    /// 蓄積されたフレームを取り出す
    pub fn take_frames(&self) -> Vec<SampleI16> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    /// 蓄積されたフレーム数
    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_default() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.channels, 1);
        assert_eq!(format.bits_per_sample, 16);
    }

    #[test]
    fn test_audio_format_matches() {
        let format = AudioFormat::default();
        assert!(format.matches(&format.wav_spec()));

        // サンプリングレート違い
        let mut spec = format.wav_spec();
        spec.sample_rate = 22050;
        assert!(!format.matches(&spec));

        // チャンネル数違い
        let mut spec = format.wav_spec();
        spec.channels = 2;
        assert!(!format.matches(&spec));

        // サンプル幅違い
        let mut spec = format.wav_spec();
        spec.bits_per_sample = 24;
        assert!(!format.matches(&spec));
    }

    #[test]
    fn test_recorded_state_is_recorded() {
        assert!(!RecordedState::Absent.is_recorded());
        assert!(RecordedState::Present.is_recorded());
        assert!(RecordedState::PresentButIncompatible.is_recorded());
    }

    #[test]
    fn test_capture_session_take_frames() {
        let capture = CaptureSession::new("ka");
        capture.frames.lock().unwrap().extend_from_slice(&[1i16, 2, 3]);
        assert_eq!(capture.frame_count(), 3);

        let frames = capture.take_frames();
        assert_eq!(frames, vec![1i16, 2, 3]);
        assert_eq!(capture.frame_count(), 0);
    }
}
