use crate::error::SessionError;
use crate::types::{AudioFormat, RecordedState};
use std::path::{Path, PathBuf};

/// 音素のWAVファイルパスを組み立てる
pub fn wav_path(samples_path: &Path, phoneme: &str) -> PathBuf {
    samples_path.join(format!("{}.wav", phoneme))
}

/// 音素の録音済み状態をファイルシステムから判定
///
/// 読み取り専用の純粋なチェックで、副作用はない。書き込みを挟まずに
/// 2回呼べば同じ結果が返る。呼び出しタイミングは次の3箇所に限る:
/// レクリスト読み込み時・エントリ選択時・保存完了直後。
///
/// - `Absent`: `<samples_path>/<音素>.wav` が存在しない
/// - `Present`: ファイルが存在し、ヘッダが録音フォーマットと一致する
/// - `PresentButIncompatible`: ファイルは存在するがチャンネル数・
///   サンプル幅・サンプリングレートのいずれかが異なる
///
/// # Errors
///
/// ファイルは存在するがWAVヘッダとして読めない場合に
/// [`SessionError::Decode`] を返す。
pub fn resolve(
    samples_path: &Path,
    phoneme: &str,
    format: &AudioFormat,
) -> Result<RecordedState, SessionError> {
    let path = wav_path(samples_path, phoneme);

    if !path.exists() {
        return Ok(RecordedState::Absent);
    }

    match hound::WavReader::open(&path) {
        Ok(reader) => {
            if format.matches(&reader.spec()) {
                Ok(RecordedState::Present)
            } else {
                Ok(RecordedState::PresentButIncompatible)
            }
        }
        Err(source) => Err(SessionError::Decode { path, source }),
    }
}
