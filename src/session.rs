use crate::audio_input::AudioInput;
use crate::config::AudioConfig;
use crate::error::SessionError;
use crate::reclist::ReclistStore;
use crate::recorded_state::{resolve, wav_path};
use crate::sample_queue::SampleQueue;
use crate::types::{AudioFormat, CaptureSession, ReclistEntry, RecordedState};
use crate::wav_writer::WavWriter;
use crate::waveform::WaveformPresenter;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 録音セッションの状態
///
/// `Idle`: 何も選択していない。`Armed`: エントリ選択済みで録音待機。
/// `Recording`: キャプチャ中。値は対象エントリの行番号。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Armed(usize),
    Recording(usize),
}

/// 録音セッションのオーケストレータ
///
/// レクリストのナビゲーション、キャプチャのライフサイクル、
/// 録音済み状態の照合、波形表示を1つの状態機械に束ねる。
///
/// ユーザー操作はすべて名前付きの遷移であり、前提条件を満たさない
/// 場合は状態を変えずにエラーを返す。満たす場合はちょうど1つの
/// 状態変化が起こる。
///
/// # 実行コンテキスト
///
/// 全メソッドはプレゼンテーションコンテキスト（TUIループ）から
/// 呼ばれる。キャプチャコンテキストが触るのはキャプチャコールバック
/// 内のフレーム列とキューだけで、セッション状態・ファイル書き込み・
/// デバイスのライフサイクルはすべてこちら側が所有する。
pub struct RecordingSession {
    format: AudioFormat,
    audio_config: AudioConfig,
    entries: Vec<ReclistEntry>,
    samples_path: Option<PathBuf>,
    state: SessionState,
    /// 遅延オープン: 前提条件をすべて満たした最初の録音開始まで
    /// デバイスには触れない
    audio: Option<AudioInput>,
    queue: SampleQueue,
    presenter: WaveformPresenter,
    /// アクティブな録音（常に最大1つ）
    capture: Option<CaptureSession>,
}

impl RecordingSession {
    pub fn new(audio_config: AudioConfig, format: AudioFormat) -> Self {
        Self {
            format,
            audio_config,
            entries: Vec::new(),
            samples_path: None,
            state: SessionState::Idle,
            audio: None,
            queue: SampleQueue::new(),
            presenter: WaveformPresenter::new(),
            capture: None,
        }
    }

    /// 録音WAVの保存先ディレクトリを設定
    ///
    /// レクリスト読み込み済みなら全エントリの録音済み状態を取り直す。
    pub fn set_samples_path<P: AsRef<Path>>(&mut self, path: P) {
        self.samples_path = Some(path.as_ref().to_path_buf());
        log::info!("サンプル保存先: {:?}", self.samples_path);
        self.resolve_all();
    }

    /// レクリストを読み込み、全エントリの録音済み状態を照合する
    ///
    /// 読み込み後、先頭エントリを選択する。
    ///
    /// # Errors
    ///
    /// 録音中の場合、またはレクリストファイルが読めない場合に
    /// [`SessionError::Precondition`] を返す。
    pub fn load_reclist(&mut self, store: &ReclistStore) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::Precondition(
                "録音中はレクリストを読み込めません".to_string(),
            ));
        }

        let phonemes = store
            .phonemes()
            .map_err(|e| SessionError::Precondition(format!("{:#}", e)))?;

        self.entries = phonemes.into_iter().map(ReclistEntry::new).collect();
        log::info!(
            "レクリストを読み込みました: {}エントリ ({:?})",
            self.entries.len(),
            store.path()
        );

        self.resolve_all();

        if self.entries.is_empty() {
            self.state = SessionState::Idle;
            self.presenter.clear();
            Ok(())
        } else {
            self.select_entry(0)
        }
    }

    /// エントリを選択して録音待機状態にする
    ///
    /// 選択したエントリの録音済み状態を取り直し、ファイルがあれば
    /// 波形を読み込んで表示する。
    ///
    /// # Errors
    ///
    /// 録音中、または行番号が範囲外の場合に
    /// [`SessionError::Precondition`] を返す。
    pub fn select_entry(&mut self, row: usize) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::Precondition(
                "録音中はエントリを選択できません".to_string(),
            ));
        }
        if row >= self.entries.len() {
            return Err(SessionError::Precondition(format!(
                "行番号が範囲外です: {}",
                row
            )));
        }

        self.state = SessionState::Armed(row);
        self.refresh_entry(row);
        Ok(())
    }

    /// 録音の開始/停止を切り替える
    ///
    /// - 待機中: キャプチャを開始して `Recording` へ
    /// - 録音中: キャプチャを停止し、蓄積フレームをWAVへ書き出して
    ///   状態を照合し、`Armed` へ戻る
    /// - エントリ未選択: 何もしない
    ///
    /// # Errors
    ///
    /// 保存先未設定・レクリスト未読み込みの場合は
    /// [`SessionError::Precondition`]（デバイスには触れない）。
    /// デバイスが確保できない場合は [`SessionError::DeviceUnavailable`]
    /// （待機状態のまま、リトライ可能）。書き込み失敗は
    /// [`SessionError::Io`]（エントリは録音済みにならない）。
    pub fn toggle_recording(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording(row) => self.stop_recording(row),
            SessionState::Armed(row) => {
                if self.samples_path.is_none() {
                    return Err(SessionError::Precondition(
                        "ボイスバンクのサンプル保存先が設定されていません".to_string(),
                    ));
                }
                self.start_recording(row)
            }
            SessionState::Idle => {
                if self.samples_path.is_none() {
                    return Err(SessionError::Precondition(
                        "ボイスバンクのサンプル保存先が設定されていません".to_string(),
                    ));
                }
                if self.entries.is_empty() {
                    return Err(SessionError::Precondition(
                        "レクリストが読み込まれていません".to_string(),
                    ));
                }
                // エントリ未選択時は何もしない
                Ok(())
            }
        }
    }

    /// 次のエントリへ移動（録音中は不可、端でクランプ）
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.navigate(1)
    }

    /// 前のエントリへ移動（録音中は不可、端でクランプ）
    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.navigate(-1)
    }

    fn navigate(&mut self, delta: isize) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::Precondition(
                "録音中は移動できません".to_string(),
            ));
        }
        let SessionState::Armed(row) = self.state else {
            return Ok(());
        };

        let target = row as isize + delta;
        // 端でクランプ（ラップアラウンドしない）
        if target < 0 || target as usize >= self.entries.len() {
            return Ok(());
        }
        self.select_entry(target as usize)
    }

    /// 定期tick（25ms周期でTUIループから呼ばれる）
    ///
    /// 録音中はキューをドレインして波形を更新する。キャプチャ中に
    /// デバイス障害が起きていた場合は録音を停止し、それまでの
    /// 蓄積分を保存した上でエラーを報告する。
    pub fn tick(&mut self) -> Result<(), SessionError> {
        let SessionState::Recording(row) = self.state else {
            return Ok(());
        };

        let faulted = self.audio.as_ref().is_some_and(|a| a.take_fault());
        if faulted {
            // 障害時もそれまでの蓄積分はフラッシュする
            self.stop_recording(row)?;
            return Err(SessionError::DeviceUnavailable(
                "キャプチャ中にデバイス障害が発生しました".to_string(),
            ));
        }

        self.presenter.drain(&self.queue);
        Ok(())
    }

    /// セッションを終了する
    ///
    /// 録音中なら強制停止し、バッファ済みデータをフラッシュしてから
    /// デバイスを解放する。キャプチャコンテキストを中途半端な状態で
    /// 放置しない。
    pub fn close(&mut self) {
        if let SessionState::Recording(row) = self.state {
            log::warn!("録音中にセッションを終了します。蓄積分を保存します");
            if let Err(e) = self.stop_recording(row) {
                log::error!("終了時の保存に失敗: {}", e);
            }
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.close();
        }
    }

    fn start_recording(&mut self, row: usize) -> Result<(), SessionError> {
        let phoneme = match self.entries.get(row) {
            Some(entry) => entry.phoneme.clone(),
            None => {
                return Err(SessionError::Precondition(format!(
                    "行番号が範囲外です: {}",
                    row
                )))
            }
        };

        // 前提条件をすべて満たしてから初めてデバイスに触れる
        if self.audio.is_none() {
            self.audio = Some(AudioInput::open(&self.audio_config, &self.format)?);
        }
        let audio = match self.audio.as_mut() {
            Some(audio) => audio,
            None => {
                return Err(SessionError::DeviceUnavailable(
                    "デバイスが開かれていません".to_string(),
                ))
            }
        };

        let capture = CaptureSession::new(&phoneme);
        self.queue.clear();
        self.presenter.begin_live();

        let frames = Arc::clone(&capture.frames);
        let tx = self.queue.sender();
        audio.start(move |chunk| {
            // キャプチャコンテキスト: フレーム列への追記とキューへの
            // プッシュのみ。ファイルI/OやUI操作は行わない。
            frames.lock().unwrap().extend_from_slice(&chunk);
            tx.send(chunk);
        })?;

        log::info!("録音開始: {}", phoneme);
        self.capture = Some(capture);
        self.state = SessionState::Recording(row);
        Ok(())
    }

    fn stop_recording(&mut self, row: usize) -> Result<(), SessionError> {
        let tail = match self.audio.as_mut() {
            Some(audio) => audio.stop(),
            None => Vec::new(),
        };

        // 表示キューに残っているチャンクを波形へ反映
        self.presenter.drain(&self.queue);

        // 書き込みに失敗してもArmedへ戻り、録り直しできる
        self.state = SessionState::Armed(row);

        let Some(capture) = self.capture.take() else {
            return Ok(());
        };

        // チャンク未満の端数もフレーム列に含める
        if !tail.is_empty() {
            capture.frames.lock().unwrap().extend_from_slice(&tail);
        }

        let elapsed = Local::now().signed_duration_since(capture.started_at);
        log::info!(
            "録音停止: {} ({:.1}秒)",
            capture.phoneme,
            elapsed.num_milliseconds() as f64 / 1000.0
        );

        self.write_and_reconcile(row, capture)
    }

    /// 蓄積フレームをWAVへ書き出し、保存直後の状態照合でエントリを更新
    fn write_and_reconcile(
        &mut self,
        row: usize,
        capture: CaptureSession,
    ) -> Result<(), SessionError> {
        let samples_path = self.samples_path.clone().ok_or_else(|| {
            SessionError::Precondition(
                "ボイスバンクのサンプル保存先が設定されていません".to_string(),
            )
        })?;

        let frames = capture.take_frames();
        if frames.is_empty() {
            log::warn!("保存するフレームがありません: {}", capture.phoneme);
            return Ok(());
        }

        let writer = WavWriter::new(&samples_path, &self.format)?;
        writer.write(&capture.phoneme, &frames)?;

        // 保存完了直後の再照合（期待値: Present）
        let state = resolve(&samples_path, &capture.phoneme, &self.format)?;
        if let Some(entry) = self.entries.get_mut(row) {
            entry.state = state;
        }
        Ok(())
    }

    /// 選択エントリの録音済み状態を取り直し、波形表示を更新する
    fn refresh_entry(&mut self, row: usize) {
        let phoneme = match self.entries.get(row) {
            Some(entry) => entry.phoneme.clone(),
            None => return,
        };

        let Some(samples_path) = self.samples_path.clone() else {
            self.presenter.clear();
            return;
        };

        match resolve(&samples_path, &phoneme, &self.format) {
            Ok(RecordedState::Absent) => {
                if let Some(entry) = self.entries.get_mut(row) {
                    entry.state = RecordedState::Absent;
                }
                self.presenter.mark_not_found();
            }
            Ok(state) => {
                if let Some(entry) = self.entries.get_mut(row) {
                    entry.state = state;
                }
                let mismatch = state == RecordedState::PresentButIncompatible;
                if mismatch {
                    log::warn!("WAVフォーマットが一致しません: {}", phoneme);
                }
                let path = wav_path(&samples_path, &phoneme);
                if let Err(e) = self.presenter.load_file(&path, &phoneme, mismatch) {
                    // デコード失敗はエントリ単位の表示に留め、選択は成立させる
                    log::warn!("{}", e);
                }
            }
            Err(e) => {
                // 正常なWAVではないため録音済みにはしない
                if let Some(entry) = self.entries.get_mut(row) {
                    entry.state = RecordedState::Absent;
                }
                self.presenter.mark_error_loading();
                log::warn!("{}", e);
            }
        }
    }

    fn resolve_all(&mut self) {
        let Some(samples_path) = self.samples_path.clone() else {
            return;
        };
        for entry in self.entries.iter_mut() {
            entry.state = match resolve(&samples_path, &entry.phoneme, &self.format) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("{}", e);
                    RecordedState::Absent
                }
            };
        }
    }

    // --- 参照系 ---

    pub fn entries(&self) -> &[ReclistEntry] {
        &self.entries
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording(_))
    }

    /// 選択中の行番号
    pub fn armed_row(&self) -> Option<usize> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Armed(row) | SessionState::Recording(row) => Some(row),
        }
    }

    /// 選択中の音素
    pub fn current_phoneme(&self) -> Option<&str> {
        self.armed_row()
            .and_then(|row| self.entries.get(row))
            .map(|entry| entry.phoneme.as_str())
    }

    /// 録音済みエントリ数
    pub fn recorded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_recorded()).count()
    }

    pub fn samples_path(&self) -> Option<&Path> {
        self.samples_path.as_deref()
    }

    pub fn presenter(&self) -> &WaveformPresenter {
        &self.presenter
    }
}
