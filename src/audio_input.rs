use crate::config::AudioConfig;
use crate::error::SessionError;
use crate::types::{AudioFormat, SampleI16, CHUNK_FRAMES};
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SizedSample};
use regex_lite::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// オーディオデバイスからの録音入力エンジン
///
/// 状態遷移は Closed → Open → Capturing → Open → Closed。
/// `open` でデバイスを確保し、`start` でストリームを開始、
/// `stop` でストリームを解放して Open に戻る。`close` で
/// デバイスを完全に手放す。
///
/// キャプチャ中のコールバックは専用スレッドで動く。コールバックには
/// ちょうど [`CHUNK_FRAMES`] フレームのチャンクだけが渡される。
/// デバイスのバッファ境界がチャンク境界と合わない分は内部に保持し、
/// `stop` 時に残りとして返す。
pub struct AudioInput {
    device: Option<cpal::Device>,
    config: cpal::StreamConfig,
    stream: Option<cpal::Stream>,
    /// チャンク未満の端数フレーム（キャプチャコンテキストが追記）
    pending: Arc<Mutex<Vec<SampleI16>>>,
    /// キャプチャ中のデバイス障害フラグ
    fault: Arc<AtomicBool>,
}

impl AudioInput {
    /// デバイスを確保して Open 状態のエンジンを作る
    ///
    /// # Errors
    ///
    /// 入力デバイスが存在しない、または指定IDのデバイスが
    /// 見つからない場合に [`SessionError::DeviceUnavailable`] を返す。
    pub fn open(config: &AudioConfig, format: &AudioFormat) -> Result<Self, SessionError> {
        let host = cpal::default_host();

        // デバイスを取得
        let device = if config.device_id == "default" {
            host.default_input_device().ok_or_else(|| {
                SessionError::DeviceUnavailable(
                    "デフォルト入力デバイスが見つかりません".to_string(),
                )
            })?
        } else {
            // デバイスIDが指定されている場合は、デバイス一覧から検索
            Self::input_devices()
                .map_err(|e| SessionError::DeviceUnavailable(format!("{:#}", e)))?
                .into_iter()
                .find(|d| d.name().ok().as_deref() == Some(&config.device_id))
                .ok_or_else(|| {
                    SessionError::DeviceUnavailable(format!(
                        "デバイスが見つかりません: {}",
                        config.device_id
                    ))
                })?
        };

        log::info!("入力デバイス: {:?}", device.name());

        // ストリーム設定を作成（録音フォーマット固定）
        let stream_config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(CHUNK_FRAMES as u32),
        };

        Ok(Self {
            device: Some(device),
            config: stream_config,
            stream: None,
            pending: Arc::new(Mutex::new(Vec::new())),
            fault: Arc::new(AtomicBool::new(false)),
        })
    }

    /// キャプチャを開始する (Open → Capturing)
    ///
    /// `on_chunk` はチャンクが揃う度にキャプチャスレッドで呼ばれる。
    /// ブロッキングI/OやUI操作を行ってはならない。データの受け渡し
    /// （フレーム列への追記とキューへのプッシュ）のみを行うこと。
    ///
    /// # Errors
    ///
    /// ストリームの構築・開始に失敗した場合（デバイスが他プロセスに
    /// 使用されている場合など）に [`SessionError::DeviceUnavailable`] を返す。
    pub fn start<F>(&mut self, on_chunk: F) -> Result<(), SessionError>
    where
        F: FnMut(Vec<SampleI16>) + Send + 'static,
    {
        if self.stream.is_some() {
            log::warn!("すでにキャプチャ中です");
            return Ok(());
        }

        let device = self.device.as_ref().ok_or_else(|| {
            SessionError::DeviceUnavailable("デバイスが開かれていません".to_string())
        })?;

        // デバイスのネイティブフォーマットを取得
        let default_config = device.default_input_config().map_err(|e| {
            SessionError::DeviceUnavailable(format!("デフォルト入力設定が取得できません: {}", e))
        })?;

        self.fault.store(false, Ordering::SeqCst);
        self.pending.lock().unwrap().clear();

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32, F>(on_chunk)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16, F>(on_chunk)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16, F>(on_chunk)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32, F>(on_chunk)?,
            other => {
                return Err(SessionError::DeviceUnavailable(format!(
                    "サポートされていないサンプルフォーマット: {:?}",
                    other
                )))
            }
        };

        stream.play().map_err(|e| {
            SessionError::DeviceUnavailable(format!("ストリームの開始に失敗: {}", e))
        })?;
        self.stream = Some(stream);

        log::info!("音声入力ストリームを開始しました");

        Ok(())
    }

    /// ストリームを構築
    fn build_stream<T, F>(&self, mut on_chunk: F) -> Result<cpal::Stream, SessionError>
    where
        T: SizedSample + Sample + Send + 'static,
        <T as Sample>::Float: Into<f32>,
        F: FnMut(Vec<SampleI16>) + Send + 'static,
    {
        let device = self.device.as_ref().ok_or_else(|| {
            SessionError::DeviceUnavailable("デバイスが開かれていません".to_string())
        })?;

        let pending = Arc::clone(&self.pending);

        let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
            // キャプチャコンテキスト: 変換してチャンク単位で送出する以外のことはしない
            let mut pending = pending.lock().unwrap();
            for &sample in data {
                let f: f32 = sample.to_float_sample().into();
                let clamped = f.clamp(-1.0, 1.0);
                pending.push((clamped * i16::MAX as f32) as i16);

                if pending.len() >= CHUNK_FRAMES {
                    let chunk: Vec<SampleI16> = pending.drain(..CHUNK_FRAMES).collect();
                    on_chunk(chunk);
                }
            }
        };

        let fault = Arc::clone(&self.fault);
        let error_callback = move |err| {
            log::error!("ストリームエラー: {}", err);
            fault.store(true, Ordering::SeqCst);
        };

        let stream = device
            .build_input_stream(&self.config, data_callback, error_callback, None)
            .map_err(|e| {
                SessionError::DeviceUnavailable(format!("入力ストリームの構築に失敗: {}", e))
            })?;

        Ok(stream)
    }

    /// キャプチャを停止する (Capturing → Open)
    ///
    /// ストリームが解放されるまでブロックする。すでに停止している
    /// 場合は何もしない（冪等）。戻り値はチャンク未満で残っていた
    /// 端数フレーム。呼び出し側はこれをフレーム列の末尾に加える。
    pub fn stop(&mut self) -> Vec<SampleI16> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("音声入力ストリームを停止しました");
        }
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    /// デバイスを完全に解放する (→ Closed)
    pub fn close(&mut self) {
        self.stop();
        if self.device.take().is_some() {
            log::info!("入力デバイスを解放しました");
        }
    }

    /// キャプチャ中かどうか
    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// キャプチャ中に発生したデバイス障害フラグを取得してクリア
    pub fn take_fault(&self) -> bool {
        self.fault.swap(false, Ordering::SeqCst)
    }

    /// デバイス一覧を表示
    pub fn list_devices() -> Result<()> {
        println!("利用可能な入力デバイス:");
        println!();

        for (idx, device) in Self::input_devices()?.into_iter().enumerate() {
            let name = device.name()?;
            println!("  [{}] {}", idx, name);

            device.supported_input_configs()?.for_each(|config_range| {
                println!(
                    "      フォーマット: {:?}, {}-{}Hz, {}ch",
                    config_range.sample_format(),
                    config_range.min_sample_rate().0,
                    config_range.max_sample_rate().0,
                    config_range.channels()
                );
            });
            println!();
        }

        Ok(())
    }

    /// 録音入力として利用すべきでない仮想・会議用デバイスを除外した一覧を取得
    fn input_devices() -> Result<Vec<cpal::Device>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()?
            .filter(|device| {
                if let Ok(name) = device.name() {
                    // 除外するデバイス名のリスト
                    let excluded_names_regex = Regex::new(
                        "AirPods|iPhone|Webcam|Background|Microsoft Teams|ZoomAudioDevice",
                    )
                    .unwrap();
                    if excluded_names_regex.is_match(&name) {
                        return false;
                    }
                    return true;
                } else {
                    true
                }
            })
            .collect();
        Ok(devices)
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.close();
    }
}
