use crate::error::SessionError;
use crate::recorded_state::wav_path;
use crate::types::{AudioFormat, SampleI16};
use std::fs;
use std::path::{Path, PathBuf};

/// 音素ごとのWAVファイル書き出し
///
/// 録音停止時に蓄積された全フレームを
/// `<samples_path>/<音素>.wav` として保存する。
/// 同じ音素を録り直した場合は上書きする。
pub struct WavWriter {
    samples_dir: PathBuf,
    spec: hound::WavSpec,
}

impl WavWriter {
    pub fn new<P: AsRef<Path>>(samples_dir: P, format: &AudioFormat) -> Result<Self, SessionError> {
        let samples_dir = samples_dir.as_ref().to_path_buf();

        // 保存先ディレクトリが存在しない場合は作成
        if !samples_dir.exists() {
            fs::create_dir_all(&samples_dir).map_err(|e| SessionError::Io {
                path: samples_dir.clone(),
                source: hound::Error::IoError(e),
            })?;
        }

        Ok(Self {
            samples_dir,
            spec: format.wav_spec(),
        })
    }

    /// フレーム列をWAVファイルとして保存
    ///
    /// # Errors
    ///
    /// 書き込みに失敗した場合に [`SessionError::Io`] を返す。
    /// その場合ファイルは不完全な可能性があり、呼び出し側は
    /// エントリを録音済みにしない。
    pub fn write(&self, phoneme: &str, samples: &[SampleI16]) -> Result<PathBuf, SessionError> {
        let path = wav_path(&self.samples_dir, phoneme);

        let io_err = |path: &PathBuf, source: hound::Error| SessionError::Io {
            path: path.clone(),
            source,
        };

        let mut writer = hound::WavWriter::create(&path, self.spec)
            .map_err(|e| io_err(&path, e))?;
        for &sample in samples {
            writer.write_sample(sample).map_err(|e| io_err(&path, e))?;
        }
        writer.finalize().map_err(|e| io_err(&path, e))?;

        log::info!(
            "WAVファイル書き込み完了: {:?} ({}サンプル, {:.2}秒)",
            path,
            samples.len(),
            samples.len() as f64 / self.spec.sample_rate as f64
        );

        Ok(path)
    }
}

/// WAVファイル全体をi16サンプル列として読み込む
///
/// 録音フォーマットと異なるファイルもベストエフォートでデコードする:
/// 16ビット未満の整数は左シフト、24/32ビットは右シフト、
/// 浮動小数点はクランプしてスケーリングする。
///
/// # Errors
///
/// ヘッダまたはサンプルのデコードに失敗した場合に
/// [`SessionError::Decode`] を返す。
pub fn read_wav<P: AsRef<Path>>(
    path: P,
) -> Result<(hound::WavSpec, Vec<SampleI16>), SessionError> {
    let path = path.as_ref().to_path_buf();

    let decode_err = |path: &PathBuf, source: hound::Error| SessionError::Decode {
        path: path.clone(),
        source,
    };

    let mut reader = hound::WavReader::open(&path).map_err(|e| decode_err(&path, e))?;
    let spec = reader.spec();

    let samples: Result<Vec<SampleI16>, hound::Error> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits) if bits <= 16 => {
            let shift = 16 - bits;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v << shift))
                .collect()
        }
        (hound::SampleFormat::Int, bits) => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect()
        }
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect(),
    };

    let samples = samples.map_err(|e| decode_err(&path, e))?;
    Ok((spec, samples))
}
