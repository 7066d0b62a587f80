use crate::error::SessionError;
use crate::sample_queue::SampleQueue;
use crate::types::SampleI16;
use crate::wav_writer::read_wav;
use std::path::Path;

/// 波形表示の状態
///
/// 表示タイトルと配色の切り替えに使う。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaveformStatus {
    /// 何も表示していない
    Idle,
    /// 録音中のライブ波形
    Live,
    /// 保存済みファイルを読み込んで表示中
    Loaded(String),
    /// 選択中の音素のファイルが存在しない
    NotFound,
    /// ファイルはあるが読み込みに失敗した
    ErrorLoading,
}

/// 波形プレゼンタ
///
/// 録音中は25ms周期でキューをドレインし、振幅列を蓄積して表示範囲を
/// 再計算する。保存済みファイルの表示は選択時に一度だけ全体を
/// デコードする。
///
/// 縦軸は信号の最大絶対値の±1.05倍で対称にスケーリングする。
/// 無音（全ゼロ）の場合は前回の範囲を維持し、表示が潰れるのを防ぐ。
pub struct WaveformPresenter {
    /// 蓄積された振幅列（録音開始またはファイル読み込みからの全体）
    samples: Vec<SampleI16>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    status: WaveformStatus,
    format_mismatch: bool,
}

impl WaveformPresenter {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            x_bounds: [0.0, 1.0],
            y_bounds: [-(i16::MAX as f64), i16::MAX as f64],
            status: WaveformStatus::Idle,
            format_mismatch: false,
        }
    }

    /// ライブ表示を開始する（録音開始時）
    ///
    /// 蓄積済みの振幅列を破棄し、波形をゼロから描き直す。
    pub fn begin_live(&mut self) {
        self.samples.clear();
        self.x_bounds = [0.0, 1.0];
        self.status = WaveformStatus::Live;
        self.format_mismatch = false;
    }

    /// キューをドレインして波形を更新する（25ms周期で呼ばれる）
    ///
    /// キューが空なら何もしない（再描画も不要）。新しいチャンクが
    /// あれば振幅列の末尾に追記し、表示範囲を再計算する。
    /// 表示は常に録音開始からの全体を示す。
    ///
    /// # Returns
    ///
    /// 波形が更新されたかどうか
    pub fn drain(&mut self, queue: &SampleQueue) -> bool {
        let chunks = queue.drain_all();
        if chunks.is_empty() {
            return false;
        }

        for chunk in chunks {
            self.samples.extend_from_slice(&chunk);
        }

        self.x_bounds = [0.0, self.samples.len().max(1) as f64];
        self.rescale();
        true
    }

    /// 保存済みWAVファイルを読み込んで表示する（選択時に一度だけ）
    ///
    /// 横軸はファイル全体 `[0, サンプル数]` に設定する。
    /// フォーマット不一致のファイルもベストエフォートで表示し、
    /// `mismatch` フラグで警告表示を切り替える。
    ///
    /// # Errors
    ///
    /// デコードに失敗した場合、状態を `ErrorLoading` にした上で
    /// [`SessionError::Decode`] を返す。
    pub fn load_file(
        &mut self,
        wav_path: &Path,
        phoneme: &str,
        mismatch: bool,
    ) -> Result<(), SessionError> {
        match read_wav(wav_path) {
            Ok((_, samples)) => {
                self.samples = samples;
                self.x_bounds = [0.0, self.samples.len().max(1) as f64];
                self.rescale();
                self.status = WaveformStatus::Loaded(phoneme.to_string());
                self.format_mismatch = mismatch;
                Ok(())
            }
            Err(e) => {
                self.samples.clear();
                self.x_bounds = [0.0, 1.0];
                self.status = WaveformStatus::ErrorLoading;
                self.format_mismatch = false;
                Err(e)
            }
        }
    }

    /// ファイルが存在しないことを表示する
    pub fn mark_not_found(&mut self) {
        self.samples.clear();
        self.x_bounds = [0.0, 1.0];
        self.status = WaveformStatus::NotFound;
        self.format_mismatch = false;
    }

    /// 読み込みエラーを表示する
    pub fn mark_error_loading(&mut self) {
        self.samples.clear();
        self.x_bounds = [0.0, 1.0];
        self.status = WaveformStatus::ErrorLoading;
        self.format_mismatch = false;
    }

    /// 表示をクリアする
    pub fn clear(&mut self) {
        self.samples.clear();
        self.x_bounds = [0.0, 1.0];
        self.status = WaveformStatus::Idle;
        self.format_mismatch = false;
    }

    /// 縦軸の表示範囲を再計算
    ///
    /// 最大絶対値の±1.05倍。全ゼロのときは前回の範囲を維持する。
    fn rescale(&mut self) {
        let max_abs = self
            .samples
            .iter()
            .map(|&s| (s as i32).abs())
            .max()
            .unwrap_or(0);
        if max_abs > 0 {
            let bound = max_abs as f64 * 1.05;
            self.y_bounds = [-bound, bound];
        }
    }

    /// チャート描画用に間引いた点列を取得
    ///
    /// 各区間の最小値と最大値の2点に潰すことで、ピークを失わずに
    /// 端末の解像度まで間引く。
    pub fn chart_points(&self, max_buckets: usize) -> Vec<(f64, f64)> {
        if self.samples.is_empty() || max_buckets == 0 {
            return Vec::new();
        }

        let bucket = self.samples.len().div_ceil(max_buckets).max(1);
        let mut points = Vec::with_capacity(self.samples.len().div_ceil(bucket) * 2);

        for (i, window) in self.samples.chunks(bucket).enumerate() {
            let mut min = SampleI16::MAX;
            let mut max = SampleI16::MIN;
            for &s in window {
                min = min.min(s);
                max = max.max(s);
            }
            let x0 = (i * bucket) as f64;
            let x1 = x0 + (window.len() as f64) / 2.0;
            points.push((x0, min as f64));
            points.push((x1, max as f64));
        }

        points
    }

    pub fn samples(&self) -> &[SampleI16] {
        &self.samples
    }

    pub fn status(&self) -> &WaveformStatus {
        &self.status
    }

    pub fn format_mismatch(&self) -> bool {
        self.format_mismatch
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        self.x_bounds
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
    }
}

impl Default for WaveformPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioFormat;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_drain_empty_queue_is_noop() {
        let queue = SampleQueue::new();
        let mut presenter = WaveformPresenter::new();
        presenter.begin_live();

        assert!(!presenter.drain(&queue));
        assert!(presenter.samples().is_empty());
    }

    #[test]
    fn test_drain_accumulates_in_order() {
        let queue = SampleQueue::new();
        let sender = queue.sender();
        let mut presenter = WaveformPresenter::new();
        presenter.begin_live();

        sender.send(vec![1i16; 1024]);
        sender.send(vec![2i16; 1024]);
        assert!(presenter.drain(&queue));

        // 2チャンク分が順序どおりに蓄積される
        assert_eq!(presenter.samples().len(), 2048);
        assert_eq!(presenter.samples()[0], 1);
        assert_eq!(presenter.samples()[2047], 2);
        assert_eq!(presenter.x_bounds(), [0.0, 2048.0]);

        // さらにドレインすると全体が伸びる
        sender.send(vec![3i16; 1024]);
        presenter.drain(&queue);
        assert_eq!(presenter.samples().len(), 3072);
    }

    #[test]
    fn test_autoscale_symmetric() {
        let queue = SampleQueue::new();
        let mut presenter = WaveformPresenter::new();
        presenter.begin_live();

        queue.sender().send(vec![-2000i16, 1000, 500]);
        presenter.drain(&queue);

        let bound = 2000.0 * 1.05;
        assert_eq!(presenter.y_bounds(), [-bound, bound]);
    }

    #[test]
    fn test_all_zero_keeps_previous_bounds() {
        let queue = SampleQueue::new();
        let mut presenter = WaveformPresenter::new();
        presenter.begin_live();

        queue.sender().send(vec![100i16; 16]);
        presenter.drain(&queue);
        let bounds = presenter.y_bounds();

        // 全ゼロの列では範囲を維持（表示が潰れない）
        presenter.begin_live();
        queue.sender().send(vec![0i16; 16]);
        presenter.drain(&queue);
        assert_eq!(presenter.y_bounds(), bounds);
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let format = AudioFormat::default();
        let path = temp_dir.path().join("ka.wav");

        let mut writer = hound::WavWriter::create(&path, format.wav_spec()).unwrap();
        for i in 0..2048i32 {
            writer.write_sample((i % 3000) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut presenter = WaveformPresenter::new();
        presenter.load_file(&path, "ka", false).unwrap();

        assert_eq!(presenter.samples().len(), 2048);
        assert_eq!(presenter.x_bounds(), [0.0, 2048.0]);
        assert_eq!(*presenter.status(), WaveformStatus::Loaded("ka".to_string()));
        assert!(!presenter.format_mismatch());
    }

    #[test]
    fn test_load_file_with_mismatch_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ka.wav");

        // 22050Hz のファイルもベストエフォートで表示する
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..512 {
            writer.write_sample(1234i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut presenter = WaveformPresenter::new();
        presenter.load_file(&path, "ka", true).unwrap();

        assert_eq!(presenter.samples().len(), 512);
        assert!(presenter.format_mismatch());
    }

    #[test]
    fn test_load_corrupt_file_marks_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.wav");
        fs::write(&path, b"not a wav").unwrap();

        let mut presenter = WaveformPresenter::new();
        let result = presenter.load_file(&path, "bad", false);

        assert!(result.is_err());
        assert_eq!(*presenter.status(), WaveformStatus::ErrorLoading);
        assert!(presenter.samples().is_empty());
    }

    #[test]
    fn test_mark_not_found() {
        let mut presenter = WaveformPresenter::new();
        presenter.mark_not_found();
        assert_eq!(*presenter.status(), WaveformStatus::NotFound);
    }

    #[test]
    fn test_chart_points_downsampling() {
        let queue = SampleQueue::new();
        let mut presenter = WaveformPresenter::new();
        presenter.begin_live();

        queue.sender().send((0..4096).map(|i| (i % 100) as i16).collect());
        presenter.drain(&queue);

        let points = presenter.chart_points(128);
        // 区間ごとに最小・最大の2点
        assert!(points.len() <= 2 * 128 + 2);
        assert!(!points.is_empty());

        // X座標は単調非減少
        for pair in points.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
    }

    #[test]
    fn test_chart_points_empty() {
        let presenter = WaveformPresenter::new();
        assert!(presenter.chart_points(100).is_empty());
    }
}
