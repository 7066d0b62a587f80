use crate::types::SampleI16;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// キャプチャコンテキストから表示側へのチャンク受け渡しキュー
///
/// キャプチャコールバック（プロデューサ）と描画ループ（コンシューマ）
/// の間で唯一共有される構造体。プッシュもドレインもブロックしない。
/// チャンクの順序はFIFOで保たれ、欠落も重複もない。
///
/// このキューは表示専用のフィードであり、破壊的に消費してよい。
/// 最終的なWAV書き出しにはCaptureSession側のフレーム列を使うため、
/// 描画側の遅延がファイル内容に影響することはない。
pub struct SampleQueue {
    tx: Sender<Vec<SampleI16>>,
    rx: Receiver<Vec<SampleI16>>,
}

/// キャプチャコンテキストへ渡す送信側ハンドル
#[derive(Clone)]
pub struct QueueSender {
    tx: Sender<Vec<SampleI16>>,
}

impl QueueSender {
    /// チャンクをプッシュする（ブロックしない）
    ///
    /// キャプチャコールバックから呼ばれるため、失敗時もログのみで
    /// 呼び出し側へは伝播しない。
    pub fn send(&self, chunk: Vec<SampleI16>) {
        if self.tx.send(chunk).is_err() {
            log::warn!("サンプルキューへの送信失敗: キュークローズ");
        }
    }
}

impl SampleQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// プロデューサ用の送信側ハンドルを取得
    pub fn sender(&self) -> QueueSender {
        QueueSender {
            tx: self.tx.clone(),
        }
    }

    /// 現在キューにある全チャンクを取り出す（ブロックしない）
    ///
    /// 何もなければ空のVecを返す。
    pub fn drain_all(&self) -> Vec<Vec<SampleI16>> {
        self.rx.try_iter().collect()
    }

    /// キューを空にする
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// キューが空かどうか
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = SampleQueue::new();
        let sender = queue.sender();

        sender.send(vec![1i16; 4]);
        sender.send(vec![2i16; 4]);
        sender.send(vec![3i16; 4]);

        let chunks = queue.drain_all();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0][0], 1);
        assert_eq!(chunks[1][0], 2);
        assert_eq!(chunks[2][0], 3);
    }

    #[test]
    fn test_drain_empty() {
        let queue = SampleQueue::new();
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_drain_consumes() {
        let queue = SampleQueue::new();
        queue.sender().send(vec![1i16; 4]);

        assert_eq!(queue.drain_all().len(), 1);
        // 2回目は空（重複なし）
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = SampleQueue::new();
        let sender = queue.sender();
        sender.send(vec![1i16; 4]);
        sender.send(vec![2i16; 4]);

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cross_thread_handoff() {
        let queue = SampleQueue::new();
        let sender = queue.sender();

        // 別スレッドのプロデューサから順序を保って届く
        let handle = std::thread::spawn(move || {
            for i in 0..100i16 {
                sender.send(vec![i; 8]);
            }
        });
        handle.join().unwrap();

        let chunks = queue.drain_all();
        assert_eq!(chunks.len(), 100);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk[0], i as i16);
        }
    }
}
