use std::path::PathBuf;
use thiserror::Error;

/// 録音セッションのエラー分類
///
/// いずれのエラーもプロセスを終了させない。セッション状態の境界で
/// 回復し、ユーザー操作のためにUIへ表示される。
#[derive(Debug, Error)]
pub enum SessionError {
    /// 前提条件エラー
    ///
    /// サンプル保存先が未設定・レクリスト未読み込みなど。
    /// 状態は変化せず、入力を修正すれば回復できる。
    #[error("前提条件エラー: {0}")]
    Precondition(String),

    /// 入力デバイスが見つからない、または使用中
    ///
    /// セッションは選択中のまま維持され、リトライ可能。
    #[error("入力デバイスが利用できません: {0}")]
    DeviceUnavailable(String),

    /// 既存WAVファイルをデコードできない
    ///
    /// エントリ単位で報告され、他エントリへの移動は妨げない。
    #[error("WAVファイルを読み込めません: {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// WAVファイルの書き込み失敗
    ///
    /// エントリは録音済みにならず、リトライ可能。
    #[error("WAVファイルの書き込みに失敗: {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}
