use crate::errors::Result;
use ndarray::prelude::*;

/// 推論エンジンの抽象化
///
/// 依存関係逆転原則（DIP）に従い、具象クラスではなく抽象に依存する
pub trait SegmentationBackend: Send + Sync {
    /// モデルの入力サイズを取得 `(width, height)`
    fn input_size(&self) -> (u32, u32);

    /// テンソル予測（低レベルAPI）
    ///
    /// 入力 `[1, H, W, 3]` を推論し、バッチ次元を除いた `[H, W, C]` を返す
    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array3<f32>>;
}
