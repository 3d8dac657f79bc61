use crate::errors::Result;
use crate::traits::SegmentationBackend;
use ndarray::prelude::*;

/// テスト用のモック推論バックエンド
///
/// `predict` は入力に関係なく、あらかじめ与えたスコアテンソルを返す。
#[derive(Debug, Clone)]
pub struct MockBackend {
    width: u32,
    height: u32,
    scores: Array3<f32>,
}

impl MockBackend {
    /// 全ピクセルを人物と判定する2チャンネルのモック
    pub fn all_person(width: u32, height: u32) -> Self {
        let mut scores = Array3::zeros((height as usize, width as usize, 2));
        scores.slice_mut(s![.., .., 1]).fill(1.0);
        Self {
            width,
            height,
            scores,
        }
    }

    /// 全ピクセルを背景と判定する2チャンネルのモック
    pub fn all_background(width: u32, height: u32) -> Self {
        let mut scores = Array3::zeros((height as usize, width as usize, 2));
        scores.slice_mut(s![.., .., 0]).fill(1.0);
        Self {
            width,
            height,
            scores,
        }
    }

    /// 任意の `[H, W, C]` スコアを返すモック
    pub fn with_scores(scores: Array3<f32>) -> Self {
        let (height, width, _) = scores.dim();
        Self {
            width: width as u32,
            height: height as u32,
            scores,
        }
    }
}

impl SegmentationBackend for MockBackend {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn predict(&self, _tensor: ArrayView4<f32>) -> Result<Array3<f32>> {
        Ok(self.scores.clone())
    }
}
