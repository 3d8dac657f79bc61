use std::path::Path;

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    ep::{CUDA as CUDAExecutionProvider, TensorRT as TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::{PersonSegError, Result},
    traits::SegmentationBackend,
};

/// ONNX Runtime バックエンド
///
/// モデルは起動時に一度だけ読み込み、全画像で再利用する。内部バッファは
/// `invoke` 毎に書き換わるため、`Mutex` で同時に複数画像を流さないことを保証する。
pub struct Model {
    width: u32,
    height: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(|e| PersonSegError::Model {
                operation: "セッションビルダー初期化".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| PersonSegError::Model {
                operation: "実行プロバイダー設定".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| PersonSegError::Model {
                operation: "メモリパターン設定".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PersonSegError::Model {
                operation: format!("モデルファイル読み込み: {}", model_path.display()),
                source: Box::new(e),
            })?;

        // 入力は NHWC `[1, H, W, 3]`
        let (height, width) = {
            let shape =
                session.inputs[0]
                    .input_type
                    .tensor_shape()
                    .ok_or_else(|| PersonSegError::Model {
                        operation: "モデル入力形状取得".to_string(),
                        source: Box::new(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "テンソル形状が取得できません",
                        )),
                    })?;
            if shape.len() != 4 || shape[1] <= 0 || shape[2] <= 0 {
                return Err(PersonSegError::Model {
                    operation: "モデル入力形状取得".to_string(),
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("NHWC 形状ではありません: {shape:?}"),
                    )),
                });
            }
            (shape[1] as u32, shape[2] as u32)
        };
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        // initialize model
        let data = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data).map_err(
                |e| PersonSegError::Model {
                    operation: "初期化テンソル作成".to_string(),
                    source: Box::new(e),
                },
            )?])
            .map_err(|e| PersonSegError::Model {
                operation: "モデル初期化実行".to_string(),
                source: Box::new(e),
            })?;

        debug!(width, height, input = %input_name, output = %output_name, "model loaded");

        Ok(Self {
            width,
            height,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }
}

impl SegmentationBackend for Model {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array3<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();
        // バッチ次元を除く `[1, H, W, C] -> [H, W, C]`
        Ok(scores.index_axis_move(Axis(0), 0))
    }
}

/// Resizes the decoded image to the model's input grid and builds the
/// normalized `[1, H, W, 3]` input tensor. Aspect ratio is not preserved;
/// the model dictates a fixed input rectangle. The resized image is returned
/// alongside the tensor because it is the canvas the annotator paints on.
pub fn preprocess(image: &RgbImage, (width, height): (u32, u32)) -> Result<(RgbImage, Array4<f32>)> {
    let resized = imageops::resize(image, width, height, FilterType::CatmullRom);
    let data = resized.as_raw().iter().map(|&v| normalize(v)).collect();
    let tensor = Array4::from_shape_vec((1, height as usize, width as usize, 3), data)?;
    Ok((resized, tensor))
}

/// Affine map from the 0-255 byte range onto [-1.0, 1.0].
fn normalize(value: u8) -> f32 {
    (f32::from(value) - 127.5) / 127.5
}
