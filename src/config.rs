use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

use crate::classifier::DecisionRule;
use crate::errors::{PersonSegError, Result};

/// `$HOME` 配下の既定モデルパス
const DEFAULT_MODEL_SUFFIX: &str = "models/segm_lite_128x128.onnx";

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// 処理する画像ファイル（入力順に処理される）
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<PathBuf>,

    /// モデルファイルパス（省略時は $HOME/models/segm_lite_128x128.onnx）
    #[arg(short, long, value_name = "FILE")]
    pub model_path: Option<PathBuf>,

    /// ピクセル毎の判定規則
    #[arg(short, long, value_enum, default_value_t = DecisionRule::BinaryLogit)]
    pub decision_rule: DecisionRule,

    /// デバッグログを出し、注釈付き画像を --output-dir に保存する
    #[arg(short, long)]
    pub verbose: bool,

    /// 注釈付き画像の保存先（verbose 時のみ使用）
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// 保存画像のフォーマット
    #[arg(long, default_value = "png", value_parser = check_format)]
    pub format: String,

    /// CUDA / TensorRT 実行プロバイダーのデバイス番号
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,
}

impl Config {
    /// Resolves the model path: the explicit override wins, otherwise the
    /// default under `$HOME`.
    pub fn resolve_model_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.model_path {
            return Ok(path.clone());
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(DEFAULT_MODEL_SUFFIX))
            .ok_or_else(|| PersonSegError::Configuration {
                message: "HOME is not set and no --model-path given".to_string(),
            })
    }
}

fn check_format(s: &str) -> std::result::Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
