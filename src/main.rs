use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use person_seg_rs::{Config, ImageProcessor, Model};

fn main() -> Result<()> {
    let config = Config::parse();

    let max_level = if config.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    let model_path = config.resolve_model_path()?;
    info!("モデルファイルパス: {}", model_path.display());
    info!("判定規則: {}", config.decision_rule);

    // モデル読み込みの失敗は致命的。画像処理前に中断する。
    let model = Model::new(&model_path, config.device_id)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;

    let processor = ImageProcessor::new(model, config);
    processor.process_batch(&mut std::io::stdout().lock())?;

    Ok(())
}
