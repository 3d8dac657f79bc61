pub mod annotate;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod model;
pub mod traits;

pub mod mocks;

use std::fs;
use std::io::Write;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

pub use classifier::{classify, DecisionRule, SegmentationMask, LABELS, PERSON_CLASS};
pub use config::Config;
pub use errors::{PersonSegError, Result};
pub use model::Model;
pub use traits::SegmentationBackend;

/// 画像バッチを1枚ずつ処理するパイプライン
///
/// モデルの内部バッファは呼び出し毎に書き換わるため、画像は入力順に
/// 逐次処理する。2枚の画像のテンソルが同時に飛ぶことはない。
pub struct ImageProcessor<M: SegmentationBackend> {
    model: M,
    config: Config,
}

impl<M: SegmentationBackend> ImageProcessor<M> {
    pub const fn new(model: M, config: Config) -> Self {
        Self { model, config }
    }

    /// Processes every configured image in input order, writing one line per
    /// image to `out`: `"<has_person> <path>"` on success, or
    /// `"Exception <path>"` when that image fails. A per-image failure never
    /// aborts the batch.
    pub fn process_batch<W: Write>(&self, out: &mut W) -> Result<()> {
        let pb = ProgressBar::new(self.config.images.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        for path in &self.config.images {
            let outcome = self.process_image(path).and_then(|(image, has_person)| {
                if self.config.verbose {
                    self.save_annotated(path, &image)?;
                }
                Ok(has_person)
            });
            match outcome {
                Ok(has_person) => {
                    writeln!(out, "{} {}", has_person, path.display())?;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "画像をスキップ");
                    writeln!(out, "Exception {}", path.display())?;
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(())
    }

    /// 1枚分のパイプライン: decode → preprocess → predict → classify → annotate
    ///
    /// Returns the annotated resized image and the whole-image person flag.
    pub fn process_image(&self, path: &Path) -> Result<(RgbImage, bool)> {
        let image = image::open(path)
            .map_err(|e| PersonSegError::ImageProcessing {
                path: path.display().to_string(),
                operation: "画像読み込み".to_string(),
                source: Box::new(e),
            })?
            .into_rgb8();

        let (mut resized, tensor) = model::preprocess(&image, self.model.input_size())?;
        let scores = self.model.predict(tensor.view())?;
        let mask = classifier::classify(scores.view(), self.config.decision_rule)?;
        annotate::paint_person_pixels(&mut resized, mask.is_person.view())?;

        Ok((resized, mask.has_person))
    }

    fn save_annotated(&self, input: &Path, image: &RgbImage) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir).map_err(|e| PersonSegError::FileSystem {
            path: self.config.output_dir.clone(),
            operation: "出力ディレクトリ作成".to_string(),
            source: e,
        })?;

        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        let output_file = self
            .config
            .output_dir
            .join(stem)
            .with_extension(&self.config.format);

        let output_format = match self.config.format.as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "bmp" => ImageFormat::Bmp,
            "gif" => ImageFormat::Gif,
            "tiff" => ImageFormat::Tiff,
            _ => ImageFormat::Png,
        };

        image
            .save_with_format(&output_file, output_format)
            .map_err(|e| PersonSegError::ImageProcessing {
                path: output_file.display().to_string(),
                operation: "画像保存".to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockBackend;
    use image::Rgb;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(images: Vec<PathBuf>) -> Config {
        Config {
            images,
            model_path: None,
            decision_rule: DecisionRule::BinaryLogit,
            verbose: false,
            output_dir: PathBuf::from("output"),
            format: "png".to_string(),
            device_id: 0,
        }
    }

    fn write_test_image(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(5, 5, Rgb([10, 20, 30]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn process_image_flags_and_paints_person() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_test_image(&dir, "person.png");
        let processor = ImageProcessor::new(MockBackend::all_person(4, 4), test_config(vec![]));

        let (annotated, has_person) = processor.process_image(&path)?;

        assert!(has_person);
        assert_eq!(annotated.dimensions(), (4, 4));
        assert!(annotated.pixels().all(|p| *p == annotate::PERSON_COLOR));
        Ok(())
    }

    #[test]
    fn process_image_without_person_keeps_pixels() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_test_image(&dir, "empty.png");
        let processor = ImageProcessor::new(MockBackend::all_background(4, 4), test_config(vec![]));

        let (annotated, has_person) = processor.process_image(&path)?;

        assert!(!has_person);
        assert!(annotated.pixels().all(|p| *p != annotate::PERSON_COLOR));
        Ok(())
    }

    #[test]
    fn batch_reports_one_line_per_image() -> Result<()> {
        let dir = TempDir::new()?;
        let first = write_test_image(&dir, "first.png");
        let second = write_test_image(&dir, "second.png");
        let config = test_config(vec![first.clone(), second.clone()]);
        let processor = ImageProcessor::new(MockBackend::all_person(4, 4), config);

        let mut out = Vec::new();
        processor.process_batch(&mut out)?;

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!("true {}\ntrue {}\n", first.display(), second.display())
        );
        Ok(())
    }
}
