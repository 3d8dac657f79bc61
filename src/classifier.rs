use clap::ValueEnum;
use ndarray::prelude::*;
use num_traits::Float;

use crate::errors::{PersonSegError, Result};

/// Fixed label vocabulary of the multi-class model family (VOC ordering).
pub const LABELS: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "dining table",
    "dog",
    "horse",
    "motorbike",
    "person",
    "potted plant",
    "sheep",
    "sofa",
    "train",
    "tv",
];

/// Channel index of `"person"` in [`LABELS`].
pub const PERSON_CLASS: usize = 15;

/// ピクセル単位の判定規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DecisionRule {
    /// 背景／人物の2チャンネルロジットを比較する
    #[default]
    BinaryLogit,
    /// 全チャンネルの argmax が person クラスかどうかで判定する
    MultiClassArgmax,
}

impl std::fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::BinaryLogit => "binary-logit",
            Self::MultiClassArgmax => "multi-class-argmax",
        })
    }
}

/// 分類結果：ピクセル毎の判定グリッドと画像全体の集約フラグ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    pub is_person: Array2<bool>,
    pub has_person: bool,
}

/// Classifies every pixel of a `[H, W, C]` score tensor.
///
/// Pure function of the tensor and the rule; the channel count must match
/// the rule (2 for [`DecisionRule::BinaryLogit`], at least
/// `PERSON_CLASS + 1` for [`DecisionRule::MultiClassArgmax`]).
pub fn classify(scores: ArrayView3<'_, f32>, rule: DecisionRule) -> Result<SegmentationMask> {
    let (height, width, channels) = scores.dim();

    match rule {
        DecisionRule::BinaryLogit if channels != 2 => {
            return Err(PersonSegError::Validation {
                field: "output channels".to_string(),
                reason: format!("binary-logit rule needs 2 channels, model emits {channels}"),
            });
        }
        DecisionRule::MultiClassArgmax if channels <= PERSON_CLASS => {
            return Err(PersonSegError::Validation {
                field: "output channels".to_string(),
                reason: format!(
                    "multi-class-argmax rule needs at least {} channels, model emits {channels}",
                    PERSON_CLASS + 1
                ),
            });
        }
        _ => {}
    }

    let mut is_person = Array2::from_elem((height, width), false);
    let mut has_person = false;
    for ((y, x), flag) in is_person.indexed_iter_mut() {
        let pixel = scores.slice(s![y, x, ..]);
        let person = match rule {
            DecisionRule::BinaryLogit => binary_logit_is_person(pixel[0], pixel[1]),
            DecisionRule::MultiClassArgmax => argmax(pixel) == PERSON_CLASS,
        };
        *flag = person;
        has_person |= person;
    }

    Ok(SegmentationMask {
        is_person,
        has_person,
    })
}

/// Raw-logit comparison; preserves the ordering of the shared-denominator
/// softmax probabilities. Ties classify as background.
fn binary_logit_is_person<F: Float>(background: F, person: F) -> bool {
    person > background
}

/// Index of the maximum score, scanning channels in ascending order.
/// Only strictly greater values replace the running max, so the lowest
/// index among equal maxima wins.
fn argmax<F: Float>(scores: ArrayView1<'_, F>) -> usize {
    let mut mpos = 0;
    let mut max = scores[0];
    for (i, &v) in scores.iter().enumerate().skip(1) {
        if v > max {
            max = v;
            mpos = i;
        }
    }
    mpos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_tensor(logits: &[[[f32; 2]; 2]; 2]) -> Array3<f32> {
        let mut scores = Array3::zeros((2, 2, 2));
        for (y, row) in logits.iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                scores[[y, x, 0]] = pixel[0];
                scores[[y, x, 1]] = pixel[1];
            }
        }
        scores
    }

    #[test]
    fn person_label_index() {
        assert_eq!(LABELS[PERSON_CLASS], "person");
        assert_eq!(LABELS.len(), 21);
    }

    #[test]
    fn binary_rule_strict_inequality() {
        assert!(binary_logit_is_person(0.0_f32, 1.0));
        assert!(!binary_logit_is_person(1.0_f32, 0.0));
        // ties favor background
        assert!(!binary_logit_is_person(0.5_f32, 0.5));
    }

    #[test]
    fn binary_rule_matches_softmax() {
        let pairs: [(f32, f32); 5] = [(0.0, 1.0), (1.0, 0.0), (2.5, 2.5), (-3.0, -2.0), (4.0, -4.0)];
        for (a, b) in pairs {
            let eb = a.exp();
            let ep = b.exp();
            let p_background = eb / (eb + ep);
            let p_person = ep / (eb + ep);
            assert_eq!(binary_logit_is_person(a, b), p_person > p_background);
        }
    }

    #[test]
    fn argmax_picks_strict_maximum() {
        let scores = ndarray::arr1(&[0.1_f32, 0.3, 0.2]);
        assert_eq!(argmax(scores.view()), 1);
    }

    #[test]
    fn argmax_first_maximum_wins_on_tie() {
        let scores = ndarray::arr1(&[5.0_f32, 5.0, 3.0]);
        assert_eq!(argmax(scores.view()), 0);
    }

    #[test]
    fn multi_class_person_requires_strict_maximum() {
        let mut scores = Array3::zeros((1, 1, LABELS.len()));
        scores[[0, 0, PERSON_CLASS]] = 2.0;
        let mask = classify(scores.view(), DecisionRule::MultiClassArgmax).unwrap();
        assert!(mask.is_person[[0, 0]]);
        assert!(mask.has_person);

        // a tie at a lower index takes precedence over person
        scores[[0, 0, 0]] = 2.0;
        let mask = classify(scores.view(), DecisionRule::MultiClassArgmax).unwrap();
        assert!(!mask.is_person[[0, 0]]);
        assert!(!mask.has_person);
    }

    #[test]
    fn binary_rule_two_by_two_grid() {
        let scores = binary_tensor(&[[[0.0, 1.0], [1.0, 0.0]], [[0.0, 0.0], [-1.0, 2.0]]]);
        let mask = classify(scores.view(), DecisionRule::BinaryLogit).unwrap();
        assert_eq!(
            mask.is_person,
            ndarray::arr2(&[[true, false], [false, true]])
        );
        assert!(mask.has_person);
    }

    #[test]
    fn all_background_clears_aggregate() {
        let scores = binary_tensor(&[[[1.0, 0.0], [0.5, 0.5]], [[2.0, -2.0], [0.0, 0.0]]]);
        let mask = classify(scores.view(), DecisionRule::BinaryLogit).unwrap();
        assert!(!mask.has_person);
        assert!(mask.is_person.iter().all(|&p| !p));
    }

    #[test]
    fn channel_count_is_validated() {
        let scores = Array3::<f32>::zeros((2, 2, 3));
        assert!(matches!(
            classify(scores.view(), DecisionRule::BinaryLogit),
            Err(PersonSegError::Validation { .. })
        ));

        let scores = Array3::<f32>::zeros((2, 2, 2));
        assert!(matches!(
            classify(scores.view(), DecisionRule::MultiClassArgmax),
            Err(PersonSegError::Validation { .. })
        ));
    }
}
