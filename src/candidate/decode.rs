//! Dense per-level predictions to a flat candidate list.

use crate::candidate::Detection;
use crate::geom::BoundingBox;
use crate::grid::pyramid::{LevelMaps, PyramidSpec};
use crate::trace::{trace_event, trace_span};
use crate::util::math::argmax;
use crate::util::{DenseDetError, DenseDetResult};

/// Configuration for pyramid decoding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecoderConfig {
    /// Minimum best-class confidence for a pixel to produce a candidate.
    /// Values `<= 0` keep every pixel.
    pub score_threshold: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.05,
        }
    }
}

/// Reconstructs candidate boxes from per-level prediction maps.
///
/// Inputs are probabilities: `label` and `center` post-sigmoid, `reg`
/// exponentiated positive distances. Each pixel whose best-class confidence
/// passes the threshold yields one candidate at
/// `(y*stride - top, x*stride - left, y*stride + bottom, x*stride + right)`
/// with score `class confidence * center-ness`. Candidates from all levels
/// are returned in one list, coarsest level first.
pub fn decode_pyramid(
    spec: &PyramidSpec,
    levels: &[LevelMaps],
    config: &DecoderConfig,
) -> DenseDetResult<Vec<Detection>> {
    let _span = trace_span!("decode_pyramid", levels = levels.len()).entered();
    if levels.len() != spec.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "prediction levels vs pyramid spec",
            left: levels.len(),
            right: spec.len(),
        });
    }
    let num_labels = levels[0].label.channels();

    let mut detections = Vec::new();
    for (level_spec, maps) in spec.levels().iter().zip(levels.iter()) {
        maps.validate_against(level_spec, num_labels)?;
        decode_level(level_spec.stride, maps, config, &mut detections)?;
    }

    trace_event!("decoded_candidates", count = detections.len());
    Ok(detections)
}

fn decode_level(
    stride: usize,
    maps: &LevelMaps,
    config: &DecoderConfig,
    out: &mut Vec<Detection>,
) -> DenseDetResult<()> {
    let height = maps.center.height();
    let width = maps.center.width();
    let num_labels = maps.label.channels();
    let plane_len = height * width;

    let label_data = maps.label.as_slice();
    let reg_data = maps.reg.as_slice();
    let center_data = maps.center.as_slice();

    let mut class_scores = vec![0.0f32; num_labels];
    for y in 0..height {
        for x in 0..width {
            let pixel = y * width + x;
            for (c, score) in class_scores.iter_mut().enumerate() {
                *score = label_data[c * plane_len + pixel];
            }
            let label = argmax(&class_scores).expect("num_labels is positive");
            let confidence = class_scores[label];
            if config.score_threshold > 0.0 && confidence <= config.score_threshold {
                continue;
            }

            let top = reg_data[pixel];
            let left = reg_data[plane_len + pixel];
            let bottom = reg_data[2 * plane_len + pixel];
            let right = reg_data[3 * plane_len + pixel];
            let pos_y = (y * stride) as f32;
            let pos_x = (x * stride) as f32;
            let bbox = BoundingBox::new(pos_y - top, pos_x - left, pos_y + bottom, pos_x + right)?;

            out.push(Detection {
                bbox,
                label,
                score: confidence * center_data[pixel],
            });
        }
    }
    Ok(())
}
