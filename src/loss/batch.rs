//! Pyramid flattening, per-image loss, and batch aggregation.

use crate::geom::{BoxSet, EdgeDistances};
use crate::grid::pyramid::{LevelMaps, PyramidSpec};
use crate::loss::center::centerness_loss;
use crate::loss::focal::{focal_loss, FocalConfig};
use crate::loss::iou::iou_loss;
use crate::target::pyramid::PyramidEncoder;
use crate::trace::{trace_event, trace_span};
use crate::util::{DenseDetError, DenseDetResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Loss engine parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LossConfig {
    /// Focal loss parameters for the label maps.
    pub focal: FocalConfig,
    /// Weight applied to the regression term in `LossTerms::weighted_total`.
    pub reg_weight: f32,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            focal: FocalConfig::default(),
            reg_weight: 1.0,
        }
    }
}

impl LossConfig {
    /// Checks every field is within its valid range.
    pub fn validate(&self) -> DenseDetResult<()> {
        self.focal.validate()?;
        if !(self.reg_weight >= 0.0 && self.reg_weight.is_finite()) {
            return Err(DenseDetError::InvalidConfig {
                reason: "reg_weight must be non-negative",
            });
        }
        Ok(())
    }
}

/// The three scalar loss terms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LossTerms {
    /// Focal label loss.
    pub label: f32,
    /// IoU regression loss.
    pub reg: f32,
    /// Center-ness BCE loss.
    pub center: f32,
}

impl LossTerms {
    /// Combines the terms with the configured regression weight.
    pub fn weighted_total(&self, config: &LossConfig) -> f32 {
        self.label + config.reg_weight * self.reg + self.center
    }
}

/// Loss for one image's pyramid.
///
/// `outputs` carry logits in `label` and `center` and positive distances in
/// `reg`; `targets` carry probabilities throughout (the encoder's output).
/// Positive pixels are those whose target label channels sum above zero.
/// The focal sum over every pixel is normalized by `positives + 1`; the
/// regression term is a center-ness-weighted IoU mean over positives and the
/// center term a BCE mean over positives, both 0 when no pixel is positive.
pub fn pyramid_loss(
    outputs: &[LevelMaps],
    targets: &[LevelMaps],
    config: &LossConfig,
) -> DenseDetResult<LossTerms> {
    let _span = trace_span!("pyramid_loss", levels = outputs.len()).entered();
    config.validate()?;
    if outputs.len() != targets.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "output levels vs target levels",
            left: outputs.len(),
            right: targets.len(),
        });
    }

    let mut focal_sum = 0.0f32;
    let mut pred_reg = Vec::new();
    let mut target_reg = Vec::new();
    let mut pred_center = Vec::new();
    let mut target_center = Vec::new();

    for (out, tgt) in outputs.iter().zip(targets.iter()) {
        out.reg.check_same_shape(&tgt.reg, "reg maps")?;
        out.label.check_same_shape(&tgt.label, "label maps")?;
        out.center.check_same_shape(&tgt.center, "center maps")?;

        focal_sum += focal_loss(&out.label, &tgt.label, &config.focal)?;
        collect_positives(
            out,
            tgt,
            &mut pred_reg,
            &mut target_reg,
            &mut pred_center,
            &mut target_center,
        );
    }

    let npos = target_reg.len() as f32 + 1.0;
    let label = focal_sum / npos;
    let mut terms = LossTerms {
        label,
        ..LossTerms::default()
    };
    if !target_reg.is_empty() {
        terms.reg = iou_loss(&pred_reg, &target_reg, Some(&target_center))?;
        terms.center = centerness_loss(&pred_center, &target_center)?;
    }

    trace_event!("pyramid_loss_done", positives = target_reg.len());
    Ok(terms)
}

/// Appends the positive-pixel samples of one level to the flat accumulators.
fn collect_positives(
    out: &LevelMaps,
    tgt: &LevelMaps,
    pred_reg: &mut Vec<EdgeDistances>,
    target_reg: &mut Vec<EdgeDistances>,
    pred_center: &mut Vec<f32>,
    target_center: &mut Vec<f32>,
) {
    let (num_labels, height, width) = tgt.label.shape();
    let plane_len = height * width;
    let tgt_label = tgt.label.as_slice();
    let out_reg = out.reg.as_slice();
    let tgt_reg = tgt.reg.as_slice();
    let out_center = out.center.as_slice();
    let tgt_center = tgt.center.as_slice();

    for pixel in 0..plane_len {
        let mut label_sum = 0.0f32;
        for c in 0..num_labels {
            label_sum += tgt_label[c * plane_len + pixel];
        }
        if label_sum <= 0.0 {
            continue;
        }
        pred_reg.push(distances_at(out_reg, plane_len, pixel));
        target_reg.push(distances_at(tgt_reg, plane_len, pixel));
        pred_center.push(out_center[pixel]);
        target_center.push(tgt_center[pixel]);
    }
}

fn distances_at(reg: &[f32], plane_len: usize, pixel: usize) -> EdgeDistances {
    EdgeDistances {
        top: reg[pixel],
        left: reg[plane_len + pixel],
        bottom: reg[2 * plane_len + pixel],
        right: reg[3 * plane_len + pixel],
    }
}

/// Batch loss: encodes targets per image, averages per-image terms.
///
/// `outputs[i]` is image `i`'s head output across all levels; `truths[i]` its
/// ground-truth boxes. Targets are re-encoded from the boxes on every call
/// and discarded afterwards.
pub fn batch_loss(
    outputs: &[Vec<LevelMaps>],
    truths: &[BoxSet],
    spec: &PyramidSpec,
    num_labels: usize,
    config: &LossConfig,
) -> DenseDetResult<LossTerms> {
    let _span = trace_span!("batch_loss", batch = truths.len()).entered();
    check_batch(outputs, truths)?;
    let encoder = PyramidEncoder::new(num_labels)?;

    let mut total = LossTerms::default();
    for (out, truth) in outputs.iter().zip(truths.iter()) {
        let terms = image_loss(&encoder, out, truth, spec, config)?;
        total.label += terms.label;
        total.reg += terms.reg;
        total.center += terms.center;
    }
    Ok(scale_terms(total, truths.len()))
}

/// Batch loss with per-image parallelism.
///
/// Images are independent and the per-image terms combine by plain summation,
/// so the result matches `batch_loss` exactly.
#[cfg(feature = "rayon")]
pub fn batch_loss_par(
    outputs: &[Vec<LevelMaps>],
    truths: &[BoxSet],
    spec: &PyramidSpec,
    num_labels: usize,
    config: &LossConfig,
) -> DenseDetResult<LossTerms> {
    let _span = trace_span!("batch_loss", batch = truths.len(), parallel = true).entered();
    check_batch(outputs, truths)?;
    let encoder = PyramidEncoder::new(num_labels)?;

    let per_image: Vec<LossTerms> = outputs
        .par_iter()
        .zip(truths.par_iter())
        .map(|(out, truth)| image_loss(&encoder, out, truth, spec, config))
        .collect::<DenseDetResult<_>>()?;

    let mut total = LossTerms::default();
    for terms in &per_image {
        total.label += terms.label;
        total.reg += terms.reg;
        total.center += terms.center;
    }
    Ok(scale_terms(total, truths.len()))
}

fn check_batch(outputs: &[Vec<LevelMaps>], truths: &[BoxSet]) -> DenseDetResult<()> {
    if outputs.len() != truths.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "batch outputs vs truths",
            left: outputs.len(),
            right: truths.len(),
        });
    }
    if truths.is_empty() {
        return Err(DenseDetError::InvalidConfig {
            reason: "batch must contain at least one image",
        });
    }
    Ok(())
}

fn image_loss(
    encoder: &PyramidEncoder,
    outputs: &[LevelMaps],
    truth: &BoxSet,
    spec: &PyramidSpec,
    config: &LossConfig,
) -> DenseDetResult<LossTerms> {
    let targets = encoder.encode(truth, spec)?;
    pyramid_loss(outputs, &targets, config)
}

fn scale_terms(mut total: LossTerms, batch: usize) -> LossTerms {
    let batch = batch as f32;
    total.label /= batch;
    total.reg /= batch;
    total.center /= batch;
    total
}
