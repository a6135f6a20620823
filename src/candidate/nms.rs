//! Per-class greedy non-maximum suppression.

use crate::candidate::Detection;
use crate::geom::BoundingBox;
use crate::trace::{trace_event, trace_span};
use crate::util::{DenseDetError, DenseDetResult};

/// Greedy per-class NMS over parallel box/label/score sequences.
///
/// Within each class, candidates are visited in descending score order
/// (ties broken by lower original index); each kept candidate suppresses all
/// later same-class candidates whose IoU with it exceeds `iou_threshold`.
/// Returns indices into the input order, sorted by descending score for
/// deterministic output. Empty input yields an empty keep set.
pub fn nms_indices(
    boxes: &[BoundingBox],
    labels: &[usize],
    scores: &[f32],
    iou_threshold: f32,
) -> DenseDetResult<Vec<usize>> {
    if boxes.len() != labels.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "boxes vs labels",
            left: boxes.len(),
            right: labels.len(),
        });
    }
    if boxes.len() != scores.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "boxes vs scores",
            left: boxes.len(),
            right: scores.len(),
        });
    }
    if !(0.0..=1.0).contains(&iou_threshold) {
        return Err(DenseDetError::InvalidConfig {
            reason: "iou_threshold must lie in [0, 1]",
        });
    }

    let _span = trace_span!("nms", candidates = boxes.len()).entered();

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b)));

    let mut suppressed = vec![false; boxes.len()];
    let mut kept = Vec::new();
    for (rank, &idx) in order.iter().enumerate() {
        if suppressed[idx] {
            continue;
        }
        kept.push(idx);
        for &other in &order[rank + 1..] {
            if suppressed[other] || labels[other] != labels[idx] {
                continue;
            }
            if boxes[idx].iou(&boxes[other]) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }

    trace_event!("nms_kept", count = kept.len());
    Ok(kept)
}

/// Applies NMS to decoded detections, returning the survivors.
///
/// Survivors come back in descending score order, preserving the per-image
/// `{boxes, labels, scores}` output contract.
pub fn suppress(detections: &[Detection], iou_threshold: f32) -> DenseDetResult<Vec<Detection>> {
    let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
    let labels: Vec<usize> = detections.iter().map(|d| d.label).collect();
    let scores: Vec<f32> = detections.iter().map(|d| d.score).collect();
    let kept = nms_indices(&boxes, &labels, &scores, iou_threshold)?;
    Ok(kept.into_iter().map(|idx| detections[idx]).collect())
}
