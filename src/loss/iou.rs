//! IoU regression loss over edge-distance samples.

use crate::geom::EdgeDistances;
use crate::util::{DenseDetError, DenseDetResult};

/// IoU loss between predicted and target edge distances.
///
/// Per sample: `-ln((intersection + 1) / (union + 1))` with intersection and
/// union computed from the `(top, left, bottom, right)` distances. The `+1`
/// smoothing keeps the ratio finite when both areas are zero; it is a
/// deliberate constant, not a guard against a bug. With a weight vector whose
/// sum is positive the result is the weighted mean, otherwise the plain mean.
/// An empty sample set yields 0 by convention (no positive pixels is normal
/// background behavior).
pub fn iou_loss(
    pred: &[EdgeDistances],
    target: &[EdgeDistances],
    weights: Option<&[f32]>,
) -> DenseDetResult<f32> {
    if pred.len() != target.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "pred vs target distances",
            left: pred.len(),
            right: target.len(),
        });
    }
    if let Some(weights) = weights {
        if weights.len() != pred.len() {
            return Err(DenseDetError::LengthMismatch {
                context: "distances vs weights",
                left: pred.len(),
                right: weights.len(),
            });
        }
    }
    if pred.is_empty() {
        return Ok(0.0);
    }

    let losses: Vec<f32> = pred
        .iter()
        .zip(target.iter())
        .map(|(p, t)| {
            let pred_area = (p.left + p.right) * (p.top + p.bottom);
            let target_area = (t.left + t.right) * (t.top + t.bottom);
            let w_intersect = p.left.min(t.left) + p.right.min(t.right);
            let h_intersect = p.bottom.min(t.bottom) + p.top.min(t.top);
            let area_intersect = w_intersect * h_intersect;
            let area_union = target_area + pred_area - area_intersect;
            -((area_intersect + 1.0) / (area_union + 1.0)).ln()
        })
        .collect();

    match weights {
        Some(weights) if weights.iter().sum::<f32>() > 0.0 => {
            let weight_sum: f32 = weights.iter().sum();
            let weighted: f32 = losses
                .iter()
                .zip(weights.iter())
                .map(|(loss, weight)| loss * weight)
                .sum();
            Ok(weighted / weight_sum)
        }
        _ => Ok(losses.iter().sum::<f32>() / losses.len() as f32),
    }
}
