//! Center-ness loss over positive pixels.

use crate::util::math::bce_with_logits;
use crate::util::{DenseDetError, DenseDetResult};

/// Mean binary cross-entropy between predicted center-ness logits and target
/// center-ness probabilities, restricted by the caller to positive pixels.
///
/// An empty sample set yields 0 by convention.
pub fn centerness_loss(pred_logits: &[f32], targets: &[f32]) -> DenseDetResult<f32> {
    if pred_logits.len() != targets.len() {
        return Err(DenseDetError::LengthMismatch {
            context: "center logits vs targets",
            left: pred_logits.len(),
            right: targets.len(),
        });
    }
    if pred_logits.is_empty() {
        return Ok(0.0);
    }
    let total: f32 = pred_logits
        .iter()
        .zip(targets.iter())
        .map(|(&logit, &target)| bce_with_logits(logit, target))
        .sum();
    Ok(total / pred_logits.len() as f32)
}
