//! Focal loss for dense classification maps.

use crate::grid::Grid;
use crate::util::math::sigmoid;
use crate::util::{DenseDetError, DenseDetResult};

/// Focal loss parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocalConfig {
    /// Modulating exponent on `(1 - p_t)`.
    pub gamma: f32,
    /// Positive-class balance weight.
    pub alpha: f32,
    /// Floor added to probabilities so the log never sees zero.
    pub epsilon: f32,
}

impl Default for FocalConfig {
    fn default() -> Self {
        Self {
            gamma: 2.0,
            alpha: 0.25,
            epsilon: 1e-5,
        }
    }
}

impl FocalConfig {
    /// Checks every field is within its valid range.
    pub fn validate(&self) -> DenseDetResult<()> {
        if !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return Err(DenseDetError::InvalidConfig {
                reason: "gamma must be non-negative",
            });
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(DenseDetError::InvalidConfig {
                reason: "alpha must lie in [0, 1]",
            });
        }
        if !(self.epsilon > 0.0) {
            return Err(DenseDetError::InvalidConfig {
                reason: "epsilon must be positive",
            });
        }
        Ok(())
    }
}

/// Sum-reduced focal loss between a logit grid and a target grid.
///
/// `p = sigmoid(logit) + eps`, `p_t = (1-t)(1-p) + t*p`,
/// `alpha_t = (1-t)(1-alpha) + t*alpha`,
/// `loss = sum(alpha_t * (1-p_t)^gamma * -ln(p_t))`.
pub fn focal_loss(logits: &Grid, targets: &Grid, config: &FocalConfig) -> DenseDetResult<f32> {
    logits.check_same_shape(targets, "focal loss inputs")?;
    config.validate()?;

    let mut total = 0.0f32;
    for (&logit, &target) in logits.as_slice().iter().zip(targets.as_slice().iter()) {
        let p = sigmoid(logit) + config.epsilon;
        let pt = (1.0 - target) * (1.0 - p) + target * p;
        let alphat = (1.0 - target) * (1.0 - config.alpha) + target * config.alpha;
        total += alphat * (1.0 - pt).powf(config.gamma) * -pt.ln();
    }
    Ok(total)
}
