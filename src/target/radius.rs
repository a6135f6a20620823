//! Gaussian splat radius from box size and minimum-overlap guarantee.

use crate::util::{DenseDetError, DenseDetResult};

/// Smallest splat radius such that any box whose corners stay within `r` of
/// the true corners still overlaps the true box by at least `min_overlap`.
///
/// Three quadratics model the three overlap regimes (corner-touching,
/// edge-touching, containment); the minimum of their positive roots wins.
/// Zero-area boxes are rejected rather than producing a NaN radius.
pub fn gaussian_radius(height: f32, width: f32, min_overlap: f32) -> DenseDetResult<f32> {
    if !(height > 0.0 && height.is_finite() && width > 0.0 && width.is_finite()) {
        return Err(DenseDetError::DegenerateBox { height, width });
    }
    if !(min_overlap > 0.0 && min_overlap < 1.0) {
        return Err(DenseDetError::InvalidConfig {
            reason: "min_overlap must lie strictly between 0 and 1",
        });
    }

    let a1 = 1.0;
    let b1 = height + width;
    let c1 = width * height * (1.0 - min_overlap) / (1.0 + min_overlap);
    let sq1 = (b1 * b1 - 4.0 * a1 * c1).sqrt();
    let r1 = (b1 + sq1) / 2.0;

    let a2 = 4.0;
    let b2 = 2.0 * (height + width);
    let c2 = (1.0 - min_overlap) * width * height;
    let sq2 = (b2 * b2 - 4.0 * a2 * c2).sqrt();
    let r2 = (b2 + sq2) / 2.0;

    let a3 = 4.0 * min_overlap;
    let b3 = -2.0 * min_overlap * (height + width);
    let c3 = (min_overlap - 1.0) * width * height;
    let sq3 = (b3 * b3 - 4.0 * a3 * c3).sqrt();
    let r3 = (b3 + sq3) / 2.0;

    Ok(r1.min(r2).min(r3))
}
