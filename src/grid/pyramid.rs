//! Pyramid shape contract and per-level map bundles.
//!
//! A `PyramidSpec` describes the feature pyramid a detection head produces:
//! one `(stride, max_box_side, height, width)` entry per level, ordered
//! coarsest (largest stride) to finest. The reference configuration uses
//! strides `[32, 16, 8, 4]` with size thresholds `[256, 128, 64, 32]`.

use crate::grid::Grid;
use crate::util::{DenseDetError, DenseDetResult};

/// Shape of one pyramid level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelSpec {
    /// Downsampling factor between input resolution and this level.
    pub stride: usize,
    /// Largest box side (input units) this level is responsible for.
    pub max_box_side: f32,
    /// Feature map height.
    pub height: usize,
    /// Feature map width.
    pub width: usize,
}

/// Ordered pyramid shape, coarsest level first.
#[derive(Clone, Debug, PartialEq)]
pub struct PyramidSpec {
    levels: Vec<LevelSpec>,
}

impl PyramidSpec {
    /// Validates and wraps a coarse-to-fine level sequence.
    ///
    /// Strides must be strictly decreasing; all dimensions and thresholds
    /// must be positive.
    pub fn new(levels: Vec<LevelSpec>) -> DenseDetResult<Self> {
        if levels.is_empty() {
            return Err(DenseDetError::EmptyPyramid);
        }
        let mut prev_stride = usize::MAX;
        for level in &levels {
            if level.stride == 0 || level.height == 0 || level.width == 0 {
                return Err(DenseDetError::InvalidConfig {
                    reason: "level stride and dimensions must be positive",
                });
            }
            if !(level.max_box_side > 0.0) {
                return Err(DenseDetError::InvalidConfig {
                    reason: "level max_box_side must be positive",
                });
            }
            if level.stride >= prev_stride {
                return Err(DenseDetError::InvalidConfig {
                    reason: "level strides must decrease from coarsest to finest",
                });
            }
            prev_stride = level.stride;
        }
        Ok(Self { levels })
    }

    /// Builds the reference four-level shape for a given input resolution.
    ///
    /// Strides `[32, 16, 8, 4]`, thresholds `[256, 128, 64, 32]`, level
    /// dimensions rounded up from the input size.
    pub fn reference(input_height: usize, input_width: usize) -> DenseDetResult<Self> {
        if input_height == 0 || input_width == 0 {
            return Err(DenseDetError::InvalidConfig {
                reason: "input dimensions must be positive",
            });
        }
        let strides = [32usize, 16, 8, 4];
        let max_box_sides = [256.0f32, 128.0, 64.0, 32.0];
        let levels = strides
            .iter()
            .zip(max_box_sides.iter())
            .map(|(&stride, &max_box_side)| LevelSpec {
                stride,
                max_box_side,
                height: input_height.div_ceil(stride),
                width: input_width.div_ceil(stride),
            })
            .collect();
        Self::new(levels)
    }

    /// Returns all levels, coarsest first.
    pub fn levels(&self) -> &[LevelSpec] {
        &self.levels
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a constructed spec; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns the spec for one level.
    pub fn level(&self, index: usize) -> Option<&LevelSpec> {
        self.levels.get(index)
    }
}

/// Dense per-level maps: edge-distance regression, per-class labels, and
/// center-ness.
///
/// The same bundle carries encoded targets (probabilities in `[0, 1]`, reg in
/// input units) and head outputs. Head outputs feed the loss as logits for
/// `label` and `center`, and feed the decoder as post-sigmoid probabilities;
/// `reg` is always positive distances.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelMaps {
    /// `[4, H, W]` distances to box edges in `(top, left, bottom, right)` order.
    pub reg: Grid,
    /// `[num_labels, H, W]` per-class indicator or confidence.
    pub label: Grid,
    /// `[1, H, W]` center-ness.
    pub center: Grid,
}

impl LevelMaps {
    /// Creates zero-filled maps for one level.
    pub fn zeros(num_labels: usize, height: usize, width: usize) -> DenseDetResult<Self> {
        Ok(Self {
            reg: Grid::zeros(4, height, width)?,
            label: Grid::zeros(num_labels, height, width)?,
            center: Grid::zeros(1, height, width)?,
        })
    }

    /// Checks this bundle against a level spec and class count.
    pub fn validate_against(&self, spec: &LevelSpec, num_labels: usize) -> DenseDetResult<()> {
        let expect = |channels: usize, grid: &Grid, context: &'static str| {
            let expected = (channels, spec.height, spec.width);
            if grid.shape() != expected {
                return Err(DenseDetError::ShapeMismatch {
                    context,
                    expected,
                    got: grid.shape(),
                });
            }
            Ok(())
        };
        expect(4, &self.reg, "reg map")?;
        expect(num_labels, &self.label, "label map")?;
        expect(1, &self.center, "center map")
    }
}
