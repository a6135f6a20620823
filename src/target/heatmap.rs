//! Center-point keypoint/size target encoding at a single stride.

use crate::geom::BoxSet;
use crate::grid::Grid;
use crate::target::radius::gaussian_radius;
use crate::trace::{trace_event, trace_span};
use crate::util::{DenseDetError, DenseDetResult};

/// How a box's footprint is written into its class channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeatmapMode {
    /// Isotropic gaussian splat sized by the minimum-overlap radius.
    Gaussian,
    /// Flat rectangular patch around the center pixel.
    Rectangle,
}

/// Configuration for `HeatmapEncoder`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatmapEncoderConfig {
    /// Footprint mode.
    pub mode: HeatmapMode,
    /// Rectangle half-extent in feature pixels; negative derives a
    /// proportional half-extent from the box size.
    pub radius: i32,
    /// Minimum-overlap guarantee for the gaussian radius (gaussian mode).
    pub min_overlap: f32,
    /// Downsampling factor between input image and the target map.
    pub stride: usize,
    /// Number of class channels.
    pub num_labels: usize,
}

impl Default for HeatmapEncoderConfig {
    fn default() -> Self {
        Self {
            mode: HeatmapMode::Gaussian,
            radius: -1,
            min_overlap: 0.7,
            stride: 4,
            num_labels: 1,
        }
    }
}

impl HeatmapEncoderConfig {
    /// Checks every field is within its valid range.
    pub fn validate(&self) -> DenseDetResult<()> {
        if self.stride == 0 {
            return Err(DenseDetError::InvalidConfig {
                reason: "stride must be positive",
            });
        }
        if self.num_labels == 0 {
            return Err(DenseDetError::InvalidConfig {
                reason: "num_labels must be positive",
            });
        }
        if self.mode == HeatmapMode::Gaussian && !(self.min_overlap > 0.0 && self.min_overlap < 1.0)
        {
            return Err(DenseDetError::InvalidConfig {
                reason: "min_overlap must lie strictly between 0 and 1",
            });
        }
        Ok(())
    }
}

/// Dense keypoint and size targets for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapTarget {
    /// `[num_labels, H, W]` keypoint confidence in `[0, 1]`.
    pub keypoint: Grid,
    /// `[2, H, W]` box size `(height, width)` at the center pixel.
    pub size: Grid,
}

/// Encodes ground-truth boxes into keypoint/size targets at one stride.
#[derive(Clone, Debug)]
pub struct HeatmapEncoder {
    config: HeatmapEncoderConfig,
}

impl HeatmapEncoder {
    /// Creates an encoder after validating the configuration.
    pub fn new(config: HeatmapEncoderConfig) -> DenseDetResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the encoder configuration.
    pub fn config(&self) -> &HeatmapEncoderConfig {
        &self.config
    }

    /// Encodes one image's boxes into a `height` x `width` target map.
    ///
    /// Class footprints are max-combined, so the result does not depend on
    /// box order. The size channels are overwritten per center pixel (last
    /// box wins when two centers collide).
    pub fn encode(
        &self,
        boxes: &BoxSet,
        height: usize,
        width: usize,
    ) -> DenseDetResult<HeatmapTarget> {
        let _span = trace_span!("encode_heatmap", boxes = boxes.len()).entered();
        let cfg = &self.config;
        let mut keypoint = Grid::zeros(cfg.num_labels, height, width)?;
        let mut size = Grid::zeros(2, height, width)?;

        for (bbox, label) in boxes.iter() {
            if label >= cfg.num_labels {
                return Err(DenseDetError::LabelOutOfRange {
                    label,
                    num_labels: cfg.num_labels,
                });
            }
            let (cy, cx) = bbox.center();
            let py = (cy / cfg.stride as f32).floor() as i64;
            let px = (cx / cfg.stride as f32).floor() as i64;
            if py < 0 || px < 0 || py as usize >= height || px as usize >= width {
                return Err(DenseDetError::CenterOutsideMap {
                    py,
                    px,
                    height,
                    width,
                });
            }
            let (py, px) = (py as usize, px as usize);

            size.set(0, py, px, bbox.height())?;
            size.set(1, py, px, bbox.width())?;
            keypoint.set(label, py, px, 1.0)?;

            match cfg.mode {
                HeatmapMode::Gaussian => {
                    let radius = gaussian_radius(bbox.height(), bbox.width(), cfg.min_overlap)?;
                    let sigma = radius / 3.0;
                    if sigma > 0.0 {
                        splat_gaussian(&mut keypoint, label, cy, cx, sigma, cfg.stride);
                    }
                }
                HeatmapMode::Rectangle => {
                    let (hrad, wrad) = if cfg.radius >= 0 {
                        (cfg.radius as i64, cfg.radius as i64)
                    } else {
                        let prop = 0.3;
                        let stride = cfg.stride as f32;
                        (
                            ((bbox.height() / stride) / 2.0 * prop).floor() as i64,
                            ((bbox.width() / stride) / 2.0 * prop).floor() as i64,
                        )
                    };
                    fill_rectangle(&mut keypoint, label, py, px, hrad, wrad);
                }
            }
        }

        trace_event!("heatmap_encoded", boxes = boxes.len());
        Ok(HeatmapTarget { keypoint, size })
    }
}

/// Max-combines `exp(-||pos - center||^2 / (2 sigma^2))` into a class plane.
///
/// Feature pixel `(y, x)` sits at input coordinates `(y*stride, x*stride)`.
fn splat_gaussian(keypoint: &mut Grid, label: usize, cy: f32, cx: f32, sigma: f32, stride: usize) {
    let width = keypoint.width();
    let height = keypoint.height();
    let denom = 2.0 * sigma * sigma;
    let plane = keypoint
        .plane_mut(label)
        .expect("label checked by caller");
    for y in 0..height {
        let dy = y as f32 * stride as f32 - cy;
        for x in 0..width {
            let dx = x as f32 * stride as f32 - cx;
            let value = (-(dy * dy + dx * dx) / denom).exp();
            let cell = &mut plane[y * width + x];
            if value > *cell {
                *cell = value;
            }
        }
    }
}

/// Writes a clipped rectangular footprint of 1.0 around `(py, px)`.
///
/// Combination is max, so overlapping footprints of any class are
/// order-independent.
fn fill_rectangle(keypoint: &mut Grid, label: usize, py: usize, px: usize, hrad: i64, wrad: i64) {
    let width = keypoint.width();
    let height = keypoint.height();
    let min_y = (py as i64 - hrad).max(0) as usize;
    let min_x = (px as i64 - wrad).max(0) as usize;
    let max_y = (py as i64 + hrad).min(height as i64 - 1) as usize;
    let max_x = (px as i64 + wrad).min(width as i64 - 1) as usize;
    let plane = keypoint
        .plane_mut(label)
        .expect("label checked by caller");
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            plane[y * width + x] = 1.0;
        }
    }
}
