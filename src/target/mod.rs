//! Ground-truth boxes to dense supervision tensors.
//!
//! Two encoders cover the two detection paradigms: `HeatmapEncoder` produces
//! single-stride keypoint/size targets (center-point style), and
//! `PyramidEncoder` produces per-level regression/label/center-ness targets
//! with size-based level assignment (per-pixel style).

pub(crate) mod heatmap;
pub(crate) mod pyramid;
pub(crate) mod radius;
