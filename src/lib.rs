//! DenseDet is the geometric target-assignment and post-processing core of a
//! dense object detector.
//!
//! The crate converts ground-truth boxes into dense supervision tensors
//! (center-point heatmaps and FCOS-style pyramid targets), converts dense
//! per-pixel predictions back into candidate boxes, prunes candidates with
//! per-class NMS, and computes the focal/IoU/center-ness loss stack. All
//! operations are pure transforms over caller-owned buffers; optional
//! parallelism over the batch dimension is available via the `rayon` feature.

mod candidate;
pub mod geom;
pub mod grid;
mod loss;
mod target;
pub(crate) mod trace;
pub mod util;

pub use geom::{BoundingBox, BoxSet, EdgeDistances};
pub use grid::pyramid::{LevelMaps, LevelSpec, PyramidSpec};
pub use grid::Grid;
pub use util::{DenseDetError, DenseDetResult};

pub use target::heatmap::{HeatmapEncoder, HeatmapEncoderConfig, HeatmapMode, HeatmapTarget};
pub use target::pyramid::PyramidEncoder;
pub use target::radius::gaussian_radius;

pub use candidate::decode::{decode_pyramid, DecoderConfig};
pub use candidate::nms::{nms_indices, suppress};
pub use candidate::Detection;

#[cfg(feature = "rayon")]
pub use loss::batch::batch_loss_par;
pub use loss::batch::{batch_loss, pyramid_loss, LossConfig, LossTerms};
pub use loss::center::centerness_loss;
pub use loss::focal::{focal_loss, FocalConfig};
pub use loss::iou::iou_loss;
