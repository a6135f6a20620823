//! Per-pixel regression/label/center-ness targets across a feature pyramid.

use crate::geom::{BoundingBox, BoxSet};
use crate::grid::pyramid::{LevelMaps, PyramidSpec};
use crate::trace::{trace_event, trace_span};
use crate::util::{DenseDetError, DenseDetResult};

/// Encodes ground-truth boxes into dense per-level targets.
///
/// A box qualifies for a pixel when the pixel's input-image position falls
/// strictly inside it and the box's longer side does not exceed the level's
/// `max_box_side`; the coarsest level carries no upper threshold. Among
/// qualifying boxes the smallest-area one is assigned, so the most specific
/// object wins where boxes nest.
#[derive(Clone, Copy, Debug)]
pub struct PyramidEncoder {
    num_labels: usize,
}

impl PyramidEncoder {
    /// Creates an encoder for `num_labels` classes.
    pub fn new(num_labels: usize) -> DenseDetResult<Self> {
        if num_labels == 0 {
            return Err(DenseDetError::InvalidConfig {
                reason: "num_labels must be positive",
            });
        }
        Ok(Self { num_labels })
    }

    /// Returns the class count.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Encodes one image's boxes into per-level targets, coarsest first.
    ///
    /// Pixels no box qualifies for stay zero in all three maps.
    pub fn encode(&self, boxes: &BoxSet, spec: &PyramidSpec) -> DenseDetResult<Vec<LevelMaps>> {
        let _span = trace_span!(
            "encode_pyramid",
            boxes = boxes.len(),
            levels = spec.len()
        )
        .entered();

        for &label in boxes.labels() {
            if label >= self.num_labels {
                return Err(DenseDetError::LabelOutOfRange {
                    label,
                    num_labels: self.num_labels,
                });
            }
        }

        let mut targets = Vec::with_capacity(spec.len());
        for (level_idx, level) in spec.levels().iter().enumerate() {
            let max_side = if level_idx == 0 {
                f32::INFINITY
            } else {
                level.max_box_side
            };
            let mut maps = LevelMaps::zeros(self.num_labels, level.height, level.width)?;
            encode_level(boxes, level.stride, max_side, &mut maps)?;
            targets.push(maps);
        }

        trace_event!("pyramid_encoded", levels = targets.len());
        Ok(targets)
    }
}

fn encode_level(
    boxes: &BoxSet,
    stride: usize,
    max_side: f32,
    maps: &mut LevelMaps,
) -> DenseDetResult<()> {
    let height = maps.center.height();
    let width = maps.center.width();
    for y in 0..height {
        let pos_y = (y * stride) as f32;
        for x in 0..width {
            let pos_x = (x * stride) as f32;
            let Some((bbox, label)) = assign_box(boxes, pos_y, pos_x, max_side) else {
                continue;
            };

            let d = bbox.edge_distances(pos_y, pos_x);
            maps.reg.set(0, y, x, d.top)?;
            maps.reg.set(1, y, x, d.left)?;
            maps.reg.set(2, y, x, d.bottom)?;
            maps.reg.set(3, y, x, d.right)?;
            maps.label.set(label, y, x, 1.0)?;
            // Strictly-inside assignment keeps every distance positive, so
            // the ratios below never divide by zero.
            let centerness = ((d.left.min(d.right) / d.left.max(d.right))
                * (d.top.min(d.bottom) / d.top.max(d.bottom)))
            .sqrt();
            maps.center.set(0, y, x, centerness)?;
        }
    }
    Ok(())
}

/// Smallest-area box containing `(pos_y, pos_x)` strictly, among boxes whose
/// longer side is within `max_side`. Earlier boxes win exact-area ties.
fn assign_box(
    boxes: &BoxSet,
    pos_y: f32,
    pos_x: f32,
    max_side: f32,
) -> Option<(&BoundingBox, usize)> {
    let mut best: Option<(&BoundingBox, usize)> = None;
    for (bbox, label) in boxes.iter() {
        if bbox.max_side() > max_side || !bbox.contains_strict(pos_y, pos_x) {
            continue;
        }
        match best {
            Some((current, _)) if bbox.area() >= current.area() => {}
            _ => best = Some((bbox, label)),
        }
    }
    best
}
