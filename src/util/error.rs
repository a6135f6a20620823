//! Error types for densedet.

use thiserror::Error;

/// Result alias for densedet operations.
pub type DenseDetResult<T> = std::result::Result<T, DenseDetError>;

/// Errors that can occur when encoding targets, decoding predictions, or
/// computing losses.
#[derive(Debug, Error, PartialEq)]
pub enum DenseDetError {
    /// Grid dimensions are zero or overflow the addressable size.
    #[error("invalid grid dimensions: {channels}x{height}x{width}")]
    InvalidDimensions {
        channels: usize,
        height: usize,
        width: usize,
    },
    /// A backing buffer does not match the declared grid shape.
    #[error("buffer size mismatch: needed {needed}, got {got}")]
    BufferSizeMismatch { needed: usize, got: usize },
    /// Two grids that must agree in shape do not.
    #[error("shape mismatch for {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
    /// Two parallel sequences have different lengths.
    #[error("length mismatch for {context}: {left} vs {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },
    /// A class label is outside `[0, num_labels)`.
    #[error("label {label} out of range for {num_labels} labels")]
    LabelOutOfRange { label: usize, num_labels: usize },
    /// Box corners are out of order or not finite.
    #[error("invalid box: ({y0}, {x0}, {y1}, {x1})")]
    InvalidBox { y0: f32, x0: f32, y1: f32, x1: f32 },
    /// A zero-area box reached a computation that requires positive extent.
    #[error("degenerate box: {height}x{width}")]
    DegenerateBox { height: f32, width: f32 },
    /// A configuration value is outside its valid range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// A pyramid shape contract with no levels.
    #[error("pyramid shape must contain at least one level")]
    EmptyPyramid,
    /// A box center maps outside the feature map.
    #[error("box center ({py}, {px}) outside {height}x{width} map")]
    CenterOutsideMap {
        py: i64,
        px: i64,
        height: usize,
        width: usize,
    },
    /// An index is outside the valid range for its container.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
}
