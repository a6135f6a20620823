//! Python bindings for the densedet detection core.
//!
//! Exposes target encoding, pyramid decoding and NMS to Python via PyO3,
//! with dense maps exchanged as numpy arrays.

use numpy::{
    IntoPyArray, PyArray3, PyArrayMethods, PyReadonlyArray2, PyReadonlyArray3,
    PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use densedet::{
    decode_pyramid, gaussian_radius as radius_rs, nms_indices, suppress, BoundingBox, BoxSet,
    DecoderConfig, DenseDetError, Detection as RustDetection, Grid, HeatmapEncoder,
    HeatmapEncoderConfig, HeatmapMode, LevelMaps, LevelSpec, PyramidEncoder, PyramidSpec,
};

/// Convert a DenseDetError to a Python exception.
fn to_py_err(err: DenseDetError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

/// One detection with its box, class index and score.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Origin-corner row coordinate.
    #[pyo3(get)]
    pub y0: f32,
    /// Origin-corner column coordinate.
    #[pyo3(get)]
    pub x0: f32,
    /// Opposite-corner row coordinate.
    #[pyo3(get)]
    pub y1: f32,
    /// Opposite-corner column coordinate.
    #[pyo3(get)]
    pub x1: f32,
    /// Predicted class index.
    #[pyo3(get)]
    pub label: usize,
    /// Class confidence times center-ness.
    #[pyo3(get)]
    pub score: f32,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        format!(
            "Detection(y0={:.2}, x0={:.2}, y1={:.2}, x1={:.2}, label={}, score={:.4})",
            self.y0, self.x0, self.y1, self.x1, self.label, self.score
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(det: RustDetection) -> Self {
        Self {
            y0: det.bbox.y0,
            x0: det.bbox.x0,
            y1: det.bbox.y1,
            x1: det.bbox.x1,
            label: det.label,
            score: det.score,
        }
    }
}

fn box_set_from_arrays(
    boxes: PyReadonlyArray2<'_, f32>,
    labels: Vec<usize>,
) -> PyResult<BoxSet> {
    let shape = boxes.shape();
    if shape[1] != 4 {
        return Err(PyValueError::new_err(
            "boxes must have shape (n, 4) in (y0, x0, y1, x1) order",
        ));
    }
    let data = boxes.as_slice()?;
    let parsed: Result<Vec<BoundingBox>, DenseDetError> = data
        .chunks_exact(4)
        .map(|row| BoundingBox::new(row[0], row[1], row[2], row[3]))
        .collect();
    BoxSet::new(parsed.map_err(to_py_err)?, labels).map_err(to_py_err)
}

fn grid_to_py<'py>(py: Python<'py>, grid: &Grid) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let (channels, height, width) = grid.shape();
    let flat = grid.as_slice().to_vec().into_pyarray(py);
    Ok(flat.reshape([channels, height, width])?)
}

fn grid_from_py(array: &PyReadonlyArray3<'_, f32>) -> PyResult<Grid> {
    let shape = array.shape();
    let data = array.as_slice()?.to_vec();
    Grid::from_vec(data, shape[0], shape[1], shape[2]).map_err(to_py_err)
}

fn spec_from_levels(levels: Vec<(usize, f32, usize, usize)>) -> PyResult<PyramidSpec> {
    let specs = levels
        .into_iter()
        .map(|(stride, max_box_side, height, width)| LevelSpec {
            stride,
            max_box_side,
            height,
            width,
        })
        .collect();
    PyramidSpec::new(specs).map_err(to_py_err)
}

/// Gaussian splat radius for a box of the given size.
///
/// Args:
///     height: Box height (input units, > 0)
///     width: Box width (input units, > 0)
///     min_overlap: Minimum-overlap guarantee in (0, 1) (default: 0.7)
#[pyfunction]
#[pyo3(signature = (height, width, min_overlap = 0.7))]
fn gaussian_radius(height: f32, width: f32, min_overlap: f32) -> PyResult<f32> {
    radius_rs(height, width, min_overlap).map_err(to_py_err)
}

/// Encode boxes into center-point keypoint/size targets at one stride.
///
/// Args:
///     boxes: (n, 4) float32 array in (y0, x0, y1, x1) order
///     labels: class index per box
///     height: Target map height
///     width: Target map width
///     num_labels: Number of class channels
///     mode: "gaussian" or "rectangle" (default: "gaussian")
///     radius: Rectangle half-extent; negative derives it from box size
///     min_overlap: Gaussian minimum-overlap guarantee (default: 0.7)
///     stride: Input-to-map downsampling factor (default: 4)
///
/// Returns:
///     (keypoint, size) float32 arrays of shape (num_labels, h, w) and (2, h, w)
#[pyfunction]
#[pyo3(signature = (
    boxes,
    labels,
    height,
    width,
    num_labels,
    mode = "gaussian",
    radius = -1,
    min_overlap = 0.7,
    stride = 4
))]
#[allow(clippy::too_many_arguments)]
fn encode_heatmap<'py>(
    py: Python<'py>,
    boxes: PyReadonlyArray2<'_, f32>,
    labels: Vec<usize>,
    height: usize,
    width: usize,
    num_labels: usize,
    mode: &str,
    radius: i32,
    min_overlap: f32,
    stride: usize,
) -> PyResult<(Bound<'py, PyArray3<f32>>, Bound<'py, PyArray3<f32>>)> {
    let mode = match mode.to_lowercase().as_str() {
        "gaussian" => HeatmapMode::Gaussian,
        "rectangle" => HeatmapMode::Rectangle,
        _ => {
            return Err(PyValueError::new_err(
                "mode must be 'gaussian' or 'rectangle'",
            ))
        }
    };
    let box_set = box_set_from_arrays(boxes, labels)?;
    let encoder = HeatmapEncoder::new(HeatmapEncoderConfig {
        mode,
        radius,
        min_overlap,
        stride,
        num_labels,
    })
    .map_err(to_py_err)?;
    let target = encoder.encode(&box_set, height, width).map_err(to_py_err)?;
    Ok((
        grid_to_py(py, &target.keypoint)?,
        grid_to_py(py, &target.size)?,
    ))
}

/// Encode boxes into per-level pyramid targets.
///
/// Args:
///     boxes: (n, 4) float32 array in (y0, x0, y1, x1) order
///     labels: class index per box
///     levels: (stride, max_box_side, height, width) per level, coarsest first
///     num_labels: Number of class channels
///
/// Returns:
///     List of (reg, label, center) float32 arrays, one tuple per level
#[pyfunction]
fn encode_pyramid<'py>(
    py: Python<'py>,
    boxes: PyReadonlyArray2<'_, f32>,
    labels: Vec<usize>,
    levels: Vec<(usize, f32, usize, usize)>,
    num_labels: usize,
) -> PyResult<
    Vec<(
        Bound<'py, PyArray3<f32>>,
        Bound<'py, PyArray3<f32>>,
        Bound<'py, PyArray3<f32>>,
    )>,
> {
    let box_set = box_set_from_arrays(boxes, labels)?;
    let spec = spec_from_levels(levels)?;
    let encoder = PyramidEncoder::new(num_labels).map_err(to_py_err)?;
    let targets = encoder.encode(&box_set, &spec).map_err(to_py_err)?;
    targets
        .iter()
        .map(|maps| {
            Ok((
                grid_to_py(py, &maps.reg)?,
                grid_to_py(py, &maps.label)?,
                grid_to_py(py, &maps.center)?,
            ))
        })
        .collect()
}

/// Decode per-level prediction maps and apply per-class NMS.
///
/// Args:
///     levels: (stride, max_box_side, height, width) per level, coarsest first
///     maps: (reg, label, center) float32 arrays per level; label and center
///         post-sigmoid, reg positive distances
///     score_threshold: Minimum best-class confidence (default: 0.05)
///     iou_threshold: NMS IoU threshold (default: 0.5)
///
/// Returns:
///     List of Detection, sorted by descending score
#[pyfunction]
#[pyo3(signature = (levels, maps, score_threshold = 0.05, iou_threshold = 0.5))]
fn decode_detections(
    levels: Vec<(usize, f32, usize, usize)>,
    maps: Vec<(
        PyReadonlyArray3<'_, f32>,
        PyReadonlyArray3<'_, f32>,
        PyReadonlyArray3<'_, f32>,
    )>,
    score_threshold: f32,
    iou_threshold: f32,
) -> PyResult<Vec<Detection>> {
    let spec = spec_from_levels(levels)?;
    let level_maps: PyResult<Vec<LevelMaps>> = maps
        .iter()
        .map(|(reg, label, center)| {
            Ok(LevelMaps {
                reg: grid_from_py(reg)?,
                label: grid_from_py(label)?,
                center: grid_from_py(center)?,
            })
        })
        .collect();
    let config = DecoderConfig { score_threshold };
    let candidates = decode_pyramid(&spec, &level_maps?, &config).map_err(to_py_err)?;
    let detections = suppress(&candidates, iou_threshold).map_err(to_py_err)?;
    Ok(detections.into_iter().map(Detection::from).collect())
}

/// Per-class greedy NMS over parallel box/label/score sequences.
///
/// Args:
///     boxes: (n, 4) float32 array in (y0, x0, y1, x1) order
///     labels: class index per box
///     scores: confidence per box
///     iou_threshold: Suppression IoU threshold (default: 0.5)
///
/// Returns:
///     Kept indices into the input order, sorted by descending score
#[pyfunction]
#[pyo3(signature = (boxes, labels, scores, iou_threshold = 0.5))]
fn nms(
    boxes: PyReadonlyArray2<'_, f32>,
    labels: Vec<usize>,
    scores: Vec<f32>,
    iou_threshold: f32,
) -> PyResult<Vec<usize>> {
    let shape = boxes.shape();
    if shape[1] != 4 {
        return Err(PyValueError::new_err(
            "boxes must have shape (n, 4) in (y0, x0, y1, x1) order",
        ));
    }
    let data = boxes.as_slice()?;
    let parsed: Result<Vec<BoundingBox>, DenseDetError> = data
        .chunks_exact(4)
        .map(|row| BoundingBox::new(row[0], row[1], row[2], row[3]))
        .collect();
    nms_indices(&parsed.map_err(to_py_err)?, &labels, &scores, iou_threshold).map_err(to_py_err)
}

/// Python module for the densedet detection core.
#[pymodule]
fn _densedet(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_function(wrap_pyfunction!(gaussian_radius, m)?)?;
    m.add_function(wrap_pyfunction!(encode_heatmap, m)?)?;
    m.add_function(wrap_pyfunction!(encode_pyramid, m)?)?;
    m.add_function(wrap_pyfunction!(decode_detections, m)?)?;
    m.add_function(wrap_pyfunction!(nms, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
