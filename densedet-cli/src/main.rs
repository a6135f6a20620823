use clap::Parser;
use densedet::{
    decode_pyramid, suppress, DecoderConfig, Detection, Grid, LevelMaps, LevelSpec, PyramidSpec,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "DenseDet post-processing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    predictions_path: String,
    output_path: Option<String>,
    score_threshold: f32,
    iou_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            predictions_path: String::new(),
            output_path: None,
            score_threshold: DecoderConfig::default().score_threshold,
            iou_threshold: 0.5,
        }
    }
}

/// One serialized pyramid level: shape spec plus flat `[c, y, x]` buffers.
#[derive(Debug, Deserialize)]
struct LevelRecord {
    stride: usize,
    max_box_side: f32,
    height: usize,
    width: usize,
    reg: Vec<f32>,
    label: Vec<f32>,
    center: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct Predictions {
    levels: Vec<LevelRecord>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    y0: f32,
    x0: f32,
    y1: f32,
    x1: f32,
    label: usize,
    score: f32,
}

impl From<Detection> for DetectionRecord {
    fn from(det: Detection) -> Self {
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

#[derive(Debug, Serialize)]
struct Output {
    detections: Vec<DetectionRecord>,
}

fn load_predictions(
    predictions: Predictions,
) -> Result<(PyramidSpec, Vec<LevelMaps>), Box<dyn std::error::Error>> {
    let mut specs = Vec::with_capacity(predictions.levels.len());
    let mut maps = Vec::with_capacity(predictions.levels.len());
    for level in predictions.levels {
        let LevelRecord {
            stride,
            max_box_side,
            height,
            width,
            reg,
            label,
            center,
        } = level;
        let pixels = height * width;
        if pixels == 0 || label.len() % pixels != 0 {
            return Err("label buffer length must be a multiple of height*width".into());
        }
        let num_labels = label.len() / pixels;
        specs.push(LevelSpec {
            stride,
            max_box_side,
            height,
            width,
        });
        maps.push(LevelMaps {
            reg: Grid::from_vec(reg, 4, height, width)?,
            label: Grid::from_vec(label, num_labels, height, width)?,
            center: Grid::from_vec(center, 1, height, width)?,
        });
    }
    Ok((PyramidSpec::new(specs)?, maps))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("densedet=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.predictions_path.is_empty() {
        return Err("predictions_path must be set in the config".into());
    }

    let predictions_text = fs::read_to_string(&config.predictions_path)?;
    let predictions: Predictions = serde_json::from_str(&predictions_text)?;
    let (spec, levels) = load_predictions(predictions)?;

    let decoder_config = DecoderConfig {
        score_threshold: config.score_threshold,
    };
    let candidates = decode_pyramid(&spec, &levels, &decoder_config)?;
    let detections = suppress(&candidates, config.iou_threshold)?;

    let output = Output {
        detections: detections.into_iter().map(DetectionRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
