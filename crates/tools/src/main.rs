use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use foundation::TileId;
use layers::labels::EstimatedMetrics;
use layers::points::{PointHover, PointMark};
use layers::{LabelledPointsLayer, Layer, PointsConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load point tiles into a labelled point layer and print one redraw as JSON.
#[derive(Debug, Parser)]
#[command(name = "points")]
struct Args {
    /// JSON file with `tiles` to load and tile ids to `unload`.
    #[arg(long)]
    tiles: PathBuf,

    /// JSON layer options.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    #[arg(long = "pan-x", default_value_t = 0.0, allow_negative_numbers = true)]
    pan_x: f64,

    #[arg(long = "pan-y", default_value_t = 0.0, allow_negative_numbers = true)]
    pan_y: f64,

    /// Screen position `x,y` to hover after the redraw.
    #[arg(long, value_parser = parse_point, allow_negative_numbers = true)]
    hover: Option<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct TilesFile {
    #[serde(default)]
    tiles: Vec<TileInput>,
    #[serde(default)]
    unload: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TileInput {
    id: String,
    records: Value,
}

#[derive(Debug, Serialize)]
struct Output {
    cycle: u64,
    marks: Vec<PointMark>,
    hover: Option<PointHover>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => PointsConfig::from_json(&read_text(path)?).map_err(|e| e.to_string())?,
        None => PointsConfig::default(),
    };
    let input: TilesFile = serde_json::from_str(&read_text(&args.tiles)?)
        .map_err(|e| format!("{}: {e}", args.tiles.display()))?;

    let mut layer = LabelledPointsLayer::new(1, config);
    for tile in &input.tiles {
        let report = layer.load_tile(TileId::new(tile.id.as_str()), &tile.records);
        info!(tile = %tile.id, points = report.ids.len(), "loaded tile");
    }
    for id in &input.unload {
        let removed = layer.unload_tile(&TileId::new(id.as_str()));
        info!(tile = %id, removed = removed.len(), "unloaded tile");
    }

    let (k, dx, dy) = (args.zoom, args.pan_x, args.pan_y);
    let project = move |x: f64, y: f64| Some([k * x + dx, k * y + dy]);
    let redraw = layer.redraw(&project, &EstimatedMetrics);
    let hover = args.hover.and_then(|[x, y]| layer.hover(x, y));

    let out = Output {
        cycle: redraw.cycle,
        marks: redraw.marks,
        hover,
    };
    let json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").map_err(|e| e.to_string())
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad x coordinate: {x:?}"))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad y coordinate: {y:?}"))?;
    Ok([x, y])
}
