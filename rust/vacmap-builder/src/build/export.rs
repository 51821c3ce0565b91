use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use vacmap_core::codec::{read_map_package, read_path_package, BoundingBox, Image, MapPackage, PathPackage, RenderStyle, VacuumMap};
use vacmap_core::snapshot::load_snapshot;

use super::input::open_input;

pub fn map_package(map: &Path) -> Result<MapPackage> {
    let pkg = read_map_package(open_input(map)?).with_context(|| format!("failed to decode {:?}", map))?;
    info!(groups = pkg.color_groups.len(), pixels = pkg.pixel_count(), "map package built");
    Ok(pkg)
}

pub fn path_package(slam: &Path, from: usize) -> Result<PathPackage> {
    let pkg = read_path_package(open_input(slam)?, from).with_context(|| format!("failed to parse {:?}", slam))?;
    info!(points = pkg.points.len(), code = ?pkg.error.code, "path package built");
    Ok(pkg)
}

pub fn load_model(map: &Path, slam: &Path, oversample: u32) -> Result<VacuumMap> {
    VacuumMap::parse(open_input(map)?, open_input(slam)?, oversample)
        .with_context(|| format!("failed to load {:?} with {:?}", map, slam))
}

/// Snapshot file, with the oversample factor optionally replaced.
pub fn load_snapshot_model(snapshot: &Path, oversample: Option<u32>) -> Result<VacuumMap> {
    let mut model = load_snapshot(snapshot).with_context(|| format!("failed to read snapshot {:?}", snapshot))?;
    if let Some(o) = oversample { model.set_oversample(o); }
    Ok(model)
}

/// Pretty JSON to `out`, or stdout when absent.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut w, value)?;
            w.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

pub fn render(model: &VacuumMap, in_bounds: bool) -> Image {
    let style = RenderStyle::default();
    if in_bounds { model.render_with_path_in_bounds(style) } else { model.render_with_path(style) }
}

pub fn write_ppm(image: &Image, out: &Path) -> Result<()> {
    let file = File::create(out).with_context(|| format!("failed to create {:?}", out))?;
    image.write_ppm(BufWriter::new(file))?;
    info!(width = image.width, height = image.height, out = %out.display(), "render written");
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub bounding_box: BoundingBox,
    pub oversample: u32,
    pub path_points: usize,
    pub known_pixels: usize,
    pub consumed_lines: u64,
    pub locked: bool,
}

pub fn summarize(model: &VacuumMap) -> ModelSummary {
    let slam = model.slam_state();
    ModelSummary {
        bounding_box: model.raw_bounding_box(),
        oversample: model.oversample(),
        path_points: model.path_len(),
        known_pixels: model.to_package().pixel_count(),
        consumed_lines: slam.consumed_lines,
        locked: slam.locked,
    }
}
