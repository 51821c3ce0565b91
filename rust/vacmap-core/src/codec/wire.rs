//! Sparse wire representation of maps and paths.
//!
//! A map travels as its bounding box plus one group per distinct color, each
//! group listing packed `(row << 16 | col)` coordinates. Sentinel cells are
//! never listed; a decoder treats every unlisted cell as unknown.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::color::{canvas_index, BoundingBox, MAP_HEIGHT, MAP_WIDTH, SENTINEL};

/// Offset between raw odometry coordinates and canvas coordinates.
pub const CANVAS_CENTER_X: f32 = MAP_WIDTH as f32 / 2.0;
pub const CANVAS_CENTER_Y: f32 = MAP_HEIGHT as f32 / 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[default]
    None,
    NotAuthenticated,
    MapNotAvailable,
    MapNotFound,
    SlamOutOfRange,
    CommunicationError,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapError {
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl MapError {
    pub fn none() -> Self { Self::default() }

    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }

    pub fn is_none(&self) -> bool { self.code == ErrorCode::None }
}

/// Version tag selecting how coordinates are offset on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum CoordinateScheme {
    /// Version 0: relative to the canvas origin.
    Absolute,
    /// Version 1: relative to the bounding-box origin.
    BoxRelative,
}

impl From<CoordinateScheme> for u32 {
    fn from(s: CoordinateScheme) -> u32 {
        match s {
            CoordinateScheme::Absolute => 0,
            CoordinateScheme::BoxRelative => 1,
        }
    }
}

impl TryFrom<u32> for CoordinateScheme {
    type Error = UnknownVersion;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(CoordinateScheme::Absolute),
            1 => Ok(CoordinateScheme::BoxRelative),
            other => Err(UnknownVersion(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVersion(pub u32);

impl fmt::Display for UnknownVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown map package version {}", self.0)
    }
}

#[inline]
pub fn pack_coordinate(row: u32, col: u32) -> u32 { (row << 16) | (col & 0xFFFF) }

/// Returns `(row, col)`.
#[inline]
pub fn unpack_coordinate(packed: u32) -> (u32, u32) { ((packed >> 16) & 0xFFFF, packed & 0xFFFF) }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorGroup {
    /// Packed ARGB as a signed 32-bit value.
    pub color: i32,
    pub coordinates: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPackage {
    pub version: CoordinateScheme,
    pub bounding_box: BoundingBox,
    pub color_groups: Vec<ColorGroup>,
    #[serde(default)]
    pub error: MapError,
}

impl MapPackage {
    /// An empty package carrying only an error code.
    pub fn error(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            version: CoordinateScheme::BoxRelative,
            bounding_box: BoundingBox::FULL,
            color_groups: Vec::new(),
            error: MapError::new(code, detail),
        }
    }

    /// Number of listed (non-sentinel) cells.
    pub fn pixel_count(&self) -> usize {
        self.color_groups.iter().map(|g| g.coordinates.len()).sum()
    }

    /// Resolves a packed coordinate to absolute `(col, row)` under this package's scheme.
    pub fn absolute_position(&self, packed: u32) -> (u32, u32) {
        let (row, col) = unpack_coordinate(packed);
        match self.version {
            CoordinateScheme::Absolute => (col, row),
            CoordinateScheme::BoxRelative => (col + self.bounding_box.left, row + self.bounding_box.top),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
}

impl PathPoint {
    pub fn new(x: f32, y: f32) -> Self { Self { x, y } }

    /// Raw odometry units to canvas-centered units.
    pub fn to_canvas(self) -> Self { Self { x: self.x + CANVAS_CENTER_X, y: self.y + CANVAS_CENTER_Y } }

    pub fn from_canvas(self) -> Self { Self { x: self.x - CANVAS_CENTER_X, y: self.y - CANVAS_CENTER_Y } }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathPackage {
    /// Canvas-centered points.
    pub points: Vec<PathPoint>,
    #[serde(default)]
    pub error: MapError,
}

impl PathPackage {
    pub fn error(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self { points: Vec::new(), error: MapError::new(code, detail) }
    }

    pub fn out_of_range(start: usize, available: usize) -> Self {
        Self::error(ErrorCode::SlamOutOfRange, format!("start {start} beyond {available} points"))
    }
}

/// Groups coordinates by exact color, keeping colors in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct ColorGroups {
    index: FxHashMap<u32, usize>,
    groups: Vec<ColorGroup>,
}

impl ColorGroups {
    #[inline]
    pub(crate) fn push(&mut self, color: u32, packed: u32) {
        let idx = match self.index.get(&color) {
            Some(&i) => i,
            None => {
                let i = self.groups.len();
                self.index.insert(color, i);
                self.groups.push(ColorGroup { color: color as i32, coordinates: Vec::new() });
                i
            }
        };
        self.groups[idx].coordinates.push(packed);
    }

    /// Rewrites absolute coordinates as offsets from the box origin.
    pub(crate) fn rebase(&mut self, bbox: BoundingBox) {
        for g in &mut self.groups {
            for c in &mut g.coordinates {
                let (row, col) = unpack_coordinate(*c);
                *c = pack_coordinate(row - bbox.top, col - bbox.left);
            }
        }
    }

    pub(crate) fn for_each_cell(&self, mut f: impl FnMut(u32, u32)) {
        for g in &self.groups {
            for &c in &g.coordinates { f(g.color as u32, c); }
        }
    }

    pub(crate) fn into_groups(self) -> Vec<ColorGroup> { self.groups }
}

/// Groups the non-sentinel cells of `pixels` inside `bbox`, box-relative.
pub(crate) fn group_raster(pixels: &[u32], bbox: BoundingBox) -> Vec<ColorGroup> {
    let mut groups = ColorGroups::default();
    for row in bbox.top..bbox.bottom() {
        for col in bbox.left..bbox.right() {
            let color = pixels[canvas_index(col as usize, row as usize)];
            if color == SENTINEL { continue; }
            groups.push(color, pack_coordinate(row - bbox.top, col - bbox.left));
        }
    }
    groups.into_groups()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_packing() {
        assert_eq!(pack_coordinate(1, 2), 0x0001_0002);
        assert_eq!(unpack_coordinate(0x03FF_0010), (1023, 16));
    }

    #[test]
    fn version_tag_serializes_as_integer() {
        let pkg = MapPackage::error(ErrorCode::MapNotFound, "");
        let v = serde_json::to_value(&pkg).unwrap();
        assert_eq!(v["version"], serde_json::json!(1));
        assert_eq!(v["boundingBox"], serde_json::json!({"x": 0, "y": 0, "w": 1024, "h": 1024}));
        assert_eq!(v["error"]["code"], serde_json::json!("MAP_NOT_FOUND"));
        assert!(v["error"].get("detail").is_none());

        let bad = r#"{"version":7,"boundingBox":{"x":0,"y":0,"w":1,"h":1},"colorGroups":[]}"#;
        assert!(serde_json::from_str::<MapPackage>(bad).is_err());
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let mut g = ColorGroups::default();
        g.push(7, 1);
        g.push(3, 2);
        g.push(7, 3);
        let out = g.into_groups();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], ColorGroup { color: 7, coordinates: vec![1, 3] });
        assert_eq!(out[1], ColorGroup { color: 3, coordinates: vec![2] });
    }

    #[test]
    fn absolute_position_honours_scheme() {
        let mut pkg = MapPackage::error(ErrorCode::None, "");
        pkg.bounding_box = BoundingBox::new(10, 20, 5, 5);
        pkg.version = CoordinateScheme::BoxRelative;
        assert_eq!(pkg.absolute_position(pack_coordinate(1, 2)), (12, 21));
        pkg.version = CoordinateScheme::Absolute;
        assert_eq!(pkg.absolute_position(pack_coordinate(1, 2)), (2, 1));
    }
}
