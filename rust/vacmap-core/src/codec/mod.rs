//! Raster and path codec for the device map formats.

mod color;
mod error;
mod map;
mod raster;
mod render;
mod slam;
mod wire;

pub use color::{argb, BoundingBox, BLUE, GREEN, MAP_HEIGHT, MAP_PIXELS, MAP_WIDTH, RED, SENTINEL};
pub use error::CodecError;
pub use map::VacuumMap;
pub use raster::{read_map_package, HEADER_LINES};
pub use render::{Image, RenderStyle};
pub use slam::{read_path_package, LogCursor, SlamState, SlamTrack, DEDUP_THRESHOLD, SLAM_SCALE_X, SLAM_SCALE_Y};
pub use wire::{
    pack_coordinate, unpack_coordinate, ColorGroup, CoordinateScheme, ErrorCode, MapError, MapPackage, PathPackage,
    PathPoint, UnknownVersion, CANVAS_CENTER_X, CANVAS_CENTER_Y,
};
