use std::fmt;
use std::io::BufRead;

use tracing::{info, warn};

use super::color::{canvas_index, BoundingBox, MAP_HEIGHT, MAP_PIXELS, MAP_WIDTH, SENTINEL};
use super::error::CodecError;
use super::raster::scan_image;
use super::slam::{SlamState, SlamTrack};
use super::wire::{group_raster, CoordinateScheme, MapError, MapPackage, PathPackage, PathPoint};

/// A decoded floor map: canonical 1024x1024 raster, bounding box and
/// odometry path. Oversampling only affects the presentation accessors.
#[derive(Clone)]
pub struct VacuumMap {
    pixels: Vec<u32>,
    bounding_box: BoundingBox,
    oversample: u32,
    track: SlamTrack,
}

impl VacuumMap {
    /// Sentinel-filled canvas, full bounding box, empty path.
    pub fn empty(oversample: u32) -> Self {
        Self {
            pixels: vec![SENTINEL; MAP_PIXELS],
            bounding_box: BoundingBox::FULL,
            oversample: oversample.max(1),
            track: SlamTrack::new(),
        }
    }

    pub(crate) fn from_parts(pixels: Vec<u32>, bounding_box: BoundingBox, oversample: u32, track: SlamTrack) -> Self {
        Self { pixels, bounding_box, oversample: oversample.max(1), track }
    }

    /// Parses a device image and its odometry log.
    pub fn parse<I: BufRead, S: BufRead>(image: I, slam: S, oversample: u32) -> Result<Self, CodecError> {
        let mut map = Self::empty(oversample);
        info!("reading image");
        map.bounding_box = scan_image(image, &mut map.pixels)?;
        info!("reading slam");
        map.track.read_from(slam)?;
        Ok(map)
    }

    /// Rebuilds a model from a sparse package and a path package.
    pub fn from_packages(map: &MapPackage, path: &PathPackage, oversample: u32) -> Result<Self, CodecError> {
        let mut out = Self::from_package(map, oversample)?;
        out.append_path_package(path);
        Ok(out)
    }

    pub fn from_package(package: &MapPackage, oversample: u32) -> Result<Self, CodecError> {
        let bbox = package.bounding_box;
        if !bbox.fits_canvas() {
            return Err(CodecError::InvalidPackage(format!("bounding box {bbox:?} outside canvas")));
        }
        let mut out = Self::empty(oversample);
        out.bounding_box = bbox;
        let mut dropped = 0usize;
        for group in &package.color_groups {
            for &packed in &group.coordinates {
                let (col, row) = package.absolute_position(packed);
                if (col as usize) < MAP_WIDTH && (row as usize) < MAP_HEIGHT {
                    out.pixels[canvas_index(col as usize, row as usize)] = group.color as u32;
                } else {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 { warn!(dropped, "package coordinates outside canvas"); }
        Ok(out)
    }

    /// Sparse, box-relative encoding of the raster.
    pub fn to_package(&self) -> MapPackage {
        MapPackage {
            version: CoordinateScheme::BoxRelative,
            bounding_box: self.bounding_box,
            color_groups: group_raster(&self.pixels, self.bounding_box),
            error: MapError::none(),
        }
    }

    /// Kept points from `start` on, canvas-centered.
    pub fn path_package(&self, start: usize) -> PathPackage { self.track.package_from(start) }

    /// Parses log lines beyond those already consumed; returns lines read.
    pub fn append_slam<R: BufRead>(&mut self, slam: R) -> Result<u64, CodecError> { self.track.append_from(slam) }

    /// Appends already-deduplicated canvas-centered points as they are.
    pub fn append_path_package(&mut self, package: &PathPackage) {
        self.track.extend_raw(package.points.iter().map(|p| p.from_canvas()));
    }

    pub fn raw_pixels(&self) -> &[u32] { &self.pixels }

    pub fn pixel(&self, col: usize, row: usize) -> Option<u32> {
        if col < MAP_WIDTH && row < MAP_HEIGHT { Some(self.pixels[canvas_index(col, row)]) } else { None }
    }

    pub fn raw_path(&self) -> &[PathPoint] { self.track.points() }
    pub fn path_len(&self) -> usize { self.track.len() }
    pub fn slam_state(&self) -> SlamState { self.track.state() }

    pub fn raw_bounding_box(&self) -> BoundingBox { self.bounding_box }
    pub fn bounding_box(&self) -> BoundingBox { self.bounding_box.scaled(self.oversample) }

    pub fn oversample(&self) -> u32 { self.oversample }
    pub fn set_oversample(&mut self, oversample: u32) { self.oversample = oversample.max(1); }

    /// Display width in pixels.
    pub fn width(&self) -> usize { MAP_WIDTH * self.oversample as usize }
    pub fn height(&self) -> usize { MAP_HEIGHT * self.oversample as usize }

    /// Raster scaled up by the oversample factor (nearest neighbour).
    pub fn scaled_pixels(&self) -> Vec<u32> {
        let o = self.oversample as usize;
        if o == 1 { return self.pixels.clone(); }
        let width = self.width();
        let mut out = vec![0u32; width * self.height()];
        for row in 0..MAP_HEIGHT {
            let src = &self.pixels[row * MAP_WIDTH..(row + 1) * MAP_WIDTH];
            let first = row * o * width;
            for (col, &color) in src.iter().enumerate() {
                out[first + col * o..first + (col + 1) * o].fill(color);
            }
            for b in 1..o {
                out.copy_within(first..first + width, first + b * width);
            }
        }
        out
    }

    /// Path in display space: canvas-centered, then scaled.
    pub fn display_path(&self) -> Vec<PathPoint> {
        let o = self.oversample as f32;
        self.track
            .points()
            .iter()
            .map(|p| {
                let c = p.to_canvas();
                PathPoint::new(c.x * o, c.y * o)
            })
            .collect()
    }

    /// Display coordinates back to canvas coordinates.
    pub fn map_point_scale(&self, point: [i32; 2]) -> [i32; 2] {
        let o = self.oversample as i32;
        [point[0] / o, point[1] / o]
    }

    /// Display rectangle `(x, y, w, h)` to canvas corners `(x0, y0, x1, y1)`.
    pub fn map_rectangle_scale(&self, rect: [i32; 4]) -> [i32; 4] {
        let o = self.oversample as i32;
        let (x0, y0) = (rect[0] / o, rect[1] / o);
        [x0, y0, x0 + rect[2] / o, y0 + rect[3] / o]
    }
}

/// Raster, oversample and bounding box must match; paths only by length.
impl PartialEq for VacuumMap {
    fn eq(&self, other: &Self) -> bool {
        self.oversample == other.oversample
            && self.bounding_box == other.bounding_box
            && self.track.len() == other.track.len()
            && self.pixels == other.pixels
    }
}

impl fmt::Debug for VacuumMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VacuumMap")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("path_entries", &self.track.len())
            .field("bounding_box", &self.bounding_box())
            .field("oversample", &self.oversample)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::color::{argb, RED};

    const SENTINEL_RGB: [u8; 3] = [125, 125, 125];

    fn nine_pixels_red_at_index5() -> Vec<u8> {
        let mut data = b"P6\n3 3\n".to_vec();
        for i in 0..9 {
            if i == 5 {
                data.extend_from_slice(&[255, 0, 0]);
            } else {
                data.extend_from_slice(&SENTINEL_RGB);
            }
        }
        data
    }

    fn image_with(cells: &[(usize, usize, [u8; 3])]) -> Vec<u8> {
        let last = cells.iter().map(|&(c, r, _)| canvas_index(c, r)).max().unwrap_or(0);
        let mut rgb = vec![SENTINEL_RGB; last + 1];
        for &(c, r, px) in cells { rgb[canvas_index(c, r)] = px; }
        let mut data = b"h\nh\n".to_vec();
        for px in rgb { data.extend_from_slice(&px); }
        data
    }

    #[test]
    fn stream_is_laid_out_on_the_full_canvas() {
        // nine pixels fill the first nine cells of row 0; index 5 -> column 5
        let map = VacuumMap::parse(&nine_pixels_red_at_index5()[..], &b""[..], 1).unwrap();
        assert_eq!(map.raw_bounding_box(), BoundingBox::new(5, 0, 1, 1));
        assert_eq!(map.pixel(5, 0), Some(RED));
        assert_eq!(map.pixel(6, 0), Some(SENTINEL));
        assert_eq!(map.pixel(1023, 1023), Some(SENTINEL));
    }

    #[test]
    fn single_red_pixel_box_and_package() {
        let data = image_with(&[(2, 1, [255, 0, 0])]);
        let map = VacuumMap::parse(&data[..], &b""[..], 1).unwrap();
        assert_eq!(map.raw_bounding_box(), BoundingBox::new(2, 1, 1, 1));
        let pkg = map.to_package();
        assert_eq!(pkg.color_groups.len(), 1);
        assert_eq!(pkg.color_groups[0].color, RED as i32);
        assert_eq!(pkg.color_groups[0].coordinates, vec![0]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let data = image_with(&[(10, 4, [1, 2, 3]), (12, 9, [255, 0, 0]), (11, 6, [1, 2, 3])]);
        let slam = "unlock\nestimate 0 1.0 1.0 x\nestimate 0 3.0 1.0 x\n";
        let map = VacuumMap::parse(&data[..], slam.as_bytes(), 2).unwrap();
        assert_eq!(map.raw_bounding_box(), BoundingBox::new(10, 4, 3, 6));

        let back = VacuumMap::from_packages(&map.to_package(), &map.path_package(0), 2).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.pixel(11, 6), Some(argb(0xff, 1, 2, 3)));
        for (a, b) in back.raw_path().iter().zip(map.raw_path()) {
            assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3);
        }
    }

    #[test]
    fn decode_absolute_scheme() {
        let mut pkg = MapPackage {
            version: CoordinateScheme::Absolute,
            bounding_box: BoundingBox::new(100, 200, 2, 1),
            color_groups: vec![crate::codec::wire::ColorGroup {
                color: RED as i32,
                coordinates: vec![crate::codec::wire::pack_coordinate(200, 101)],
            }],
            error: MapError::none(),
        };
        let map = VacuumMap::from_package(&pkg, 1).unwrap();
        assert_eq!(map.pixel(101, 200), Some(RED));
        assert_eq!(map.pixel(100, 200), Some(SENTINEL));

        pkg.bounding_box = BoundingBox::new(1020, 0, 10, 1);
        assert!(matches!(VacuumMap::from_package(&pkg, 1), Err(CodecError::InvalidPackage(_))));
    }

    #[test]
    fn direct_and_model_packages_agree() {
        let data = image_with(&[(3, 3, [9, 9, 9]), (700, 40, [255, 0, 0]), (5, 41, [9, 9, 9])]);
        let direct = crate::codec::raster::read_map_package(&data[..]).unwrap();
        let model = VacuumMap::parse(&data[..], &b""[..], 1).unwrap().to_package();
        assert_eq!(direct, model);
    }

    #[test]
    fn oversample_scales_presentation_only() {
        let data = image_with(&[(2, 1, [255, 0, 0])]);
        let slam = "unlock\nestimate 0 0.0 0.0 x\n";
        let mut map = VacuumMap::parse(&data[..], slam.as_bytes(), 0).unwrap();
        assert_eq!(map.oversample(), 1);
        map.set_oversample(4);
        assert_eq!(map.width(), 4096);
        assert_eq!(map.bounding_box(), BoundingBox::new(8, 4, 4, 4));
        assert_eq!(map.raw_bounding_box(), BoundingBox::new(2, 1, 1, 1));
        assert_eq!(map.display_path()[0], PathPoint::new(2048.0, 2048.0));
        let scaled = map.scaled_pixels();
        assert_eq!(scaled.len(), 4096 * 4096);
        assert_eq!(scaled[8 + 4 * 4096], RED);
        assert_eq!(scaled[11 + 7 * 4096], RED);
        assert_eq!(scaled[12 + 7 * 4096], SENTINEL);
        assert_eq!(map.map_point_scale([200, 400]), [50, 100]);
        assert_eq!(map.map_rectangle_scale([200, 400, 20, 40]), [50, 100, 55, 110]);
        map.set_oversample(0);
        assert_eq!(map.oversample(), 1);
    }

    #[test]
    fn equality_counts_path_length_only() {
        let data = image_with(&[(2, 1, [255, 0, 0])]);
        let a = VacuumMap::parse(&data[..], "unlock\nestimate 0 1.0 1.0 x\n".as_bytes(), 1).unwrap();
        let b = VacuumMap::parse(&data[..], "unlock\nestimate 0 5.0 5.0 x\n".as_bytes(), 1).unwrap();
        assert_eq!(a, b);
        let c = VacuumMap::parse(&data[..], &b""[..], 1).unwrap();
        assert_ne!(a, c);
        let mut d = a.clone();
        d.set_oversample(2);
        assert_ne!(a, d);
    }

    #[test]
    fn append_never_rewrites_kept_points() {
        let data = image_with(&[(2, 1, [255, 0, 0])]);
        let log = "unlock\nestimate 0 1.0 1.0 x\n";
        let mut map = VacuumMap::parse(&data[..], log.as_bytes(), 1).unwrap();
        let before = map.raw_path().to_vec();
        let longer = format!("{log}estimate 0 4.0 4.0 x\n");
        map.append_slam(longer.as_bytes()).unwrap();
        assert_eq!(map.path_len(), 2);
        assert_eq!(&map.raw_path()[..1], &before[..]);

        let extra = PathPackage { points: vec![PathPoint::new(600.0, 600.0)], error: MapError::none() };
        map.append_path_package(&extra);
        assert_eq!(map.path_len(), 3);
        assert_eq!(map.raw_path()[2], PathPoint::new(88.0, 88.0));
    }
}
