//! Device map image decoding.
//!
//! The image is two header lines (content ignored) followed by raw RGB
//! triplets assigned row-major over the 1024x1024 canvas. A stream longer
//! than the canvas wraps back to row 0 and overwrites. A trailing partial
//! triplet ends the stream.

use std::io::{BufRead, ErrorKind};

use tracing::{debug, info};

use super::color::{argb, canvas_index, BoundingBox, BoundsTracker, MAP_HEIGHT, MAP_PIXELS, MAP_WIDTH, SENTINEL};
use super::error::CodecError;
use super::wire::{group_raster, pack_coordinate, unpack_coordinate, ColorGroups, CoordinateScheme, MapError, MapPackage};

pub const HEADER_LINES: usize = 2;

/// Receives every decoded pixel in stream order.
pub(crate) trait PixelSink {
    fn put(&mut self, col: usize, row: usize, color: u32);

    /// Called once the write position first wraps back to row 0.
    fn wrapped(&mut self) {}
}

impl PixelSink for Vec<u32> {
    #[inline]
    fn put(&mut self, col: usize, row: usize, color: u32) { self[canvas_index(col, row)] = color; }
}

fn skip_header<R: BufRead>(reader: &mut R) -> Result<(), CodecError> {
    let mut line = Vec::new();
    for n in 1..=HEADER_LINES {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Err(CodecError::MissingHeader(n));
        }
    }
    Ok(())
}

/// Streams the image into `sink` and returns the bounding box of non-sentinel cells.
pub(crate) fn scan_image<R: BufRead, S: PixelSink>(mut reader: R, sink: &mut S) -> Result<BoundingBox, CodecError> {
    skip_header(&mut reader)?;
    let mut bounds = BoundsTracker::default();
    let (mut col, mut row) = (0usize, 0usize);
    let mut triplet = [0u8; 3];
    let mut filled = 0usize;
    let mut pixels = 0u64;
    let mut wrapped = false;
    loop {
        let buf = match reader.fill_buf() {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if buf.is_empty() { break; }
        let len = buf.len();
        for &byte in buf {
            triplet[filled] = byte;
            filled += 1;
            if filled < 3 { continue; }
            filled = 0;
            let color = argb(0xff, triplet[0], triplet[1], triplet[2]);
            sink.put(col, row, color);
            if color != SENTINEL { bounds.observe(col, row); }
            pixels += 1;
            col += 1;
            if col >= MAP_WIDTH {
                col = 0;
                row += 1;
            }
            if row >= MAP_HEIGHT {
                row = 0;
                if !wrapped {
                    debug!(pixels, "image longer than canvas, wrapping to row 0");
                    wrapped = true;
                    sink.wrapped();
                }
            }
        }
        reader.consume(len);
    }
    let bbox = bounds.finish();
    info!(pixels, left = bbox.left, top = bbox.top, width = bbox.width, height = bbox.height, "end of map image");
    Ok(bbox)
}

/// Collects color groups without holding a canvas. Falls back to a full
/// canvas once the stream wraps, since later pixels may then overwrite
/// cells that are already grouped.
#[derive(Default)]
struct SparseSink {
    groups: ColorGroups,
    canvas: Option<Vec<u32>>,
}

impl PixelSink for SparseSink {
    #[inline]
    fn put(&mut self, col: usize, row: usize, color: u32) {
        match self.canvas.as_mut() {
            Some(canvas) => canvas[canvas_index(col, row)] = color,
            None if color != SENTINEL => self.groups.push(color, pack_coordinate(row as u32, col as u32)),
            None => {}
        }
    }

    fn wrapped(&mut self) {
        if self.canvas.is_some() { return; }
        let mut canvas = vec![SENTINEL; MAP_PIXELS];
        self.groups.for_each_cell(|color, packed| {
            let (row, col) = unpack_coordinate(packed);
            canvas[canvas_index(col as usize, row as usize)] = color;
        });
        self.groups = ColorGroups::default();
        self.canvas = Some(canvas);
    }
}

impl SparseSink {
    fn finish(mut self, bbox: BoundingBox) -> MapPackage {
        let color_groups = match self.canvas.take() {
            Some(canvas) => group_raster(&canvas, bbox),
            None => {
                self.groups.rebase(bbox);
                self.groups.into_groups()
            }
        };
        MapPackage { version: CoordinateScheme::BoxRelative, bounding_box: bbox, color_groups, error: MapError::none() }
    }
}

/// Decodes a device image straight into a box-relative sparse package.
pub fn read_map_package<R: BufRead>(reader: R) -> Result<MapPackage, CodecError> {
    let mut sink = SparseSink::default();
    let bbox = scan_image(reader, &mut sink)?;
    Ok(sink.finish(bbox))
}
