//! Composite rendering: raster plus start marker and path overlay, in
//! display space. Never touches the model itself.

use std::io::{self, Write};

use super::color::{BoundingBox, BLUE, GREEN};
use super::map::VacuumMap;

const START_MARKER: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    pub start_color: u32,
    pub path_color: u32,
}

impl Default for RenderStyle {
    fn default() -> Self { Self { start_color: GREEN, path_color: BLUE } }
}

/// Row-major ARGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Image {
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height { Some(self.pixels[x + y * self.width]) } else { None }
    }

    #[inline]
    fn put(&mut self, x: i64, y: i64, color: u32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 { return; }
        self.pixels[x as usize + y as usize * self.width] = color;
    }

    fn fill_rect(&mut self, x0: i64, y0: i64, w: i64, h: i64, color: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w { self.put(x, y, color); }
        }
    }

    /// Integer Bresenham, both endpoints inclusive.
    fn draw_line(&mut self, (mut x0, mut y0): (i64, i64), (x1, y1): (i64, i64), color: u32) {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        loop {
            self.put(x0, y0, color);
            if x0 == x1 && y0 == y1 { break; }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn crop(&self, bbox: BoundingBox) -> Image {
        let (left, top) = (bbox.left as usize, bbox.top as usize);
        let (width, height) = (bbox.width as usize, bbox.height as usize);
        let mut pixels = Vec::with_capacity(width * height);
        for y in top..top + height {
            let start = left + y * self.width;
            pixels.extend_from_slice(&self.pixels[start..start + width]);
        }
        Image { width, height, pixels }
    }

    /// Binary PPM (`P6`, maxval 255); alpha is dropped.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut row = Vec::with_capacity(self.width * 3);
        for line in self.pixels.chunks(self.width.max(1)) {
            row.clear();
            for &c in line {
                row.extend_from_slice(&[(c >> 16) as u8, (c >> 8) as u8, c as u8]);
            }
            out.write_all(&row)?;
        }
        out.flush()
    }
}

/// Half-up rounding of a display coordinate.
#[inline]
fn round_half_up(v: f32) -> i64 { (v as f64 + 0.5).floor() as i64 }

impl VacuumMap {
    /// Scaled raster with the start marker and the path drawn on top.
    pub fn render_with_path(&self, style: RenderStyle) -> Image {
        let mut img = Image { width: self.width(), height: self.height(), pixels: self.scaled_pixels() };
        let (cx, cy) = (img.width as i64 / 2, img.height as i64 / 2);
        let half = START_MARKER / 2;
        img.fill_rect(cx - half, cy - half, START_MARKER, START_MARKER, style.start_color);

        let path = self.display_path();
        for seg in path.windows(2) {
            let a = (round_half_up(seg[0].x), round_half_up(seg[0].y));
            let b = (round_half_up(seg[1].x), round_half_up(seg[1].y));
            img.draw_line(a, b, style.path_color);
        }
        img
    }

    /// Like [`render_with_path`](Self::render_with_path), cropped to the scaled bounding box.
    pub fn render_with_path_in_bounds(&self, style: RenderStyle) -> Image {
        self.render_with_path(style).crop(self.bounding_box())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::color::{RED, SENTINEL};

    fn map_with(slam: &str, oversample: u32) -> VacuumMap {
        // one red cell at (600, 600)
        let mut data = b"a\nb\n".to_vec();
        for i in 0..=600 * 1024 + 600 {
            if i == 600 * 1024 + 600 { data.extend_from_slice(&[255, 0, 0]); } else { data.extend_from_slice(&[125, 125, 125]); }
        }
        VacuumMap::parse(&data[..], slam.as_bytes(), oversample).unwrap()
    }

    #[test]
    fn start_marker_is_centered() {
        let img = map_with("", 1).render_with_path(RenderStyle::default());
        assert_eq!(img.get(502, 502), Some(GREEN));
        assert_eq!(img.get(521, 521), Some(GREEN));
        assert_eq!(img.get(501, 502), Some(SENTINEL));
        assert_eq!(img.get(522, 521), Some(SENTINEL));
        assert_eq!(img.get(600, 600), Some(RED));
    }

    #[test]
    fn path_segments_are_drawn_and_model_untouched() {
        // raw (0,0) and (40,0) -> display (512,512) .. (552,512)
        let map = map_with("unlock\nestimate 0 0 0 x\nestimate 0 2 0 x\n", 1);
        let before = map.clone();
        let img = map.render_with_path(RenderStyle { start_color: RED, path_color: GREEN });
        for x in 512..=552 { assert_eq!(img.get(x, 512), Some(GREEN), "x={x}"); }
        assert_eq!(img.get(553, 512), Some(SENTINEL));
        assert_eq!(map, before);
        assert_eq!(map.pixel(530, 512), Some(SENTINEL));
    }

    #[test]
    fn path_leaving_the_image_is_clipped() {
        let map = map_with("unlock\nestimate 0 0 0 x\nestimate 0 40 0 x\n", 1);
        let img = map.render_with_path(RenderStyle::default());
        assert_eq!(img.get(1023, 512), Some(BLUE));
    }

    #[test]
    fn in_bounds_crop_uses_scaled_box() {
        let map = map_with("", 2);
        let img = map.render_with_path_in_bounds(RenderStyle::default());
        assert_eq!((img.width, img.height), (2, 2));
        assert!(img.pixels.iter().all(|&c| c == RED));
    }

    #[test]
    fn ppm_output() {
        let img = Image { width: 2, height: 1, pixels: vec![RED, BLUE] };
        let mut out = Vec::new();
        img.write_ppm(&mut out).unwrap();
        assert_eq!(out, b"P6\n2 1\n255\n\xff\x00\x00\x00\x00\xff".to_vec());
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(2.49), 2);
    }
}
