//! Canvas geometry and packed ARGB colors.

use serde::{Deserialize, Serialize};

pub const MAP_WIDTH: usize = 1024;
pub const MAP_HEIGHT: usize = 1024;
pub const MAP_PIXELS: usize = MAP_WIDTH * MAP_HEIGHT;

/// Packs a color as `a << 24 | r << 16 | g << 8 | b`.
#[inline]
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Opaque (125,125,125): "unknown / unmapped".
pub const SENTINEL: u32 = argb(0xff, 125, 125, 125);

pub const RED: u32 = argb(0xff, 0xff, 0, 0);
pub const GREEN: u32 = argb(0xff, 0, 0xff, 0);
pub const BLUE: u32 = argb(0xff, 0, 0, 0xff);

#[inline]
pub(crate) fn canvas_index(col: usize, row: usize) -> usize { col + row * MAP_WIDTH }

/// Smallest rectangle enclosing every non-sentinel cell, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "x")]
    pub left: u32,
    #[serde(rename = "y")]
    pub top: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
}

impl BoundingBox {
    pub const FULL: BoundingBox = BoundingBox { left: 0, top: 0, width: MAP_WIDTH as u32, height: MAP_HEIGHT as u32 };

    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self { Self { left, top, width, height } }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 { self.left + self.width }
    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 { self.top + self.height }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.left && col < self.right() && row >= self.top && row < self.bottom()
    }

    /// True when the box is non-empty and lies entirely on the canvas.
    pub fn fits_canvas(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (self.left as u64 + self.width as u64) <= MAP_WIDTH as u64
            && (self.top as u64 + self.height as u64) <= MAP_HEIGHT as u64
    }

    pub fn scaled(&self, factor: u32) -> Self {
        Self {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self { Self::FULL }
}

/// Running min/max over the non-sentinel cells seen during a scan.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundsTracker {
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
    seen: bool,
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self { left: MAP_WIDTH, right: 0, top: MAP_HEIGHT, bottom: 0, seen: false }
    }
}

impl BoundsTracker {
    #[inline]
    pub(crate) fn observe(&mut self, col: usize, row: usize) {
        self.left = self.left.min(col);
        self.right = self.right.max(col);
        self.top = self.top.min(row);
        self.bottom = self.bottom.max(row);
        self.seen = true;
    }

    /// Falls back to the full canvas when nothing but sentinel was seen.
    pub(crate) fn finish(&self) -> BoundingBox {
        if !self.seen { return BoundingBox::FULL; }
        BoundingBox {
            left: self.left as u32,
            top: self.top as u32,
            width: (self.right - self.left + 1) as u32,
            height: (self.bottom - self.top + 1) as u32,
        }
    }
}
