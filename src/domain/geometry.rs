//! Screen-space geometry shared by the resolver, popups and overlay.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (left/top/right/bottom)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Vertical midpoint
    pub fn mid_y(&self) -> f64 {
        self.top + self.height() / 2.0
    }

    /// Horizontal midpoint
    pub fn mid_x(&self) -> f64 {
        self.left + self.width() / 2.0
    }

    /// Shift by (-dx, -dy); used to go from page to viewport coordinates
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left - dx,
            top: self.top - dy,
            right: self.right - dx,
            bottom: self.bottom - dy,
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The visible window onto the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    /// Whether a viewport-space rect overlaps the visible band vertically
    pub fn shows(&self, client: &Rect) -> bool {
        client.bottom > 0.0 && client.top < self.height
    }
}
