//! Positioning floating popups relative to an anchor rectangle.
//!
//! Popups are horizontally centred on the anchor and clamped to the
//! viewport with an 8px margin; vertically they sit above the anchor when
//! there is room, otherwise below.

use crate::domain::geometry::{Point, Rect, Viewport};

/// Margin kept between a popup and the viewport edge
pub const VIEWPORT_MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupSize {
    pub width: f64,
    pub height: f64,
    /// Distance between anchor and popup
    pub gap: f64,
}

fn left_for(anchor: &Rect, width: f64, vp: &Viewport) -> f64 {
    let centred = anchor.left + anchor.width() / 2.0 - width / 2.0;
    centred
        .min(vp.width - width - VIEWPORT_MARGIN)
        .max(VIEWPORT_MARGIN)
}

/// Top-left corner for a popup that may overflow the bottom edge
pub fn place_above_or_below(anchor: &Rect, size: PopupSize, vp: &Viewport) -> Point {
    let left = left_for(anchor, size.width, vp);
    let mut top = anchor.top - size.height - size.gap;
    if top < VIEWPORT_MARGIN {
        top = anchor.bottom + size.gap;
    }
    Point::new(left, top)
}

/// Like [`place_above_or_below`], additionally pulled up so the bottom edge
/// stays inside the viewport
pub fn place_clamped(anchor: &Rect, size: PopupSize, vp: &Viewport) -> Point {
    let mut p = place_above_or_below(anchor, size, vp);
    if p.y + size.height > vp.height - VIEWPORT_MARGIN {
        p.y = vp.height - size.height - VIEWPORT_MARGIN;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: PopupSize = PopupSize {
        width: 320.0,
        height: 100.0,
        gap: 8.0,
    };

    #[test]
    fn test_above_when_room() {
        let vp = Viewport::default();
        let anchor = Rect::new(500.0, 300.0, 600.0, 320.0);
        let p = place_above_or_below(&anchor, SIZE, &vp);
        assert_eq!(p, Point::new(390.0, 192.0));
    }

    #[test]
    fn test_below_near_top_and_clamped_left() {
        let vp = Viewport::default();
        let anchor = Rect::new(0.0, 20.0, 40.0, 40.0);
        let p = place_above_or_below(&anchor, SIZE, &vp);
        assert_eq!(p, Point::new(8.0, 48.0));
    }

    #[test]
    fn test_clamped_to_right_and_bottom() {
        let vp = Viewport {
            height: 200.0,
            ..Viewport::default()
        };
        let anchor = Rect::new(1250.0, 50.0, 1280.0, 150.0);
        let p = place_clamped(&anchor, SIZE, &vp);
        assert_eq!(p.x, 1280.0 - 320.0 - 8.0);
        assert_eq!(p.y, 200.0 - 100.0 - 8.0);
    }
}
