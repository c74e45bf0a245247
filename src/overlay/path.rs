//! Connector geometry.
//!
//! Each connector starts just right of its target and ends at the left edge
//! of the convergence node. Nearly vertical connectors are drawn straight;
//! anything wider is a cubic curve whose control points are pulled
//! horizontally in proportion to the gap.

use crate::domain::geometry::{Point, Rect};

/// Horizontal gaps below this are drawn as straight lines
pub const STRAIGHT_THRESHOLD_PX: f64 = 20.0;

/// Offset of the connector start from the target's right edge
pub const START_OFFSET_X: f64 = 10.0;

/// Connector starts never come closer than this to the right viewport edge
pub const RIGHT_RESERVE_PX: f64 = 160.0;

/// First control point, as a share of the horizontal gap from the start
const START_PULL: f64 = 0.5;

/// Second control point, as a share of the gap back from the end
const END_PULL: f64 = 0.3;

/// Connector start for a target in viewport space
pub fn connector_start(target: &Rect, viewport_width: f64) -> Point {
    Point::new(
        (target.right + START_OFFSET_X).min(viewport_width - RIGHT_RESERVE_PX),
        target.mid_y(),
    )
}

/// SVG path data from `start` to `end`
pub fn connector_path(start: Point, end: Point) -> String {
    let dx = end.x - start.x;
    if dx.abs() < STRAIGHT_THRESHOLD_PX {
        format!("M {} {} L {} {}", start.x, start.y, end.x, end.y)
    } else {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            start.x,
            start.y,
            start.x + dx * START_PULL,
            start.y,
            end.x - dx * END_PULL,
            end.y,
            end.x,
            end.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_under_threshold() {
        let d = connector_path(Point::new(100.0, 50.0), Point::new(119.0, 200.0));
        assert_eq!(d, "M 100 50 L 119 200");
    }

    #[test]
    fn test_curve_at_threshold() {
        let d = connector_path(Point::new(100.0, 50.0), Point::new(120.0, 200.0));
        assert_eq!(d, "M 100 50 C 110 50, 114 200, 120 200");
    }

    #[test]
    fn test_curve_for_wide_gap() {
        let d = connector_path(Point::new(300.0, 100.0), Point::new(1000.0, 400.0));
        assert_eq!(d, "M 300 100 C 650 100, 790 400, 1000 400");
    }

    #[test]
    fn test_start_respects_right_reserve() {
        let wide = Rect::new(0.0, 100.0, 1250.0, 140.0);
        assert_eq!(connector_start(&wide, 1280.0), Point::new(1120.0, 120.0));
        let narrow = Rect::new(0.0, 100.0, 400.0, 140.0);
        assert_eq!(connector_start(&narrow, 1280.0), Point::new(410.0, 120.0));
    }
}
