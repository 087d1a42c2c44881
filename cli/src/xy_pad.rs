//! Mapping between pointer positions on the vocal pad and vocal coordinates.

use crate::types::{VocalCoordinate, COORDINATE_LIMIT};
use ratatui::layout::Rect;

const SPAN: f64 = (COORDINATE_LIMIT * 2) as f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlePosition {
    pub left_percent: f64,
    pub top_percent: f64,
}

/// Top edge is the highest pitch, so the vertical axis is inverted.
pub fn pointer_to_coordinate(pointer: Pointer, bounds: Bounds) -> VocalCoordinate {
    let fx = fraction(pointer.x - bounds.left, bounds.width);
    let fy = fraction(pointer.y - bounds.top, bounds.height);
    let x = (fx * SPAN - COORDINATE_LIMIT as f64).round() as i32;
    let y = ((1.0 - fy) * SPAN - COORDINATE_LIMIT as f64).round() as i32;
    VocalCoordinate::new(x, y)
}

pub fn coordinate_to_handle_position(coordinate: VocalCoordinate) -> HandlePosition {
    HandlePosition {
        left_percent: (coordinate.x + COORDINATE_LIMIT) as f64 / SPAN * 100.0,
        top_percent: (COORDINATE_LIMIT - coordinate.y) as f64 / SPAN * 100.0,
    }
}

// A degenerate extent has no meaningful fraction; park on the center line.
fn fraction(offset: f64, extent: f64) -> f64 {
    if extent <= 0.0 || !extent.is_finite() || offset.is_nan() {
        return 0.5;
    }
    (offset / extent).clamp(0.0, 1.0)
}

/// Bounds for a pad drawn into terminal cells. The span is one cell short
/// of the area so the first and last cells reach the extremes.
pub fn cell_bounds(area: Rect) -> Bounds {
    Bounds {
        left: area.x as f64,
        top: area.y as f64,
        width: area.width.saturating_sub(1) as f64,
        height: area.height.saturating_sub(1) as f64,
    }
}

pub fn cell_to_coordinate(column: u16, row: u16, area: Rect) -> VocalCoordinate {
    pointer_to_coordinate(Pointer { x: column as f64, y: row as f64 }, cell_bounds(area))
}

/// Cell in `area` where the handle for `coordinate` is drawn.
pub fn handle_cell(coordinate: VocalCoordinate, area: Rect) -> (u16, u16) {
    let position = coordinate_to_handle_position(coordinate);
    let bounds = cell_bounds(area);
    let column = bounds.left + (position.left_percent / 100.0 * bounds.width).round();
    let row = bounds.top + (position.top_percent / 100.0 * bounds.height).round();
    (column as u16, row as u16)
}

pub fn nudge(coordinate: VocalCoordinate, dx: i32, dy: i32) -> VocalCoordinate {
    VocalCoordinate::new(coordinate.x + dx, coordinate.y + dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds { left: 40.0, top: 12.0, width: 320.0, height: 192.0 };

    fn pointer_for(position: HandlePosition, bounds: Bounds) -> Pointer {
        Pointer {
            x: bounds.left + position.left_percent / 100.0 * bounds.width,
            y: bounds.top + position.top_percent / 100.0 * bounds.height,
        }
    }

    #[test]
    fn handle_position_maps_back_to_the_same_coordinate() {
        for x in -100..=100 {
            for y in -100..=100 {
                let coordinate = VocalCoordinate::new(x, y);
                let pointer = pointer_for(coordinate_to_handle_position(coordinate), BOUNDS);
                assert_eq!(pointer_to_coordinate(pointer, BOUNDS), coordinate);
            }
        }
    }

    #[test]
    fn corners_and_center() {
        let top_left = Pointer { x: BOUNDS.left, y: BOUNDS.top };
        assert_eq!(pointer_to_coordinate(top_left, BOUNDS), VocalCoordinate::new(-100, 100));

        let bottom_right =
            Pointer { x: BOUNDS.left + BOUNDS.width, y: BOUNDS.top + BOUNDS.height };
        assert_eq!(pointer_to_coordinate(bottom_right, BOUNDS), VocalCoordinate::new(100, -100));

        let center =
            Pointer { x: BOUNDS.left + BOUNDS.width / 2.0, y: BOUNDS.top + BOUNDS.height / 2.0 };
        assert_eq!(pointer_to_coordinate(center, BOUNDS), VocalCoordinate::new(0, 0));

        let handle = coordinate_to_handle_position(VocalCoordinate::new(0, 0));
        assert_eq!(handle, HandlePosition { left_percent: 50.0, top_percent: 50.0 });
    }

    #[test]
    fn pointers_outside_the_pad_are_clamped() {
        let outside = [
            Pointer { x: -5_000.0, y: -5_000.0 },
            Pointer { x: 9_000.0, y: 17.0 },
            Pointer { x: 100.0, y: 1e9 },
            Pointer { x: f64::NAN, y: -1.0 },
        ];
        for pointer in outside {
            let coordinate = pointer_to_coordinate(pointer, BOUNDS);
            assert!(coordinate.x.abs() <= 100 && coordinate.y.abs() <= 100, "{coordinate:?}");
        }
        let far_left = pointer_to_coordinate(Pointer { x: -5_000.0, y: -5_000.0 }, BOUNDS);
        assert_eq!(far_left, VocalCoordinate::new(-100, 100));
    }

    #[test]
    fn terminal_cells_reach_both_extremes() {
        let area = Rect::new(4, 2, 21, 9);
        assert_eq!(cell_to_coordinate(4, 2, area), VocalCoordinate::new(-100, 100));
        assert_eq!(cell_to_coordinate(24, 10, area), VocalCoordinate::new(100, -100));
        assert_eq!(cell_to_coordinate(14, 6, area), VocalCoordinate::new(0, 0));
        assert_eq!(cell_to_coordinate(90, 90, area), VocalCoordinate::new(100, -100));

        assert_eq!(handle_cell(VocalCoordinate::new(-100, 100), area), (4, 2));
        assert_eq!(handle_cell(VocalCoordinate::new(100, -100), area), (24, 10));
        assert_eq!(handle_cell(VocalCoordinate::new(0, 0), area), (14, 6));
    }

    #[test]
    fn single_cell_pad_stays_centered() {
        let area = Rect::new(0, 0, 1, 1);
        assert_eq!(cell_to_coordinate(0, 0, area), VocalCoordinate::new(0, 0));
        assert_eq!(nudge(VocalCoordinate::new(98, -97), 5, -5), VocalCoordinate::new(100, -100));
    }
}
