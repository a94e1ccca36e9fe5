//! Page-space geometry primitives
//!
//! All coordinates are page-local and measured in page units with the
//! origin at the top-left corner of the page.

use serde::{Deserialize, Serialize};

/// A point in page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Create a new position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another position
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Translate by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }

    /// Clamp into `[0, width] x [0, height]`
    pub fn clamp_to(&self, size: &Size) -> Position {
        Position::new(
            self.x.max(0.0).min(size.width),
            self.y.max(0.0).min(size.height),
        )
    }
}

/// Width and height in page units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Position,
    pub size: Size,
}

impl Rect {
    /// Create a rect from origin and size components
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Position::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Rect spanning two arbitrary corners
    pub fn from_corners(a: Position, b: Position) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Rect::new(min_x, min_y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Check whether a point lies inside the rect (edges inclusive)
    pub fn contains(&self, point: &Position) -> bool {
        point.x >= self.origin.x
            && point.x <= self.right()
            && point.y >= self.origin.y
            && point.y <= self.bottom()
    }

    /// Copy translated by a delta
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            origin: self.origin.offset(dx, dy),
            size: self.size,
        }
    }
}

/// Smallest rect containing every point
///
/// An empty slice yields a zero rect at the origin.
pub fn rect_from_points(points: &[Position]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let mut min_x = first.x;
    let mut max_x = first.x;
    let mut min_y = first.y;
    let mut max_y = first.y;
    for point in points.iter().skip(1) {
        min_x = min_x.min(point.x);
        max_x = max_x.max(point.x);
        min_y = min_y.min(point.y);
        max_y = max_y.max(point.y);
    }

    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// Grow a rect by `pad` on all four sides
pub fn expand_rect(rect: &Rect, pad: f32) -> Rect {
    Rect::new(
        rect.origin.x - pad,
        rect.origin.y - pad,
        rect.size.width + pad * 2.0,
        rect.size.height + pad * 2.0,
    )
}

/// Rotate a local point by `angle` radians, then translate it by `translation`
pub fn rotate_and_translate_point(point: &Position, angle: f32, translation: &Position) -> Position {
    let (sin, cos) = angle.sin_cos();
    Position::new(
        point.x * cos - point.y * sin + translation.x,
        point.x * sin + point.y * cos + translation.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let p1 = Position::new(0.0, 0.0);
        let p2 = Position::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_rect_from_points() {
        let rect = rect_from_points(&[
            Position::new(10.0, 40.0),
            Position::new(50.0, 10.0),
            Position::new(30.0, 20.0),
        ]);
        assert_eq!(rect, Rect::new(10.0, 10.0, 40.0, 30.0));
        assert_eq!(rect_from_points(&[]), Rect::default());
    }

    #[test]
    fn test_expand_rect() {
        let rect = expand_rect(&Rect::new(10.0, 10.0, 40.0, 30.0), 1.0);
        assert_eq!(rect, Rect::new(9.0, 9.0, 42.0, 32.0));
    }

    #[test]
    fn test_from_corners_normalizes() {
        let rect = Rect::from_corners(Position::new(50.0, 40.0), Position::new(10.0, 10.0));
        assert_eq!(rect, Rect::new(10.0, 10.0, 40.0, 30.0));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let p = rotate_and_translate_point(
            &Position::new(1.0, 0.0),
            std::f32::consts::FRAC_PI_2,
            &Position::new(10.0, 10.0),
        );
        assert!((p.x - 10.0).abs() < 0.001);
        assert!((p.y - 11.0).abs() < 0.001);
    }

    #[test]
    fn test_clamp_to_page() {
        let page = Size::new(100.0, 50.0);
        assert_eq!(Position::new(-5.0, 70.0).clamp_to(&page), Position::new(0.0, 50.0));
    }
}
