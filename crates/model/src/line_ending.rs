//! Line ending shapes and line bounding boxes
//!
//! Each ending is described by a set of local points around the tip,
//! oriented along the positive X axis, plus a rotation rule relative to
//! the segment angle. Bounding boxes for lines and polylines include the
//! rotated ending points so the drawn decoration is never clipped.

use crate::geometry::{expand_rect, rect_from_points, rotate_and_translate_point, Position, Rect};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const EXTRA_PADDING: f32 = 1.2;

/// Decoration drawn at the end of a line or polyline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineEnding {
    #[default]
    None,
    Square,
    Circle,
    Diamond,
    OpenArrow,
    ClosedArrow,
    Butt,
    ROpenArrow,
    RClosedArrow,
    Slash,
}

impl LineEnding {
    /// Local points of the ending shape for a given stroke width
    pub fn local_points(&self, stroke_width: f32) -> Vec<Position> {
        match self {
            LineEnding::None => Vec::new(),
            LineEnding::OpenArrow
            | LineEnding::ClosedArrow
            | LineEnding::ROpenArrow
            | LineEnding::RClosedArrow => {
                let len = stroke_width * 9.0;
                let angle = PI / 6.0;
                let x = -len * angle.cos();
                let y = len * angle.sin();
                vec![Position::new(0.0, 0.0), Position::new(x, y), Position::new(x, -y)]
            }
            LineEnding::Circle => {
                let r = stroke_width * 5.0 / 2.0;
                vec![Position::new(-r, -r), Position::new(r, r)]
            }
            LineEnding::Square => {
                let h = stroke_width * 6.0 / 2.0;
                vec![
                    Position::new(-h, -h),
                    Position::new(h, -h),
                    Position::new(h, h),
                    Position::new(-h, h),
                ]
            }
            LineEnding::Diamond => {
                let h = stroke_width * 6.0 / 2.0;
                vec![
                    Position::new(0.0, -h),
                    Position::new(h, 0.0),
                    Position::new(0.0, h),
                    Position::new(-h, 0.0),
                ]
            }
            LineEnding::Butt => {
                let l = stroke_width * 6.0 / 2.0;
                vec![Position::new(-l, 0.0), Position::new(l, 0.0)]
            }
            LineEnding::Slash => {
                let l = stroke_width * 18.0 / 2.0;
                vec![Position::new(-l, 0.0), Position::new(l, 0.0)]
            }
        }
    }

    /// Final rotation in radians given the angle of the segment pointing into the tip
    pub fn rotation(&self, segment_angle: f32) -> f32 {
        match self {
            LineEnding::Circle => 0.0,
            LineEnding::ROpenArrow | LineEnding::RClosedArrow => segment_angle + PI,
            LineEnding::Butt => segment_angle + PI / 2.0,
            LineEnding::Slash => segment_angle + PI / 1.5,
            _ => segment_angle,
        }
    }

    /// Whether the ending is drawn filled
    pub fn is_filled(&self) -> bool {
        matches!(
            self,
            LineEnding::ClosedArrow
                | LineEnding::RClosedArrow
                | LineEnding::Circle
                | LineEnding::Square
                | LineEnding::Diamond
        )
    }
}

/// Endings for both ends of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineEndings {
    pub start: LineEnding,
    pub end: LineEnding,
}

impl LineEndings {
    pub fn new(start: LineEnding, end: LineEnding) -> Self {
        Self { start, end }
    }
}

/// Bounding box of a line or polyline including stroke and endings
pub fn line_rect_with_endings(
    vertices: &[Position],
    stroke_width: f32,
    endings: Option<&LineEndings>,
) -> Rect {
    let Some(first) = vertices.first() else {
        return Rect::default();
    };

    let mut all_points: Vec<Position> = vertices.to_vec();
    let angle = |a: &Position, b: &Position| (b.y - a.y).atan2(b.x - a.x);
    let mut add_ending = |ending: LineEnding, tip: &Position, segment_angle: f32| {
        let rotation = ending.rotation(segment_angle);
        all_points.extend(
            ending
                .local_points(stroke_width)
                .iter()
                .map(|p| rotate_and_translate_point(p, rotation, tip)),
        );
    };

    if vertices.len() >= 2 {
        if let Some(endings) = endings {
            let last = vertices.len() - 1;
            add_ending(endings.start, &vertices[0], angle(&vertices[1], &vertices[0]));
            add_ending(
                endings.end,
                &vertices[last],
                angle(&vertices[last - 1], &vertices[last]),
            );
        }
    }

    if all_points.len() <= 1 {
        let pad = stroke_width;
        return Rect::new(first.x - pad, first.y - pad, pad * 2.0, pad * 2.0);
    }

    let pad = stroke_width / 2.0 + EXTRA_PADDING * stroke_width;
    expand_rect(&rect_from_points(&all_points), pad)
}
