//! Geometry patches for edited annotations
//!
//! Interactive edits only report a new rect or vertex list. These helpers
//! turn them into a full [`AnnotationPatch`] that keeps the type-specific
//! geometry (ink points, line endpoints, vertices) consistent with it.

use crate::transform::{TransformData, TransformKind};
use pdf_annotation_model::{
    derive_rect, expand_rect, line_rect_with_endings, rect_from_points, AnnotationKind,
    AnnotationObject, AnnotationPatch, InkStroke, Position, Rect, Size,
};

/// Smallest size a resize may shrink point-based geometry to
const MIN_RESIZE: f32 = 10.0;

fn ratio(new: f32, old: f32) -> f32 {
    if old > 0.0 {
        new / old
    } else {
        1.0
    }
}

/// Clamp a resized rect to the minimum size and optionally to a uniform scale
///
/// Returns the adjusted rect and the per-axis scale factors.
fn scaled_rect(old: &Rect, new: &Rect, uniform: bool) -> (Rect, f32, f32) {
    let mut rect = *new;
    let mut sx = ratio(new.size.width, old.size.width);
    let mut sy = ratio(new.size.height, old.size.height);

    if new.size.width < MIN_RESIZE || new.size.height < MIN_RESIZE {
        sx = sx.max(ratio(MIN_RESIZE, old.size.width));
        sy = sy.max(ratio(MIN_RESIZE, old.size.height));
        rect.size = Size::new(old.size.width * sx, old.size.height * sy);
    }

    if uniform {
        let s = sx.min(sy);
        sx = s;
        sy = s;
        rect.size = Size::new(old.size.width * s, old.size.height * s);
    }

    (rect, sx, sy)
}

fn scale_point(p: &Position, old: &Rect, new: &Rect, sx: f32, sy: f32) -> Position {
    Position::new(
        new.origin.x + (p.x - old.origin.x) * sx,
        new.origin.y + (p.y - old.origin.y) * sy,
    )
}

fn inset(rect: &Rect, pad: f32) -> Rect {
    Rect::new(
        rect.origin.x + pad,
        rect.origin.y + pad,
        (rect.size.width - pad * 2.0).max(1.0),
        (rect.size.height - pad * 2.0).max(1.0),
    )
}

fn translate_points(points: &[Position], dx: f32, dy: f32) -> Vec<Position> {
    points.iter().map(|p| p.offset(dx, dy)).collect()
}

/// Build the patch for a finished move, resize or vertex edit
pub fn transform_patch(original: &AnnotationObject, transform: &TransformData) -> AnnotationPatch {
    let changes = &transform.changes;
    let mut patch = AnnotationPatch::new();

    match transform.kind {
        TransformKind::Move => {
            let Some(rect) = changes.rect else {
                return patch;
            };
            let dx = rect.origin.x - original.rect.origin.x;
            let dy = rect.origin.y - original.rect.origin.y;
            patch.rect = Some(rect);
            patch.kind = moved_kind(&original.kind, dx, dy);
        }
        TransformKind::Resize => {
            let Some(new_rect) = changes.rect else {
                return patch;
            };
            resize_patch(original, &new_rect, transform.metadata.maintain_aspect_ratio, &mut patch);
        }
        TransformKind::VertexEdit => {
            let Some(vertices) = changes.vertices.as_ref().filter(|v| !v.is_empty()) else {
                patch.rect = changes.rect;
                return patch;
            };
            vertex_patch(original, vertices, &mut patch);
        }
    }
    patch
}

fn moved_kind(kind: &AnnotationKind, dx: f32, dy: f32) -> Option<AnnotationKind> {
    match kind {
        AnnotationKind::Ink { ink_list } => Some(AnnotationKind::Ink {
            ink_list: ink_list
                .iter()
                .map(|s| InkStroke::new(translate_points(&s.points, dx, dy)))
                .collect(),
        }),
        AnnotationKind::Line {
            start,
            end,
            line_endings,
        } => Some(AnnotationKind::Line {
            start: start.offset(dx, dy),
            end: end.offset(dx, dy),
            line_endings: *line_endings,
        }),
        AnnotationKind::Polyline {
            vertices,
            line_endings,
        } => Some(AnnotationKind::Polyline {
            vertices: translate_points(vertices, dx, dy),
            line_endings: *line_endings,
        }),
        AnnotationKind::Polygon { vertices } => Some(AnnotationKind::Polygon {
            vertices: translate_points(vertices, dx, dy),
        }),
        _ => None,
    }
}

fn resize_patch(original: &AnnotationObject, new_rect: &Rect, uniform: bool, patch: &mut AnnotationPatch) {
    let old = &original.rect;
    match &original.kind {
        AnnotationKind::Ink { ink_list } => {
            let (rect, _, _) = scaled_rect(old, new_rect, uniform);
            // Scale the stroke by the limiting axis and keep it inside the rect
            let stroke_scale = ratio(rect.size.width, old.size.width)
                .min(ratio(rect.size.height, old.size.height));
            let stroke_width = (original.style.stroke_width * stroke_scale).round().max(1.0);

            let inner_old = inset(old, original.style.stroke_width / 2.0);
            let inner_new = inset(&rect, stroke_width / 2.0);
            let sx = inner_new.size.width / inner_old.size.width.max(1e-6);
            let sy = inner_new.size.height / inner_old.size.height.max(1e-6);

            patch.kind = Some(AnnotationKind::Ink {
                ink_list: ink_list
                    .iter()
                    .map(|s| {
                        InkStroke::new(
                            s.points
                                .iter()
                                .map(|p| scale_point(p, &inner_old, &inner_new, sx, sy))
                                .collect(),
                        )
                    })
                    .collect(),
            });
            patch.rect = Some(rect);
            patch.stroke_width = Some(stroke_width);
        }
        AnnotationKind::Line {
            start,
            end,
            line_endings,
        } => {
            let (rect, sx, sy) = scaled_rect(old, new_rect, uniform);
            patch.kind = Some(AnnotationKind::Line {
                start: scale_point(start, old, &rect, sx, sy),
                end: scale_point(end, old, &rect, sx, sy),
                line_endings: *line_endings,
            });
            patch.rect = Some(rect);
        }
        AnnotationKind::Polyline {
            vertices,
            line_endings,
        } => {
            let (rect, sx, sy) = scaled_rect(old, new_rect, uniform);
            patch.kind = Some(AnnotationKind::Polyline {
                vertices: vertices
                    .iter()
                    .map(|p| scale_point(p, old, &rect, sx, sy))
                    .collect(),
                line_endings: *line_endings,
            });
            patch.rect = Some(rect);
        }
        AnnotationKind::Polygon { vertices } => {
            let (rect, sx, sy) = scaled_rect(old, new_rect, uniform);
            patch.kind = Some(AnnotationKind::Polygon {
                vertices: vertices
                    .iter()
                    .map(|p| scale_point(p, old, &rect, sx, sy))
                    .collect(),
            });
            patch.rect = Some(rect);
        }
        _ => patch.rect = Some(*new_rect),
    }
}

fn vertex_patch(original: &AnnotationObject, vertices: &[Position], patch: &mut AnnotationPatch) {
    let stroke_width = original.style.stroke_width;
    match &original.kind {
        AnnotationKind::Line { line_endings, .. } if vertices.len() >= 2 => {
            let (start, end) = (vertices[0], vertices[1]);
            patch.rect = Some(line_rect_with_endings(&[start, end], stroke_width, Some(line_endings)));
            patch.kind = Some(AnnotationKind::Line {
                start,
                end,
                line_endings: *line_endings,
            });
        }
        AnnotationKind::Polyline { line_endings, .. } => {
            patch.rect = Some(line_rect_with_endings(vertices, stroke_width, Some(line_endings)));
            patch.kind = Some(AnnotationKind::Polyline {
                vertices: vertices.to_vec(),
                line_endings: *line_endings,
            });
        }
        AnnotationKind::Polygon { .. } => {
            patch.rect = Some(expand_rect(&rect_from_points(vertices), stroke_width / 2.0));
            patch.kind = Some(AnnotationKind::Polygon {
                vertices: vertices.to_vec(),
            });
        }
        _ => {
            tracing::debug!(subtype = ?original.subtype(), "vertex edit ignored");
        }
    }
}

/// Complete a property update, recomputing the rect when geometry inputs change
pub fn property_patch(original: &AnnotationObject, mut patch: AnnotationPatch) -> AnnotationPatch {
    if patch.rect.is_some() || !patch.affects_geometry() {
        return patch;
    }
    let point_based = matches!(
        original.kind,
        AnnotationKind::Ink { .. }
            | AnnotationKind::Line { .. }
            | AnnotationKind::Polyline { .. }
            | AnnotationKind::Polygon { .. }
    );
    if point_based {
        patch.rect = Some(derive_rect(&patch.applied_to(original)));
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{TransformChanges, TransformMetadata};
    use pdf_annotation_model::{AnnotationStyle, LineEndings};

    fn line() -> AnnotationObject {
        let start = Position::new(10.0, 10.0);
        let end = Position::new(110.0, 60.0);
        let mut object = AnnotationObject::new(
            0,
            Rect::default(),
            AnnotationKind::Line {
                start,
                end,
                line_endings: LineEndings::default(),
            },
            AnnotationStyle::default(),
        );
        object.rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        object
    }

    fn transform(kind: TransformKind, rect: Option<Rect>, vertices: Option<Vec<Position>>) -> TransformData {
        TransformData {
            kind,
            changes: TransformChanges { rect, vertices },
            metadata: TransformMetadata::default(),
        }
    }

    #[test]
    fn test_move_translates_endpoints() {
        let patch = transform_patch(
            &line(),
            &transform(TransformKind::Move, Some(Rect::new(30.0, 5.0, 100.0, 50.0)), None),
        );
        match patch.kind {
            Some(AnnotationKind::Line { start, end, .. }) => {
                assert_eq!(start, Position::new(30.0, 5.0));
                assert_eq!(end, Position::new(130.0, 55.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_resize_scales_line_points() {
        let patch = transform_patch(
            &line(),
            &transform(TransformKind::Resize, Some(Rect::new(10.0, 10.0, 200.0, 50.0)), None),
        );
        match patch.kind {
            Some(AnnotationKind::Line { end, .. }) => assert_eq!(end, Position::new(210.0, 60.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_resize_enforces_minimum_size() {
        let patch = transform_patch(
            &line(),
            &transform(TransformKind::Resize, Some(Rect::new(10.0, 10.0, 2.0, 50.0)), None),
        );
        let rect = patch.rect.unwrap();
        assert!((rect.size.width - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_shape_resize_passes_rect_through() {
        let square = AnnotationObject::new(
            0,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            AnnotationKind::Square,
            AnnotationStyle::default(),
        );
        let rect = Rect::new(0.0, 0.0, 4.0, 40.0);
        let patch = transform_patch(&square, &transform(TransformKind::Resize, Some(rect), None));
        assert_eq!(patch.rect, Some(rect));
        assert!(patch.kind.is_none());
    }

    #[test]
    fn test_vertex_edit_recomputes_polygon_rect() {
        let mut polygon = AnnotationObject::new(
            0,
            Rect::default(),
            AnnotationKind::Polygon {
                vertices: vec![Position::new(0.0, 0.0), Position::new(10.0, 0.0), Position::new(10.0, 10.0)],
            },
            AnnotationStyle {
                stroke_width: 2.0,
                ..Default::default()
            },
        );
        polygon.rect = derive_rect(&polygon);
        let vertices = vec![Position::new(0.0, 0.0), Position::new(20.0, 0.0), Position::new(10.0, 10.0)];
        let patch = transform_patch(&polygon, &transform(TransformKind::VertexEdit, None, Some(vertices)));
        assert_eq!(patch.rect, Some(Rect::new(-1.0, -1.0, 22.0, 12.0)));
    }

    #[test]
    fn test_ink_resize_scales_stroke() {
        let mut ink = AnnotationObject::new(
            0,
            Rect::default(),
            AnnotationKind::Ink {
                ink_list: vec![InkStroke::new(vec![Position::new(2.0, 2.0), Position::new(98.0, 98.0)])],
            },
            AnnotationStyle {
                stroke_width: 4.0,
                ..Default::default()
            },
        );
        ink.rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let patch = transform_patch(
            &ink,
            &transform(TransformKind::Resize, Some(Rect::new(0.0, 0.0, 50.0, 50.0)), None),
        );
        assert_eq!(patch.stroke_width, Some(2.0));
        match patch.kind {
            Some(AnnotationKind::Ink { ink_list }) => {
                let p = ink_list[0].points[1];
                assert!((p.x - 49.0).abs() < 0.001 && (p.y - 49.0).abs() < 0.001);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stroke_width_update_recomputes_rect() {
        let mut polygon = AnnotationObject::new(
            0,
            Rect::default(),
            AnnotationKind::Polygon {
                vertices: vec![Position::new(0.0, 0.0), Position::new(10.0, 10.0)],
            },
            AnnotationStyle::default(),
        );
        polygon.rect = derive_rect(&polygon);
        let patch = property_patch(&polygon, AnnotationPatch::new().with_stroke_width(4.0));
        assert_eq!(patch.rect, Some(Rect::new(-2.0, -2.0, 14.0, 14.0)));

        let colored = property_patch(&polygon, AnnotationPatch::new().with_opacity(0.5));
        assert!(colored.rect.is_none());
    }
}
