//! Polygon and polyline creation
//!
//! Vertices are added one click at a time. A polyline commits on double
//! click. A polygon also commits when the user clicks back on its first
//! vertex.

use super::{HandlerContext, PointerEvent, PointerHandler, PreviewData, PreviewState};
use crate::tools::Tool;
use pdf_annotation_model::{
    expand_rect, line_rect_with_endings, rect_from_points, AnnotationKind, AnnotationStyle,
    AnnotationSubtype, Color, LineEndings, Position, Rect,
};

/// Side of the closing hit target around the first vertex, in screen pixels
pub const HANDLE_SIZE_PX: f32 = 14.0;

/// Clicks closer than this to the last vertex are ignored
const DUPLICATE_TOLERANCE: f32 = 1.0;

fn base_style() -> AnnotationStyle {
    AnnotationStyle {
        color: Color::BLACK,
        stroke_color: Color::BLACK,
        stroke_width: 1.0,
        ..Default::default()
    }
}

pub struct VertexPathHandler {
    context: HandlerContext,
    closed: bool,
    vertices: Vec<Position>,
    current: Option<Position>,
}

pub(super) fn polygon_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(VertexPathHandler::new(context, true))
}

pub(super) fn polyline_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(VertexPathHandler::new(context, false))
}

impl VertexPathHandler {
    fn new(context: HandlerContext, closed: bool) -> Self {
        Self {
            context,
            closed,
            vertices: Vec::new(),
            current: None,
        }
    }

    fn min_vertices(&self) -> usize {
        if self.closed {
            3
        } else {
            2
        }
    }

    fn subtype(&self) -> AnnotationSubtype {
        if self.closed {
            AnnotationSubtype::Polygon
        } else {
            AnnotationSubtype::Polyline
        }
    }

    fn is_inside_start_handle(&self, pos: Position) -> bool {
        if self.vertices.len() < 2 {
            return false;
        }
        let half = HANDLE_SIZE_PX / self.context.scale / 2.0;
        let first = self.vertices[0];
        pos.x >= first.x - half
            && pos.x <= first.x + half
            && pos.y >= first.y - half
            && pos.y <= first.y + half
    }

    fn bounds(&self, points: &[Position], style: &AnnotationStyle, endings: &LineEndings) -> Rect {
        if self.closed {
            expand_rect(&rect_from_points(points), style.stroke_width / 2.0)
        } else {
            line_rect_with_endings(points, style.stroke_width, Some(endings))
        }
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.current = None;
        self.context.clear_preview();
    }

    fn update_preview(&self) {
        let Some(current) = self.current else {
            return;
        };
        if self.vertices.is_empty() {
            return;
        }
        let Some(tool) = self.context.tool() else {
            return;
        };
        let style = tool.defaults.resolve_style(base_style());
        let line_endings = tool.defaults.line_endings.unwrap_or_default();

        let mut points = self.vertices.clone();
        points.push(current);
        let bounds = self.bounds(&points, &style, &line_endings);

        let data = if self.closed {
            PreviewData::Polygon {
                vertices: self.vertices.clone(),
                current_vertex: current,
                style,
            }
        } else {
            PreviewData::Polyline {
                vertices: self.vertices.clone(),
                current_vertex: current,
                line_endings,
                style,
            }
        };
        self.context.preview(PreviewState {
            subtype: self.subtype(),
            bounds,
            data,
        });
    }

    fn commit(&mut self) {
        if self.vertices.len() < self.min_vertices() {
            return;
        }
        let Some(tool) = self.context.tool() else {
            return;
        };
        self.commit_with(&tool);
        self.clear();
    }

    fn commit_with(&self, tool: &Tool) {
        let style = tool.defaults.resolve_style(base_style());
        let line_endings = tool.defaults.line_endings.unwrap_or_default();
        let vertices = self.vertices.clone();
        let rect = self.bounds(&vertices, &style, &line_endings);
        let kind = if self.closed {
            AnnotationKind::Polygon { vertices }
        } else {
            AnnotationKind::Polyline {
                vertices,
                line_endings,
            }
        };
        let object = self.context.new_object(tool, rect, kind, style);
        self.context.commit(object, None);
    }
}

impl PointerHandler for VertexPathHandler {
    fn on_click(&mut self, pos: Position, _event: &PointerEvent<'_>) {
        let pos = self.context.clamp(pos);

        if self.closed && self.is_inside_start_handle(pos) && self.vertices.len() >= 3 {
            self.commit();
            return;
        }

        if let Some(last) = self.vertices.last() {
            if (last.x - pos.x).abs() < DUPLICATE_TOLERANCE
                && (last.y - pos.y).abs() < DUPLICATE_TOLERANCE
            {
                return;
            }
        }

        self.vertices.push(pos);
        self.current = Some(pos);
        self.update_preview();
    }

    fn on_double_click(&mut self, _pos: Position, _event: &PointerEvent<'_>) {
        self.commit();
    }

    fn on_pointer_move(&mut self, pos: Position, _event: &PointerEvent<'_>) {
        if self.vertices.is_empty() {
            return;
        }
        self.current = Some(self.context.clamp(pos));
        self.update_preview();
    }

    fn on_pointer_leave(&mut self, _pos: Position, _event: &PointerEvent<'_>) {
        self.clear();
    }

    fn on_pointer_cancel(&mut self, _pos: Position, _event: &PointerEvent<'_>) {
        self.clear();
    }
}
