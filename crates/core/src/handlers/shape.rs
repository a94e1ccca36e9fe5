//! Circle and square creation

use super::{centered_origin, HandlerContext, PointerEvent, PointerHandler, PreviewData, PreviewState};
use crate::click::ClickDetector;
use crate::tools::Tool;
use pdf_annotation_model::{
    expand_rect, AnnotationKind, AnnotationStyle, AnnotationSubtype, Color, Position, Rect, Size,
};

/// Fallback box for click creation when the tool names no size
const CLICK_SIZE: Size = Size {
    width: 100.0,
    height: 100.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Circle,
    Square,
}

impl ShapeKind {
    fn subtype(self) -> AnnotationSubtype {
        match self {
            ShapeKind::Circle => AnnotationSubtype::Circle,
            ShapeKind::Square => AnnotationSubtype::Square,
        }
    }

    fn kind(self) -> AnnotationKind {
        match self {
            ShapeKind::Circle => AnnotationKind::Circle,
            ShapeKind::Square => AnnotationKind::Square,
        }
    }
}

fn base_style() -> AnnotationStyle {
    AnnotationStyle {
        color: Color::BLACK,
        stroke_color: Color::BLACK,
        stroke_width: 2.0,
        ..Default::default()
    }
}

/// Drag a box or click to drop a default-sized one
pub struct ShapeHandler {
    context: HandlerContext,
    shape: ShapeKind,
    start: Option<Position>,
    click: ClickDetector,
}

pub(super) fn circle_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(ShapeHandler::new(context, ShapeKind::Circle))
}

pub(super) fn square_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(ShapeHandler::new(context, ShapeKind::Square))
}

impl ShapeHandler {
    fn new(context: HandlerContext, shape: ShapeKind) -> Self {
        Self {
            context,
            shape,
            start: None,
            click: ClickDetector::default(),
        }
    }

    fn reset(&mut self) {
        self.start = None;
        self.click.reset();
        self.context.clear_preview();
    }

    fn click_rect(&self, tool: &Tool, pos: Position, stroke_width: f32) -> Rect {
        let size = tool
            .click_behavior
            .as_ref()
            .and_then(|c| c.default_size)
            .unwrap_or(CLICK_SIZE);
        let origin = centered_origin(pos, size, self.context.page_size);
        expand_rect(
            &Rect::new(origin.x, origin.y, size.width, size.height),
            stroke_width / 2.0,
        )
    }

    fn commit(&self, tool: &Tool, rect: Rect, style: AnnotationStyle) {
        let object = self.context.new_object(tool, rect, self.shape.kind(), style);
        self.context.commit(object, None);
    }
}

impl PointerHandler for ShapeHandler {
    fn on_pointer_down(&mut self, pos: Position, event: &PointerEvent<'_>) {
        let pos = self.context.clamp(pos);
        self.start = Some(pos);
        self.click.on_start(pos);
        event.set_capture();
    }

    fn on_pointer_move(&mut self, pos: Position, _event: &PointerEvent<'_>) {
        let Some(start) = self.start else {
            return;
        };
        let pos = self.context.clamp(pos);
        self.click.on_move(pos);
        if !self.click.has_moved() {
            return;
        }
        let Some(tool) = self.context.tool() else {
            return;
        };
        let style = tool.defaults.resolve_style(base_style());
        let rect = expand_rect(&Rect::from_corners(start, pos), style.stroke_width / 2.0);
        self.context.preview(PreviewState {
            subtype: self.shape.subtype(),
            bounds: rect,
            data: PreviewData::Shape { rect, style },
        });
    }

    fn on_pointer_up(&mut self, pos: Position, event: &PointerEvent<'_>) {
        let Some(start) = self.start else {
            return;
        };
        event.release_capture();
        let Some(tool) = self.context.tool() else {
            self.reset();
            return;
        };
        let pos = self.context.clamp(pos);
        let style = tool.defaults.resolve_style(base_style());

        if self.click.on_end(tool.click_enabled()) {
            let rect = self.click_rect(&tool, pos, style.stroke_width);
            self.commit(&tool, rect, style);
        } else {
            let base = Rect::from_corners(start, pos);
            if base.size.width >= 1.0 && base.size.height >= 1.0 {
                let rect = expand_rect(&base, style.stroke_width / 2.0);
                self.commit(&tool, rect, style);
            } else {
                tracing::debug!(?base, "shape too small, not created");
            }
        }
        self.reset();
    }

    fn on_pointer_leave(&mut self, _pos: Position, event: &PointerEvent<'_>) {
        if self.start.is_some() {
            event.release_capture();
            self.reset();
        }
    }

    fn on_pointer_cancel(&mut self, _pos: Position, event: &PointerEvent<'_>) {
        if self.start.is_some() {
            event.release_capture();
            self.reset();
        }
    }
}
