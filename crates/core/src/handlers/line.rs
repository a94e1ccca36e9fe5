//! Straight line creation

use super::{HandlerContext, PointerEvent, PointerHandler, PreviewData, PreviewState};
use crate::click::ClickDetector;
use crate::tools::Tool;
use pdf_annotation_model::{
    line_rect_with_endings, AnnotationKind, AnnotationStyle, AnnotationSubtype, Color, Position,
};

/// Minimum extent along either axis for a dragged line
const MIN_LINE_EXTENT: f32 = 2.0;
const CLICK_LENGTH: f32 = 100.0;

fn base_style() -> AnnotationStyle {
    AnnotationStyle {
        color: Color::TRANSPARENT,
        stroke_color: Color::BLACK,
        stroke_width: 1.0,
        ..Default::default()
    }
}

pub struct LineHandler {
    context: HandlerContext,
    start: Option<Position>,
    click: ClickDetector,
}

pub(super) fn line_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(LineHandler {
        context,
        start: None,
        click: ClickDetector::default(),
    })
}

impl LineHandler {
    fn reset(&mut self) {
        self.start = None;
        self.click.reset();
        self.context.clear_preview();
    }

    /// Endpoints of a click-created line centered on `pos`
    fn click_endpoints(&self, tool: &Tool, pos: Position) -> (Position, Position) {
        let click = tool.click_behavior.as_ref();
        let length = click.and_then(|c| c.default_length).unwrap_or(CLICK_LENGTH);
        let angle = click
            .and_then(|c| c.default_angle)
            .unwrap_or(0.0)
            .to_radians();
        let (dx, dy) = (angle.cos() * length / 2.0, angle.sin() * length / 2.0);
        (
            self.context.clamp(pos.offset(-dx, -dy)),
            self.context.clamp(pos.offset(dx, dy)),
        )
    }

    fn commit(&self, tool: &Tool, start: Position, end: Position) {
        let style = tool.defaults.resolve_style(base_style());
        let line_endings = tool.defaults.line_endings.unwrap_or_default();
        let rect = line_rect_with_endings(&[start, end], style.stroke_width, Some(&line_endings));
        let kind = AnnotationKind::Line {
            start,
            end,
            line_endings,
        };
        let object = self.context.new_object(tool, rect, kind, style);
        self.context.commit(object, None);
    }
}

impl PointerHandler for LineHandler {
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
        let end = self.context.clamp(pos);
        self.click.on_move(end);
        if !self.click.has_moved() {
            return;
        }
        let Some(tool) = self.context.tool() else {
            return;
        };
        let style = tool.defaults.resolve_style(base_style());
        let line_endings = tool.defaults.line_endings.unwrap_or_default();
        self.context.preview(PreviewState {
            subtype: AnnotationSubtype::Line,
            bounds: line_rect_with_endings(&[start, end], style.stroke_width, Some(&line_endings)),
            data: PreviewData::Line {
                start,
                end,
                line_endings,
                style,
            },
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
        let end = self.context.clamp(pos);

        if self.click.on_end(tool.click_enabled()) {
            let (start, end) = self.click_endpoints(&tool, end);
            self.commit(&tool, start, end);
        } else if (end.x - start.x).abs() >= MIN_LINE_EXTENT || (end.y - start.y).abs() >= MIN_LINE_EXTENT {
            self.commit(&tool, start, end);
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

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, Recorder};
    use super::*;
    use crate::tools::{default_tools, ClickBehavior};
    use pdf_annotation_model::{LineEnding, Size};
    use std::sync::Arc;

    fn tool(id: &str) -> Tool {
        default_tools().into_iter().find(|t| t.id == id).unwrap()
    }

    fn endpoints(kind: &AnnotationKind) -> (Position, Position) {
        match kind {
            AnnotationKind::Line { start, end, .. } => (*start, *end),
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_drag_creates_line() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = line_handler(context(tool("line"), Size::new(800.0, 600.0), &recorder));
        handler.on_pointer_down(Position::new(10.0, 10.0), &PointerEvent::default());
        handler.on_pointer_move(Position::new(60.0, 30.0), &PointerEvent::default());
        handler.on_pointer_up(Position::new(110.0, 60.0), &PointerEvent::default());

        let committed = recorder.committed();
        assert_eq!(committed.len(), 1);
        assert_eq!(
            endpoints(&committed[0].kind),
            (Position::new(10.0, 10.0), Position::new(110.0, 60.0))
        );
        let rect = committed[0].rect;
        assert!(rect.origin.x < 10.0 && rect.right() > 110.0);
    }

    #[test]
    fn test_click_creates_centered_line() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = line_handler(context(tool("line"), Size::new(800.0, 600.0), &recorder));
        let pos = Position::new(400.0, 300.0);
        handler.on_pointer_down(pos, &PointerEvent::default());
        handler.on_pointer_up(pos, &PointerEvent::default());

        let (start, end) = endpoints(&recorder.committed()[0].kind);
        assert!((start.x - 350.0).abs() < 0.001 && (start.y - 300.0).abs() < 0.001);
        assert!((end.x - 450.0).abs() < 0.001 && (end.y - 300.0).abs() < 0.001);
    }

    #[test]
    fn test_click_line_clamped_at_page_edge() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = line_handler(context(tool("line"), Size::new(800.0, 600.0), &recorder));
        let pos = Position::new(10.0, 300.0);
        handler.on_pointer_down(pos, &PointerEvent::default());
        handler.on_pointer_up(pos, &PointerEvent::default());

        let (start, _) = endpoints(&recorder.committed()[0].kind);
        assert_eq!(start.x, 0.0);
    }

    #[test]
    fn test_tiny_drag_without_click_is_dropped() {
        let line = tool("line").with_click_behavior(ClickBehavior::default());
        let recorder = Arc::new(Recorder::default());
        let mut handler = line_handler(context(line, Size::new(800.0, 600.0), &recorder));
        handler.on_pointer_down(Position::new(10.0, 10.0), &PointerEvent::default());
        handler.on_pointer_up(Position::new(11.0, 11.5), &PointerEvent::default());
        assert!(recorder.committed().is_empty());
    }

    #[test]
    fn test_arrow_carries_intent_and_endings() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = line_handler(context(tool("lineArrow"), Size::new(800.0, 600.0), &recorder));
        handler.on_pointer_down(Position::new(10.0, 10.0), &PointerEvent::default());
        handler.on_pointer_move(Position::new(100.0, 10.0), &PointerEvent::default());
        handler.on_pointer_up(Position::new(100.0, 10.0), &PointerEvent::default());

        let committed = recorder.committed();
        assert!(committed[0].has_intent("LineArrow"));
        match &committed[0].kind {
            AnnotationKind::Line { line_endings, .. } => {
                assert_eq!(line_endings.end, LineEnding::OpenArrow)
            }
            _ => panic!("expected a line"),
        }
    }
}
