//! Freehand ink creation
//!
//! Strokes accumulate until the pen has been idle for [`INK_COMMIT_DELAY`];
//! all strokes drawn in that window form one annotation. The handler has no
//! timer of its own, the host drives it through [`PointerHandler::poll`].

use super::{HandlerContext, PointerEvent, PointerHandler, PreviewData, PreviewState};
use pdf_annotation_model::{
    expand_rect, rect_from_points, AnnotationKind, AnnotationStyle, AnnotationSubtype, Color,
    InkStroke, Position, Rect,
};
use std::time::{Duration, Instant};

/// Idle time after the last stroke before the drawing is committed
pub const INK_COMMIT_DELAY: Duration = Duration::from_millis(800);

fn base_style() -> AnnotationStyle {
    AnnotationStyle {
        color: Color::BLACK,
        stroke_width: 1.0,
        ..Default::default()
    }
}

pub struct InkHandler {
    context: HandlerContext,
    strokes: Vec<InkStroke>,
    drawing: bool,
    deadline: Option<Instant>,
}

pub(super) fn ink_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(InkHandler {
        context,
        strokes: Vec::new(),
        drawing: false,
        deadline: None,
    })
}

impl InkHandler {
    fn bounds(&self, stroke_width: f32) -> Rect {
        let points: Vec<Position> = self
            .strokes
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        expand_rect(&rect_from_points(&points), stroke_width / 2.0)
    }

    fn update_preview(&self) {
        if self.strokes.first().map_or(true, |s| s.points.is_empty()) {
            return;
        }
        let Some(tool) = self.context.tool() else {
            return;
        };
        let style = tool.defaults.resolve_style(base_style());
        self.context.preview(PreviewState {
            subtype: AnnotationSubtype::Ink,
            bounds: self.bounds(style.stroke_width),
            data: PreviewData::Ink {
                strokes: self.strokes.clone(),
                style,
            },
        });
    }

    fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
        self.deadline = None;
        self.context.clear_preview();
    }

    fn commit(&mut self) {
        let drawable = self.strokes.first().is_some_and(|s| s.points.len() > 1);
        if drawable {
            if let Some(tool) = self.context.tool() {
                let style = tool.defaults.resolve_style(base_style());
                let rect = self.bounds(style.stroke_width);
                let kind = AnnotationKind::Ink {
                    ink_list: std::mem::take(&mut self.strokes),
                };
                let object = self.context.new_object(&tool, rect, kind, style);
                self.context.commit(object, None);
            }
        }
        self.clear();
    }

    /// Deadline of the pending commit, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl PointerHandler for InkHandler {
    fn on_pointer_down(&mut self, pos: Position, event: &PointerEvent<'_>) {
        let pos = self.context.clamp(pos);
        self.drawing = true;
        self.deadline = None;
        self.strokes.push(InkStroke::new(vec![pos]));
        self.update_preview();
        event.set_capture();
    }

    fn on_pointer_move(&mut self, pos: Position, _event: &PointerEvent<'_>) {
        if !self.drawing {
            return;
        }
        let pos = self.context.clamp(pos);
        let Some(stroke) = self.strokes.last_mut() else {
            return;
        };
        stroke.points.push(pos);
        self.update_preview();
    }

    fn on_pointer_up(&mut self, _pos: Position, event: &PointerEvent<'_>) {
        self.drawing = false;
        event.release_capture();
        if !self.strokes.is_empty() {
            self.deadline = Some(Instant::now() + INK_COMMIT_DELAY);
        }
    }

    fn on_pointer_leave(&mut self, _pos: Position, event: &PointerEvent<'_>) {
        if self.drawing {
            event.release_capture();
        }
        self.clear();
    }

    fn on_pointer_cancel(&mut self, _pos: Position, event: &PointerEvent<'_>) {
        event.release_capture();
        self.clear();
    }

    fn poll(&mut self, now: Instant) {
        match self.deadline {
            Some(deadline) if now >= deadline => self.commit(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, Recorder};
    use super::*;
    use crate::tools::{default_tools, Tool};
    use pdf_annotation_model::Size;
    use std::sync::Arc;

    fn pen() -> Tool {
        default_tools().into_iter().find(|t| t.id == "ink").unwrap()
    }

    fn stroke(handler: &mut Box<dyn PointerHandler>, points: &[(f32, f32)]) {
        let (x, y) = points[0];
        handler.on_pointer_down(Position::new(x, y), &PointerEvent::default());
        for &(x, y) in &points[1..] {
            handler.on_pointer_move(Position::new(x, y), &PointerEvent::default());
        }
        let (x, y) = points[points.len() - 1];
        handler.on_pointer_up(Position::new(x, y), &PointerEvent::default());
    }

    #[test]
    fn test_strokes_merge_into_one_annotation() {
        let mut tool = pen();
        tool.defaults.stroke_width = Some(4.0);
        let recorder = Arc::new(Recorder::default());
        let mut handler = ink_handler(context(tool, Size::new(800.0, 600.0), &recorder));

        stroke(&mut handler, &[(10.0, 10.0), (20.0, 20.0), (30.0, 15.0)]);
        handler.poll(Instant::now());
        assert!(recorder.committed().is_empty());

        stroke(&mut handler, &[(40.0, 40.0), (50.0, 60.0)]);
        handler.poll(Instant::now() + INK_COMMIT_DELAY + Duration::from_millis(10));

        let committed = recorder.committed();
        assert_eq!(committed.len(), 1);
        match &committed[0].kind {
            AnnotationKind::Ink { ink_list } => {
                assert_eq!(ink_list.len(), 2);
                assert_eq!(ink_list[0].points.len(), 3);
            }
            other => panic!("expected ink, got {:?}", other),
        }
        assert_eq!(committed[0].rect, Rect::new(8.0, 8.0, 44.0, 54.0));
    }

    #[test]
    fn test_single_point_is_discarded() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = ink_handler(context(pen(), Size::new(800.0, 600.0), &recorder));
        stroke(&mut handler, &[(10.0, 10.0)]);
        handler.poll(Instant::now() + INK_COMMIT_DELAY * 2);
        assert!(recorder.committed().is_empty());
        assert!(recorder.previews.lock().last().unwrap().is_none());
    }

    #[test]
    fn test_pointer_down_postpones_commit() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = ink_handler(context(pen(), Size::new(800.0, 600.0), &recorder));
        stroke(&mut handler, &[(10.0, 10.0), (20.0, 20.0)]);
        handler.on_pointer_down(Position::new(30.0, 30.0), &PointerEvent::default());
        handler.poll(Instant::now() + INK_COMMIT_DELAY * 2);
        assert!(recorder.committed().is_empty());
    }

    #[test]
    fn test_cancel_drops_strokes() {
        let recorder = Arc::new(Recorder::default());
        let mut handler = ink_handler(context(pen(), Size::new(800.0, 600.0), &recorder));
        stroke(&mut handler, &[(10.0, 10.0), (20.0, 20.0)]);
        handler.on_pointer_cancel(Position::new(20.0, 20.0), &PointerEvent::default());
        handler.poll(Instant::now() + INK_COMMIT_DELAY * 2);
        assert!(recorder.committed().is_empty());
    }

    #[test]
    fn test_highlighter_intent_applied() {
        let tool = default_tools()
            .into_iter()
            .find(|t| t.id == "inkHighlighter")
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut handler = ink_handler(context(tool, Size::new(800.0, 600.0), &recorder));
        stroke(&mut handler, &[(10.0, 10.0), (20.0, 20.0)]);
        handler.poll(Instant::now() + INK_COMMIT_DELAY * 2);
        assert!(recorder.committed()[0].has_intent("InkHighlight"));
    }
}
