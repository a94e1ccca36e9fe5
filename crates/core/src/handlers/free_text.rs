//! Free text box creation

use super::{centered_origin, HandlerContext, PointerEvent, PointerHandler, PreviewData, PreviewState};
use crate::click::ClickDetector;
use crate::tools::Tool;
use pdf_annotation_model::{AnnotationKind, AnnotationStyle, AnnotationSubtype, Position, Rect, Size};

pub const DEFAULT_FREE_TEXT_CONTENTS: &str = "Insert text here";

const CLICK_SIZE: Size = Size {
    width: 100.0,
    height: 20.0,
};

pub struct FreeTextHandler {
    context: HandlerContext,
    start: Option<Position>,
    click: ClickDetector,
}

pub(super) fn free_text_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(FreeTextHandler {
        context,
        start: None,
        click: ClickDetector::default(),
    })
}

impl FreeTextHandler {
    fn preview_rect(&self, tool: &Tool, rect: Rect) {
        let opacity = tool.defaults.opacity.unwrap_or(1.0);
        self.context.preview(PreviewState {
            subtype: AnnotationSubtype::FreeText,
            bounds: rect,
            data: PreviewData::FreeText {
                rect,
                style: tool.defaults.free_text_style(),
                opacity,
            },
        });
    }

    fn commit(&self, tool: &Tool, rect: Rect, contents: String) {
        let style = tool.defaults.resolve_style(AnnotationStyle::default());
        let kind = AnnotationKind::FreeText {
            style: tool.defaults.free_text_style(),
        };
        let mut object = self.context.new_object(tool, rect, kind, style);
        object.contents = Some(contents);
        self.context.commit(object, None);
    }

    fn reset(&mut self) {
        self.start = None;
        self.click.reset();
        self.context.clear_preview();
    }
}

impl PointerHandler for FreeTextHandler {
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
        if let Some(tool) = self.context.tool() {
            self.preview_rect(&tool, Rect::from_corners(start, pos));
        }
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
        let default_contents = tool
            .defaults
            .contents
            .clone()
            .unwrap_or_else(|| DEFAULT_FREE_TEXT_CONTENTS.to_string());

        if self.click.on_end(tool.click_enabled()) {
            let click = tool.click_behavior.as_ref();
            let size = click.and_then(|c| c.default_size).unwrap_or(CLICK_SIZE);
            let origin = centered_origin(pos, size, self.context.page_size);
            let contents = click
                .and_then(|c| c.default_content.clone())
                .unwrap_or(default_contents);
            self.commit(
                &tool,
                Rect::new(origin.x, origin.y, size.width, size.height),
                contents,
            );
        } else {
            let rect = Rect::from_corners(start, pos);
            if rect.size.width >= 1.0 && rect.size.height >= 1.0 {
                self.commit(&tool, rect, default_contents);
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
