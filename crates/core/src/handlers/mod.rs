//! Per-type creation handlers
//!
//! A handler is a small state machine built for one page and one tool. It
//! consumes pointer lifecycle events, reports transient [`PreviewState`]s
//! while a gesture is in progress and hands a finished annotation to the
//! commit callback. Handlers are created through [`HandlerRegistry`], a
//! lookup table keyed by annotation subtype.

mod free_text;
mod ink;
mod line;
mod polygon;
pub mod services;
mod shape;
mod stamp;

pub use free_text::DEFAULT_FREE_TEXT_CONTENTS;
pub use ink::INK_COMMIT_DELAY;
pub use polygon::HANDLE_SIZE_PX;
pub use services::{
    DecodingServices, FileRequest, HandlerServices, ImageRequest, ImageSource, ProcessedImage,
    SelectedFile, STAMP_IMAGE_ACCEPT,
};
pub use stamp::{DEFAULT_STAMP_ICON, DEFAULT_STAMP_SUBJECT};

use crate::engine::CreateContext;
use crate::tools::Tool;
use pdf_annotation_model::{
    AnnotationKind, AnnotationObject, AnnotationStyle, AnnotationSubtype, FreeTextStyle,
    InkStroke, LineEndings, Position, Rect, Size,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Keyboard modifiers held during a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer capture owned by the UI element that dispatched the event
pub trait PointerCapture {
    fn set_pointer_capture(&self);
    fn release_pointer_capture(&self);
}

/// Pointer event details passed alongside the page-space position
#[derive(Clone, Copy, Default)]
pub struct PointerEvent<'a> {
    pub modifiers: Modifiers,
    pub capture: Option<&'a dyn PointerCapture>,
}

impl<'a> PointerEvent<'a> {
    pub fn with_capture(capture: &'a dyn PointerCapture) -> Self {
        Self {
            modifiers: Modifiers::default(),
            capture: Some(capture),
        }
    }

    pub fn set_capture(&self) {
        if let Some(capture) = self.capture {
            capture.set_pointer_capture();
        }
    }

    pub fn release_capture(&self) {
        if let Some(capture) = self.capture {
            capture.release_pointer_capture();
        }
    }
}

/// Uniform pointer interface implemented by every creation handler
///
/// All callbacks default to no-ops so handlers only implement the events
/// they react to.
pub trait PointerHandler: Send {
    fn on_pointer_down(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_pointer_move(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_pointer_up(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_pointer_leave(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_pointer_cancel(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_click(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}
    fn on_double_click(&mut self, _pos: Position, _event: &PointerEvent<'_>) {}

    /// Drive time-based behavior such as delayed commits
    fn poll(&mut self, _now: Instant) {}
}

/// Type-specific draft payload of a preview
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewData {
    Shape {
        rect: Rect,
        style: AnnotationStyle,
    },
    Line {
        start: Position,
        end: Position,
        line_endings: LineEndings,
        style: AnnotationStyle,
    },
    Polyline {
        vertices: Vec<Position>,
        current_vertex: Position,
        line_endings: LineEndings,
        style: AnnotationStyle,
    },
    Polygon {
        vertices: Vec<Position>,
        current_vertex: Position,
        style: AnnotationStyle,
    },
    Ink {
        strokes: Vec<InkStroke>,
        style: AnnotationStyle,
    },
    FreeText {
        rect: Rect,
        style: FreeTextStyle,
        opacity: f32,
    },
}

/// Transient draft geometry of an in-progress gesture
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    pub subtype: AnnotationSubtype,
    pub bounds: Rect,
    pub data: PreviewData,
}

pub type ToolSource = Arc<dyn Fn() -> Option<Tool> + Send + Sync>;
pub type PreviewSink = Arc<dyn Fn(Option<PreviewState>) + Send + Sync>;
pub type CommitSink = Arc<dyn Fn(AnnotationObject, Option<CreateContext>) + Send + Sync>;

/// Everything a handler needs from its surroundings
#[derive(Clone)]
pub struct HandlerContext {
    /// Current tool, read on every event so runtime default changes apply
    pub get_tool: ToolSource,
    pub page_index: u32,
    pub page_size: Size,
    pub scale: f32,
    pub services: Arc<dyn HandlerServices>,
    pub on_preview: PreviewSink,
    pub on_commit: CommitSink,
}

impl HandlerContext {
    pub fn tool(&self) -> Option<Tool> {
        (self.get_tool)()
    }

    /// Clamp a position to the page rect
    pub fn clamp(&self, pos: Position) -> Position {
        pos.clamp_to(&self.page_size)
    }

    pub fn preview(&self, preview: PreviewState) {
        (self.on_preview)(Some(preview));
    }

    pub fn clear_preview(&self) {
        (self.on_preview)(None);
    }

    pub fn commit(&self, object: AnnotationObject, context: Option<CreateContext>) {
        (self.on_commit)(object, context);
    }

    /// New annotation on this page carrying the tool's intent and contents defaults
    pub fn new_object(&self, tool: &Tool, rect: Rect, kind: AnnotationKind, style: AnnotationStyle) -> AnnotationObject {
        let mut object = AnnotationObject::new(self.page_index, rect, kind, style);
        object.intent = tool.defaults.intent.clone();
        object.contents = tool.defaults.contents.clone();
        object
    }
}

/// Clamp `value` into `[min, max]`, preferring `min` when the range is empty
pub(crate) fn clamp_range(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}

/// Origin that centers `size` on `pos` while keeping it on the page
pub(crate) fn centered_origin(pos: Position, size: Size, page: Size) -> Position {
    Position::new(
        clamp_range(pos.x - size.width / 2.0, 0.0, page.width - size.width),
        clamp_range(pos.y - size.height / 2.0, 0.0, page.height - size.height),
    )
}

pub type HandlerFactory = fn(HandlerContext) -> Box<dyn PointerHandler>;

/// Lookup table from annotation subtype to handler factory
#[derive(Clone)]
pub struct HandlerRegistry {
    factories: HashMap<AnnotationSubtype, HandlerFactory>,
}

impl HandlerRegistry {
    /// Registry with no factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, subtype: AnnotationSubtype, factory: HandlerFactory) {
        self.factories.insert(subtype, factory);
    }

    pub fn supports(&self, subtype: AnnotationSubtype) -> bool {
        self.factories.contains_key(&subtype)
    }

    /// Build a handler; `None` for subtypes without a drawing handler
    pub fn create(&self, subtype: AnnotationSubtype, context: HandlerContext) -> Option<Box<dyn PointerHandler>> {
        self.factories.get(&subtype).map(|factory| factory(context))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(AnnotationSubtype::Circle, shape::circle_handler);
        registry.register(AnnotationSubtype::Square, shape::square_handler);
        registry.register(AnnotationSubtype::Line, line::line_handler);
        registry.register(AnnotationSubtype::Polyline, polygon::polyline_handler);
        registry.register(AnnotationSubtype::Polygon, polygon::polygon_handler);
        registry.register(AnnotationSubtype::Ink, ink::ink_handler);
        registry.register(AnnotationSubtype::FreeText, free_text::free_text_handler);
        registry.register(AnnotationSubtype::Stamp, stamp::stamp_handler);
        registry
    }
}
