//! Annotation data model
//!
//! Serializable annotation payloads and the page-space geometry helpers
//! shared by the authoring engine and document engines.

pub mod annotation;
pub mod color;
pub mod geometry;
pub mod line_ending;
pub mod patch;

pub use annotation::{
    derive_rect, now_millis, AnnotationFlag, AnnotationId, AnnotationKind, AnnotationObject,
    AnnotationStyle, AnnotationSubtype, BlendMode, BorderStyle, FreeTextStyle, InkStroke,
    TextAlign, VerticalAlign,
};
pub use color::{Color, ColorParseError};
pub use geometry::{expand_rect, rect_from_points, rotate_and_translate_point, Position, Rect, Size};
pub use line_ending::{line_rect_with_endings, LineEnding, LineEndings};
pub use patch::AnnotationPatch;
