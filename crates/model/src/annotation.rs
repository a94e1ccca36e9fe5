//! Annotation data model
//!
//! An [`AnnotationObject`] is the serializable payload exchanged with the
//! document engine. Geometry lives in [`AnnotationKind`], whose variant
//! also determines the annotation subtype.

use crate::color::Color;
use crate::geometry::{expand_rect, rect_from_points, Position, Rect};
use crate::line_ending::{line_rect_with_endings, LineEndings};
use serde::{Deserialize, Serialize};

/// Unique identifier for an annotation
///
/// Stable across the document lifetime. Generated using UUID v4.
pub type AnnotationId = uuid::Uuid;

/// Annotation subtype tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationSubtype {
    Highlight,
    Underline,
    Strikeout,
    Squiggly,
    Ink,
    Circle,
    Square,
    Line,
    Polyline,
    Polygon,
    FreeText,
    Stamp,
}

impl AnnotationSubtype {
    /// Text markup subtypes are created from a text selection, not by drawing
    pub fn is_text_markup(&self) -> bool {
        matches!(
            self,
            AnnotationSubtype::Highlight
                | AnnotationSubtype::Underline
                | AnnotationSubtype::Strikeout
                | AnnotationSubtype::Squiggly
        )
    }
}

/// One continuous ink stroke
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InkStroke {
    pub points: Vec<Position>,
}

impl InkStroke {
    pub fn new(points: Vec<Position>) -> Self {
        Self { points }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Beveled,
    Inset,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationFlag {
    Hidden,
    Print,
    NoView,
    ReadOnly,
    Locked,
}

/// Font settings of a free text box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeTextStyle {
    pub font_size: f32,
    pub font_color: Color,
    pub font_family: String,
    pub background_color: Color,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
}

impl Default for FreeTextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            font_color: Color::BLACK,
            font_family: "Helvetica".to_string(),
            background_color: Color::TRANSPARENT,
            text_align: TextAlign::Left,
            vertical_align: VerticalAlign::Top,
        }
    }
}

/// Type-specific geometry and configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationKind {
    Highlight { segment_rects: Vec<Rect> },
    Underline { segment_rects: Vec<Rect> },
    Strikeout { segment_rects: Vec<Rect> },
    Squiggly { segment_rects: Vec<Rect> },
    Ink { ink_list: Vec<InkStroke> },
    Circle,
    Square,
    Line {
        start: Position,
        end: Position,
        line_endings: LineEndings,
    },
    Polyline {
        vertices: Vec<Position>,
        line_endings: LineEndings,
    },
    Polygon { vertices: Vec<Position> },
    FreeText { style: FreeTextStyle },
    Stamp { icon: String, subject: String },
}

impl AnnotationKind {
    pub fn subtype(&self) -> AnnotationSubtype {
        match self {
            AnnotationKind::Highlight { .. } => AnnotationSubtype::Highlight,
            AnnotationKind::Underline { .. } => AnnotationSubtype::Underline,
            AnnotationKind::Strikeout { .. } => AnnotationSubtype::Strikeout,
            AnnotationKind::Squiggly { .. } => AnnotationSubtype::Squiggly,
            AnnotationKind::Ink { .. } => AnnotationSubtype::Ink,
            AnnotationKind::Circle => AnnotationSubtype::Circle,
            AnnotationKind::Square => AnnotationSubtype::Square,
            AnnotationKind::Line { .. } => AnnotationSubtype::Line,
            AnnotationKind::Polyline { .. } => AnnotationSubtype::Polyline,
            AnnotationKind::Polygon { .. } => AnnotationSubtype::Polygon,
            AnnotationKind::FreeText { .. } => AnnotationSubtype::FreeText,
            AnnotationKind::Stamp { .. } => AnnotationSubtype::Stamp,
        }
    }

    /// Markup kind for a subtype, if the subtype is a text markup
    pub fn text_markup(subtype: AnnotationSubtype, segment_rects: Vec<Rect>) -> Option<Self> {
        match subtype {
            AnnotationSubtype::Highlight => Some(AnnotationKind::Highlight { segment_rects }),
            AnnotationSubtype::Underline => Some(AnnotationKind::Underline { segment_rects }),
            AnnotationSubtype::Strikeout => Some(AnnotationKind::Strikeout { segment_rects }),
            AnnotationSubtype::Squiggly => Some(AnnotationKind::Squiggly { segment_rects }),
            _ => None,
        }
    }
}

/// Visual styling shared by all subtypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    /// Interior color for shapes, markup color otherwise
    pub color: Color,
    pub stroke_color: Color,
    /// Opacity (0.0 = transparent, 1.0 = opaque)
    pub opacity: f32,
    pub stroke_width: f32,
    pub stroke_style: BorderStyle,
    /// Dash pattern (empty for a solid line)
    pub stroke_dash_array: Vec<f32>,
    pub blend_mode: BlendMode,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            stroke_color: Color::BLACK,
            opacity: 1.0,
            stroke_width: 1.0,
            stroke_style: BorderStyle::Solid,
            stroke_dash_array: Vec::new(),
            blend_mode: BlendMode::Normal,
        }
    }
}

/// The annotation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationObject {
    pub id: AnnotationId,
    /// Page index this annotation belongs to (0-based)
    pub page_index: u32,
    pub rect: Rect,
    pub kind: AnnotationKind,
    pub style: AnnotationStyle,
    /// Discriminating tag such as `LineArrow` or `InkHighlight`
    pub intent: Option<String>,
    pub contents: Option<String>,
    pub author: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created: i64,
    pub flags: Vec<AnnotationFlag>,
}

impl AnnotationObject {
    /// Create a new annotation with a generated id and the current timestamp
    pub fn new(page_index: u32, rect: Rect, kind: AnnotationKind, style: AnnotationStyle) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            page_index,
            rect,
            kind,
            style,
            intent: None,
            contents: None,
            author: None,
            created: now_millis(),
            flags: vec![AnnotationFlag::Print],
        }
    }

    pub fn subtype(&self) -> AnnotationSubtype {
        self.kind.subtype()
    }

    pub fn has_intent(&self, intent: &str) -> bool {
        self.intent.as_deref() == Some(intent)
    }

    /// Builder-style intent setter
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }
}

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Recompute the rect implied by an annotation's geometry
///
/// Markup, shapes, free text and stamps carry their real rect already.
pub fn derive_rect(object: &AnnotationObject) -> Rect {
    let stroke_width = object.style.stroke_width;
    match &object.kind {
        AnnotationKind::Ink { ink_list } => {
            let points: Vec<Position> = ink_list
                .iter()
                .flat_map(|stroke| stroke.points.iter().copied())
                .collect();
            expand_rect(&rect_from_points(&points), stroke_width / 2.0)
        }
        AnnotationKind::Line {
            start,
            end,
            line_endings,
        } => line_rect_with_endings(&[*start, *end], stroke_width, Some(line_endings)),
        AnnotationKind::Polyline {
            vertices,
            line_endings,
        } => line_rect_with_endings(vertices, stroke_width, Some(line_endings)),
        AnnotationKind::Polygon { vertices } => {
            expand_rect(&rect_from_points(vertices), stroke_width / 2.0)
        }
        _ => object.rect,
    }
}
