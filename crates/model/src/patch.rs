//! Partial updates to annotation objects
//!
//! Every field is optional; `None` leaves the corresponding field of the
//! target untouched. Nullable fields use `Option<Option<_>>` so a patch can
//! clear them.

use crate::annotation::{AnnotationKind, AnnotationObject, BlendMode, BorderStyle};
use crate::color::Color;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationPatch {
    pub rect: Option<Rect>,
    pub kind: Option<AnnotationKind>,
    pub color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub opacity: Option<f32>,
    pub stroke_width: Option<f32>,
    pub stroke_style: Option<BorderStyle>,
    pub stroke_dash_array: Option<Vec<f32>>,
    pub blend_mode: Option<BlendMode>,
    pub intent: Option<Option<String>>,
    pub contents: Option<Option<String>>,
    pub author: Option<Option<String>>,
}

impl AnnotationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn with_kind(mut self, kind: AnnotationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: f32) -> Self {
        self.stroke_width = Some(stroke_width);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_contents(mut self, contents: Option<String>) -> Self {
        self.contents = Some(contents);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch changes anything the derived rect depends on
    pub fn affects_geometry(&self) -> bool {
        self.kind.is_some() || self.stroke_width.is_some()
    }

    /// Merge the patch into an object
    pub fn apply(&self, object: &mut AnnotationObject) {
        if let Some(rect) = self.rect {
            object.rect = rect;
        }
        if let Some(kind) = &self.kind {
            object.kind = kind.clone();
        }
        if let Some(color) = self.color {
            object.style.color = color;
        }
        if let Some(stroke_color) = self.stroke_color {
            object.style.stroke_color = stroke_color;
        }
        if let Some(opacity) = self.opacity {
            object.style.opacity = opacity;
        }
        if let Some(stroke_width) = self.stroke_width {
            object.style.stroke_width = stroke_width;
        }
        if let Some(stroke_style) = self.stroke_style {
            object.style.stroke_style = stroke_style;
        }
        if let Some(dash) = &self.stroke_dash_array {
            object.style.stroke_dash_array = dash.clone();
        }
        if let Some(blend_mode) = self.blend_mode {
            object.style.blend_mode = blend_mode;
        }
        if let Some(intent) = &self.intent {
            object.intent = intent.clone();
        }
        if let Some(contents) = &self.contents {
            object.contents = contents.clone();
        }
        if let Some(author) = &self.author {
            object.author = author.clone();
        }
    }

    /// Apply to a copy of `object`
    pub fn applied_to(&self, object: &AnnotationObject) -> AnnotationObject {
        let mut next = object.clone();
        self.apply(&mut next);
        next
    }

    /// Patch restoring exactly the fields this patch touches to their values in `original`
    pub fn inverse(&self, original: &AnnotationObject) -> AnnotationPatch {
        let style = &original.style;
        AnnotationPatch {
            rect: self.rect.map(|_| original.rect),
            kind: self.kind.as_ref().map(|_| original.kind.clone()),
            color: self.color.map(|_| style.color),
            stroke_color: self.stroke_color.map(|_| style.stroke_color),
            opacity: self.opacity.map(|_| style.opacity),
            stroke_width: self.stroke_width.map(|_| style.stroke_width),
            stroke_style: self.stroke_style.map(|_| style.stroke_style),
            stroke_dash_array: self
                .stroke_dash_array
                .as_ref()
                .map(|_| style.stroke_dash_array.clone()),
            blend_mode: self.blend_mode.map(|_| style.blend_mode),
            intent: self.intent.as_ref().map(|_| original.intent.clone()),
            contents: self.contents.as_ref().map(|_| original.contents.clone()),
            author: self.author.as_ref().map(|_| original.author.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationStyle;

    fn square() -> AnnotationObject {
        AnnotationObject::new(
            0,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            AnnotationKind::Square,
            AnnotationStyle::default(),
        )
    }

    #[test]
    fn test_apply_only_touches_set_fields() {
        let original = square();
        let patch = AnnotationPatch::new().with_color(Color::RED).with_opacity(0.5);
        let patched = patch.applied_to(&original);

        assert_eq!(patched.style.color, Color::RED);
        assert_eq!(patched.style.opacity, 0.5);
        assert_eq!(patched.rect, original.rect);
        assert_eq!(patched.style.stroke_color, original.style.stroke_color);
    }

    #[test]
    fn test_inverse_restores_original() {
        let original = square().with_contents("note");
        let patch = AnnotationPatch::new()
            .with_rect(Rect::new(5.0, 5.0, 20.0, 20.0))
            .with_contents(None);
        let patched = patch.applied_to(&original);
        let inverse = patch.inverse(&original);

        assert!(inverse.color.is_none());
        assert_eq!(inverse.applied_to(&patched), original);
    }

    #[test]
    fn test_empty_patch() {
        assert!(AnnotationPatch::new().is_empty());
        assert!(!AnnotationPatch::new().with_stroke_width(2.0).is_empty());
        assert!(AnnotationPatch::new().with_stroke_width(2.0).affects_geometry());
    }
}
