//! Annotation tools
//!
//! A [`Tool`] binds default style attributes and an interaction mode to an
//! annotation subtype. The [`ToolRegistry`] keeps tools in registration
//! order and resolves which tool best explains an existing annotation.

mod defaults;

pub use defaults::default_tools;

use pdf_annotation_model::{
    AnnotationObject, AnnotationStyle, AnnotationSubtype, BlendMode, BorderStyle, Color,
    FreeTextStyle, LineEndings, Size, TextAlign, VerticalAlign,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Scoring function for custom matching
pub type MatchFn = Arc<dyn Fn(&AnnotationObject) -> u32 + Send + Sync>;

/// How a tool scores an existing annotation
///
/// Scores are 0 for no match, low for a generic subtype match and higher
/// when a discriminating intent also matches.
#[derive(Clone)]
pub enum MatchRule {
    /// Score when the subtype matches
    Subtype(AnnotationSubtype, u32),
    /// Score when the subtype matches and the intent equals the tag
    WithIntent(AnnotationSubtype, String, u32),
    /// Score when the subtype matches and the intent differs from the tag
    WithoutIntent(AnnotationSubtype, String, u32),
    /// Never matches
    Never,
    Custom(MatchFn),
}

impl MatchRule {
    pub fn score(&self, object: &AnnotationObject) -> u32 {
        match self {
            MatchRule::Subtype(subtype, score) => {
                if object.subtype() == *subtype {
                    *score
                } else {
                    0
                }
            }
            MatchRule::WithIntent(subtype, intent, score) => {
                if object.subtype() == *subtype && object.has_intent(intent) {
                    *score
                } else {
                    0
                }
            }
            MatchRule::WithoutIntent(subtype, intent, score) => {
                if object.subtype() == *subtype && !object.has_intent(intent) {
                    *score
                } else {
                    0
                }
            }
            MatchRule::Never => 0,
            MatchRule::Custom(score) => score(object),
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Subtype(subtype, score) => {
                f.debug_tuple("Subtype").field(subtype).field(score).finish()
            }
            MatchRule::WithIntent(subtype, intent, score) => f
                .debug_tuple("WithIntent")
                .field(subtype)
                .field(intent)
                .field(score)
                .finish(),
            MatchRule::WithoutIntent(subtype, intent, score) => f
                .debug_tuple("WithoutIntent")
                .field(subtype)
                .field(intent)
                .field(score)
                .finish(),
            MatchRule::Never => f.write_str("Never"),
            MatchRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Partial annotation attributes applied to newly created annotations
///
/// Every field is optional so a patch passed to
/// [`ToolRegistry::set_tool_defaults`] only overrides what it names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolDefaults {
    pub color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub opacity: Option<f32>,
    pub stroke_width: Option<f32>,
    pub stroke_style: Option<BorderStyle>,
    pub stroke_dash_array: Option<Vec<f32>>,
    pub blend_mode: Option<BlendMode>,
    pub intent: Option<String>,
    pub contents: Option<String>,
    pub line_endings: Option<LineEndings>,
    pub font_size: Option<f32>,
    pub font_color: Option<Color>,
    pub font_family: Option<String>,
    pub background_color: Option<Color>,
    pub text_align: Option<TextAlign>,
    pub vertical_align: Option<VerticalAlign>,
    pub icon: Option<String>,
    pub subject: Option<String>,
    /// Stamp image source; when unset the stamp tool asks for a file
    pub image_src: Option<String>,
    /// Placed stamp size; defaults to the decoded image size
    pub image_size: Option<Size>,
}

impl ToolDefaults {
    /// Overlay every field set in `patch`
    pub fn merge(&mut self, patch: &ToolDefaults) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() {
                    self.$field = patch.$field.clone();
                })*
            };
        }
        overlay!(
            color,
            stroke_color,
            opacity,
            stroke_width,
            stroke_style,
            stroke_dash_array,
            blend_mode,
            intent,
            contents,
            line_endings,
            font_size,
            font_color,
            font_family,
            background_color,
            text_align,
            vertical_align,
            icon,
            subject,
            image_src,
            image_size
        );
    }

    /// Resolve the style, falling back to `base` for unset fields
    pub fn resolve_style(&self, base: AnnotationStyle) -> AnnotationStyle {
        AnnotationStyle {
            color: self.color.unwrap_or(base.color),
            stroke_color: self.stroke_color.unwrap_or(base.stroke_color),
            opacity: self.opacity.unwrap_or(base.opacity),
            stroke_width: self.stroke_width.unwrap_or(base.stroke_width),
            stroke_style: self.stroke_style.unwrap_or(base.stroke_style),
            stroke_dash_array: self
                .stroke_dash_array
                .clone()
                .unwrap_or(base.stroke_dash_array),
            blend_mode: self.blend_mode.unwrap_or(base.blend_mode),
        }
    }

    pub fn free_text_style(&self) -> FreeTextStyle {
        let base = FreeTextStyle::default();
        FreeTextStyle {
            font_size: self.font_size.unwrap_or(base.font_size),
            font_color: self.font_color.unwrap_or(base.font_color),
            font_family: self.font_family.clone().unwrap_or(base.font_family),
            background_color: self.background_color.unwrap_or(base.background_color),
            text_align: self.text_align.unwrap_or(base.text_align),
            vertical_align: self.vertical_align.unwrap_or(base.vertical_align),
        }
    }
}

/// What a plain click (no drag) creates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickBehavior {
    pub enabled: bool,
    /// Box size for shapes and free text
    pub default_size: Option<Size>,
    /// Line length for line tools
    pub default_length: Option<f32>,
    /// Line angle in degrees
    pub default_angle: Option<f32>,
    pub default_content: Option<String>,
}

impl ClickBehavior {
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            enabled: true,
            default_size: Some(Size::new(width, height)),
            ..Default::default()
        }
    }

    pub fn line(length: f32, angle: f32) -> Self {
        Self {
            enabled: true,
            default_length: Some(length),
            default_angle: Some(angle),
            ..Default::default()
        }
    }
}

/// Interaction mode binding of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInteraction {
    pub mode: String,
    pub exclusive: bool,
    pub cursor: Option<String>,
    /// Mode is driven by text selection rather than drawing
    pub text_selection: bool,
    pub is_draggable: bool,
    pub is_resizable: bool,
    pub lock_aspect_ratio: bool,
}

impl ToolInteraction {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            exclusive: false,
            cursor: Some("crosshair".to_string()),
            text_selection: false,
            is_draggable: true,
            is_resizable: true,
            lock_aspect_ratio: false,
        }
    }
}

/// Per-tool overrides of the plugin creation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolBehavior {
    pub select_after_create: Option<bool>,
    pub commit_after_create: Option<bool>,
}

/// Declarative annotation tool
#[derive(Debug, Clone)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub subtype: AnnotationSubtype,
    pub match_rule: MatchRule,
    pub defaults: ToolDefaults,
    pub interaction: ToolInteraction,
    pub click_behavior: Option<ClickBehavior>,
    pub behavior: ToolBehavior,
}

impl Tool {
    /// Tool matching its subtype with score 1 and an interaction mode named after its id
    pub fn new(id: impl Into<String>, name: impl Into<String>, subtype: AnnotationSubtype) -> Self {
        let id = id.into();
        Self {
            interaction: ToolInteraction::new(id.clone()),
            id,
            name: name.into(),
            subtype,
            match_rule: MatchRule::Subtype(subtype, 1),
            defaults: ToolDefaults::default(),
            click_behavior: None,
            behavior: ToolBehavior::default(),
        }
    }

    pub fn with_match_rule(mut self, rule: MatchRule) -> Self {
        self.match_rule = rule;
        self
    }

    pub fn with_defaults(mut self, defaults: ToolDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_click_behavior(mut self, click: ClickBehavior) -> Self {
        self.click_behavior = Some(click);
        self
    }

    pub fn with_interaction(mut self, interaction: ToolInteraction) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn with_behavior(mut self, behavior: ToolBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn match_score(&self, object: &AnnotationObject) -> u32 {
        self.match_rule.score(object)
    }

    pub fn click_enabled(&self) -> bool {
        self.click_behavior.as_ref().is_some_and(|c| c.enabled)
    }
}

/// Ordered tool list
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Tool>) -> Self {
        let mut registry = Self { tools: Vec::new() };
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// The built-in tools followed by caller tools
    pub fn with_defaults(extra: Vec<Tool>) -> Self {
        let mut registry = Self::new(default_tools());
        for tool in extra {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool; a tool with the same id is replaced in place
    pub fn register(&mut self, tool: Tool) {
        match self.tools.iter_mut().find(|t| t.id == tool.id) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn by_mode(&self, mode: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.interaction.mode == mode)
    }

    /// Merge a defaults patch into a tool; returns false for an unknown id
    pub fn set_tool_defaults(&mut self, id: &str, patch: &ToolDefaults) -> bool {
        match self.tools.iter_mut().find(|t| t.id == id) {
            Some(tool) => {
                tool.defaults.merge(patch);
                true
            }
            None => false,
        }
    }

    /// Tool with the strictly highest positive score
    ///
    /// Ties go to the tool registered first.
    pub fn find_tool_for_annotation(&self, object: &AnnotationObject) -> Option<&Tool> {
        let mut best: Option<(&Tool, u32)> = None;
        for tool in &self.tools {
            let score = tool.match_score(object);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((tool, score));
            }
        }
        best.map(|(tool, _)| tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
