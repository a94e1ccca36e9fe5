//! Plugin configuration

use crate::error::{AnnotationError, AnnotationResult};
use crate::state::default_color_presets;
use crate::tools::Tool;
use pdf_annotation_model::Color;
use serde::{Deserialize, Serialize};

/// Default history topic for annotation commands
pub const ANNOTATION_HISTORY_TOPIC: &str = "annotations";

/// Configuration for the annotation plugin
#[derive(Debug, Clone)]
pub struct AnnotationPluginConfig {
    /// Caller tools, replacing built-in tools with the same id
    pub tools: Vec<Tool>,

    /// Color presets; `None` uses the built-in palette
    pub color_presets: Option<Vec<Color>>,

    /// Commit to the engine after every mutation
    pub auto_commit: bool,

    /// Select an annotation once a handler creates it
    pub select_after_create: bool,

    /// Clear the active tool once a handler creates an annotation
    pub deactivate_tool_after_create: bool,

    /// Author stamped on created annotations
    pub author: Option<String>,

    pub history_topic: String,
}

impl Default for AnnotationPluginConfig {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            color_presets: None,
            auto_commit: true,
            select_after_create: true,
            deactivate_tool_after_create: false,
            author: None,
            history_topic: ANNOTATION_HISTORY_TOPIC.to_string(),
        }
    }
}

impl AnnotationPluginConfig {
    pub fn presets(&self) -> Vec<Color> {
        self.color_presets
            .clone()
            .unwrap_or_else(default_color_presets)
    }

    /// Overlay settings loaded from a settings file
    pub fn apply_settings(&mut self, settings: &AnnotationSettings) -> AnnotationResult<()> {
        if let Some(hexes) = &settings.color_presets {
            let colors = hexes
                .iter()
                .map(|hex| {
                    Color::from_hex(hex).map_err(|e| AnnotationError::InvalidConfig(e.to_string()))
                })
                .collect::<AnnotationResult<Vec<_>>>()?;
            self.color_presets = Some(colors);
        }
        self.auto_commit = settings.auto_commit;
        self.select_after_create = settings.select_after_create;
        self.deactivate_tool_after_create = settings.deactivate_tool_after_create;
        if settings.author.is_some() {
            self.author = settings.author.clone();
        }
        Ok(())
    }
}

/// Serializable subset of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    pub auto_commit: bool,
    pub select_after_create: bool,
    pub deactivate_tool_after_create: bool,
    pub author: Option<String>,
    /// Hex colors such as `#E44234`
    pub color_presets: Option<Vec<String>>,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        let config = AnnotationPluginConfig::default();
        Self {
            auto_commit: config.auto_commit,
            select_after_create: config.select_after_create,
            deactivate_tool_after_create: config.deactivate_tool_after_create,
            author: None,
            color_presets: None,
        }
    }
}

impl AnnotationSettings {
    pub fn from_json(json: &str) -> AnnotationResult<Self> {
        serde_json::from_str(json).map_err(|e| AnnotationError::InvalidConfig(e.to_string()))
    }

    pub fn to_json(&self) -> AnnotationResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnnotationError::InvalidConfig(e.to_string()))
    }
}
