//! Interaction-mode and text-selection collaborators

use pdf_annotation_model::Rect;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeScope {
    /// Pointer events are routed to page layers
    Page,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionMode {
    pub id: String,
    pub scope: ModeScope,
    pub exclusive: bool,
    pub cursor: Option<String>,
}

pub type ModeListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Arbiter of the active pointer mode
pub trait InteractionManager: Send + Sync {
    fn register_mode(&self, mode: InteractionMode);
    fn activate(&self, mode: &str);
    fn activate_default_mode(&self);
    /// The listener receives the id of the newly active mode
    fn on_mode_change(&self, listener: ModeListener);
}

/// Text selected on one page
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedSelection {
    pub page_index: u32,
    /// Bounding rect of the selection
    pub rect: Rect,
    /// One rect per selected line fragment
    pub segment_rects: Vec<Rect>,
}

pub type SelectionListener = Arc<dyn Fn() + Send + Sync>;

pub trait SelectionProvider: Send + Sync {
    /// Called when the user finishes a selection
    fn on_end_selection(&self, listener: SelectionListener);
    fn get_formatted_selection(&self) -> Vec<FormattedSelection>;
    fn clear(&self);
    fn enable_for_mode(&self, mode: &str);
}
