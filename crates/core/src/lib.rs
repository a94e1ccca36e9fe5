//! Annotation authoring and synchronization
//!
//! Pointer gestures become annotation objects through per-type creation
//! handlers, existing annotations are moved, resized and vertex-edited by
//! the transform engine, and every local change is tracked until the
//! commit protocol has pushed it to the document engine.

pub mod click;
pub mod commit;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod history;
pub mod interaction;
pub mod patching;
pub mod plugin;
pub mod state;
pub mod tools;
pub mod transform;

pub use click::{ClickDetector, DEFAULT_CLICK_THRESHOLD};
pub use commit::{commit_pending, CommitReport, PendingContexts};
pub use config::{AnnotationPluginConfig, AnnotationSettings, ANNOTATION_HISTORY_TOPIC};
pub use engine::{
    CreateContext, DocumentEngine, DocumentHandle, DocumentId, EngineResult, PageInfo,
    RenderOptions,
};
pub use error::{AnnotationError, AnnotationResult, EngineError};
pub use events::{Emitter, SubscriptionId};
pub use handlers::{
    HandlerContext, HandlerRegistry, HandlerServices, Modifiers, PointerCapture, PointerEvent,
    PointerHandler, PreviewData, PreviewState,
};
pub use history::{Command, CommandHistory, FnCommand, History, HistoryListener};
pub use interaction::{
    FormattedSelection, InteractionManager, InteractionMode, ModeScope, SelectionProvider,
};
pub use patching::{property_patch, transform_patch};
pub use plugin::{AnnotationPlugin, AnnotationPluginBuilder, PreviewEvent};
pub use state::{AnnotationState, CommitState, DeletedEntry, TrackedAnnotation};
pub use tools::{
    default_tools, ClickBehavior, MatchRule, Tool, ToolBehavior, ToolDefaults, ToolInteraction,
    ToolRegistry,
};
pub use transform::{
    DragResizeConfig, DragResizeController, ResizeHandle, TransformChanges, TransformData,
    TransformKind, TransformMetadata,
};
