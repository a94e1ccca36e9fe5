//! Annotation capability
//!
//! [`AnnotationPlugin`] is the public surface of the crate. It owns the
//! [`AnnotationState`] and the pending creation contexts, wraps every
//! mutation in a history [`Command`] when a history is attached, and runs
//! the commit protocol against the [`DocumentEngine`].
//!
//! Collaborator callbacks hold a weak reference to the plugin, and no
//! internal lock is held while a collaborator, history or listener runs.

use crate::commit::{commit_pending, CommitReport, PendingContexts};
use crate::config::AnnotationPluginConfig;
use crate::engine::{CreateContext, DocumentEngine, DocumentHandle, RenderOptions};
use crate::error::{AnnotationError, AnnotationResult};
use crate::events::{Emitter, SubscriptionId};
use crate::handlers::{
    DecodingServices, HandlerContext, HandlerRegistry, HandlerServices, PointerHandler,
    PreviewState,
};
use crate::history::{Command, FnCommand, History};
use crate::interaction::{InteractionManager, InteractionMode, ModeScope, SelectionProvider};
use crate::patching::{property_patch, transform_patch};
use crate::state::{AnnotationState, DeletedEntry};
use crate::tools::{Tool, ToolDefaults, ToolRegistry};
use crate::transform::TransformData;
use image::RgbaImage;
use parking_lot::Mutex;
use pdf_annotation_model::{
    AnnotationId, AnnotationKind, AnnotationObject, AnnotationPatch, AnnotationStyle, Color,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

/// Draft geometry reported by a creation handler on a page
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEvent {
    pub page_index: u32,
    /// `None` once the draft is discarded or committed
    pub preview: Option<PreviewState>,
}

/// Builder for [`AnnotationPlugin`]
pub struct AnnotationPluginBuilder {
    engine: Arc<dyn DocumentEngine>,
    config: AnnotationPluginConfig,
    history: Option<Arc<dyn History>>,
    interaction: Option<Arc<dyn InteractionManager>>,
    selection: Option<Arc<dyn SelectionProvider>>,
    services: Option<Arc<dyn HandlerServices>>,
    handlers: HandlerRegistry,
}

impl AnnotationPluginBuilder {
    pub fn config(mut self, config: AnnotationPluginConfig) -> Self {
        self.config = config;
        self
    }

    pub fn history(mut self, history: Arc<dyn History>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn interaction_manager(mut self, manager: Arc<dyn InteractionManager>) -> Self {
        self.interaction = Some(manager);
        self
    }

    pub fn selection(mut self, selection: Arc<dyn SelectionProvider>) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Services for handlers that need files or images; defaults to [`DecodingServices`]
    pub fn services(mut self, services: Arc<dyn HandlerServices>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn build(self) -> AnnotationPlugin {
        let tools = ToolRegistry::with_defaults(self.config.tools.clone());
        let state = AnnotationState::new(tools, self.config.presets());
        let shared = Arc::new(Shared {
            config: self.config,
            engine: self.engine,
            history: self.history,
            interaction: self.interaction,
            selection: self.selection,
            services: self
                .services
                .unwrap_or_else(|| Arc::new(DecodingServices::default())),
            handlers: self.handlers,
            state: Mutex::new(state),
            contexts: Mutex::new(PendingContexts::new()),
            document: Mutex::new(None),
            state_changed: Emitter::new(),
            active_tool_changed: Emitter::new(),
            preview_changed: Emitter::new(),
            commit_requested: AtomicBool::new(false),
            commit_signal: Notify::new(),
            commits_in_flight: AtomicUsize::new(0),
        });

        let tools: Vec<Tool> = shared.state.lock().tools().tools().to_vec();
        for tool in &tools {
            shared.register_mode(tool);
        }
        shared.connect();
        tracing::debug!(tools = tools.len(), "annotation plugin ready");

        AnnotationPlugin { inner: shared }
    }
}

struct Shared {
    config: AnnotationPluginConfig,
    engine: Arc<dyn DocumentEngine>,
    history: Option<Arc<dyn History>>,
    interaction: Option<Arc<dyn InteractionManager>>,
    selection: Option<Arc<dyn SelectionProvider>>,
    services: Arc<dyn HandlerServices>,
    handlers: HandlerRegistry,

    state: Mutex<AnnotationState>,
    contexts: Mutex<PendingContexts>,
    document: Mutex<Option<DocumentHandle>>,

    state_changed: Emitter<AnnotationState>,
    active_tool_changed: Emitter<Option<Tool>>,
    preview_changed: Emitter<PreviewEvent>,

    commit_requested: AtomicBool,
    commit_signal: Notify,
    commits_in_flight: AtomicUsize,
}

/// Decrements the in-flight commit count when dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    fn register_mode(&self, tool: &Tool) {
        let mode = &tool.interaction.mode;
        if let Some(interaction) = &self.interaction {
            interaction.register_mode(InteractionMode {
                id: mode.clone(),
                scope: ModeScope::Page,
                exclusive: tool.interaction.exclusive,
                cursor: tool.interaction.cursor.clone(),
            });
        }
        if tool.interaction.text_selection {
            if let Some(selection) = &self.selection {
                selection.enable_for_mode(mode);
            }
        }
    }

    fn connect(self: &Arc<Self>) {
        if let Some(history) = &self.history {
            let weak = Arc::downgrade(self);
            history.on_history_change(Arc::new(move |topic: &str| {
                if let Some(shared) = weak.upgrade() {
                    if topic == shared.config.history_topic && shared.config.auto_commit {
                        shared.request_commit();
                    }
                }
            }));
        }

        if let Some(interaction) = &self.interaction {
            let weak = Arc::downgrade(self);
            interaction.on_mode_change(Arc::new(move |mode: &str| {
                if let Some(shared) = weak.upgrade() {
                    shared.sync_active_tool(mode);
                }
            }));
        }

        if let Some(selection) = &self.selection {
            let weak = Arc::downgrade(self);
            selection.on_end_selection(Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.create_from_selection();
                }
            }));
        }
    }

    /// Apply `f` to the state, then publish a snapshot
    fn mutate<R>(&self, f: impl FnOnce(&mut AnnotationState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let result = f(&mut state);
            let snapshot = (!self.state_changed.is_empty()).then(|| state.clone());
            (result, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.state_changed.emit(&snapshot);
        }
        result
    }

    fn publish(&self) {
        self.mutate(|_| ());
    }

    fn emit_active_tool(&self) {
        let tool = self.state.lock().active_tool().cloned();
        self.active_tool_changed.emit(&tool);
    }

    fn sync_active_tool(&self, mode: &str) {
        let changed = self.mutate(|state| {
            let tool_id = state.tools().by_mode(mode).map(|t| t.id.clone());
            if state.active_tool_id() == tool_id.as_deref() {
                return false;
            }
            state.set_active_tool(tool_id.as_deref())
        });
        if changed {
            self.emit_active_tool();
        }
    }

    fn set_active_tool(&self, tool_id: Option<&str>) -> AnnotationResult<()> {
        let mode = {
            let state = self.state.lock();
            if state.active_tool_id() == tool_id {
                return Ok(());
            }
            match tool_id {
                Some(id) => Some(
                    state
                        .tools()
                        .get(id)
                        .map(|t| t.interaction.mode.clone())
                        .ok_or_else(|| AnnotationError::UnknownTool(id.to_string()))?,
                ),
                None => None,
            }
        };

        match (&self.interaction, mode) {
            (Some(interaction), Some(mode)) => interaction.activate(&mode),
            (Some(interaction), None) => interaction.activate_default_mode(),
            (None, _) => {
                if self.mutate(|state| state.set_active_tool(tool_id)) {
                    self.emit_active_tool();
                }
            }
        }
        Ok(())
    }

    fn request_commit(&self) {
        self.commit_requested.store(true, Ordering::SeqCst);
        self.commit_signal.notify_one();
    }

    /// Run a mutation through the history, or directly when there is none
    fn run(&self, execute: impl Fn() + Send + Sync + 'static, undo: impl Fn() + Send + Sync + 'static) {
        match &self.history {
            Some(history) => {
                let command: Arc<dyn Command> = Arc::new(FnCommand::new(execute, undo));
                history.register(command, &self.config.history_topic);
            }
            None => {
                execute();
                if self.config.auto_commit {
                    self.request_commit();
                }
            }
        }
    }

    fn create(self: &Arc<Self>, mut object: AnnotationObject, context: Option<CreateContext>) -> AnnotationId {
        if object.author.is_none() {
            object.author = self.config.author.clone();
        }
        let id = object.id;

        let weak = Arc::downgrade(self);
        let execute = move || {
            let Some(shared) = weak.upgrade() else { return };
            if let Some(context) = &context {
                shared.contexts.lock().insert(id, context.clone());
            }
            let object = object.clone();
            shared.mutate(move |state| state.create(object));
        };

        let weak = Arc::downgrade(self);
        let undo = move || {
            let Some(shared) = weak.upgrade() else { return };
            shared.contexts.lock().remove(&id);
            shared.mutate(|state| state.delete(id));
        };

        self.run(execute, undo);
        id
    }

    fn live_object(&self, id: AnnotationId) -> Option<AnnotationObject> {
        self.state.lock().annotation(id).map(|t| t.object.clone())
    }

    fn update(self: &Arc<Self>, id: AnnotationId, original: &AnnotationObject, patch: AnnotationPatch) {
        let inverse = patch.inverse(original);

        let weak = Arc::downgrade(self);
        let execute = move || {
            if let Some(shared) = weak.upgrade() {
                shared.mutate(|state| state.patch(id, &patch));
            }
        };

        let weak = Arc::downgrade(self);
        let undo = move || {
            if let Some(shared) = weak.upgrade() {
                shared.mutate(|state| state.patch(id, &inverse));
            }
        };

        self.run(execute, undo);
    }

    fn delete(self: &Arc<Self>, id: AnnotationId) {
        let removed: Arc<Mutex<Option<DeletedEntry>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(self);
        let slot = Arc::clone(&removed);
        let execute = move || {
            if let Some(shared) = weak.upgrade() {
                let entry = shared.mutate(|state| state.delete(id));
                *slot.lock() = entry;
            }
        };

        let weak = Arc::downgrade(self);
        let undo = move || {
            let Some(shared) = weak.upgrade() else { return };
            let entry = removed.lock().take();
            if let Some(entry) = entry {
                shared.mutate(move |state| state.restore(entry));
            }
        };

        self.run(execute, undo);
    }

    /// Creation policy for objects committed by a pointer handler
    fn create_from_handler(self: &Arc<Self>, tool_id: &str, object: AnnotationObject, context: Option<CreateContext>) {
        let behavior = self
            .state
            .lock()
            .tools()
            .get(tool_id)
            .map(|t| t.behavior)
            .unwrap_or_default();

        let id = self.create(object, context);

        if behavior
            .select_after_create
            .unwrap_or(self.config.select_after_create)
        {
            self.mutate(|state| state.select(id));
        }
        if behavior.commit_after_create.unwrap_or(self.config.auto_commit) {
            self.request_commit();
        }
        if self.config.deactivate_tool_after_create {
            if let Err(err) = self.set_active_tool(None) {
                tracing::warn!("failed to deactivate tool: {}", err);
            }
        }
    }

    fn create_from_selection(self: &Arc<Self>) {
        let Some(tool) = self.state.lock().active_tool().cloned() else {
            return;
        };
        if !tool.interaction.text_selection {
            return;
        }
        let Some(selection) = &self.selection else {
            return;
        };

        let style = tool.defaults.resolve_style(AnnotationStyle::default());
        for formatted in selection.get_formatted_selection() {
            let Some(kind) = AnnotationKind::text_markup(tool.subtype, formatted.segment_rects) else {
                tracing::debug!(tool = %tool.id, "tool subtype is not a text markup");
                continue;
            };
            let mut object =
                AnnotationObject::new(formatted.page_index, formatted.rect, kind, style.clone());
            object.intent = tool.defaults.intent.clone();
            object.contents = tool.defaults.contents.clone();
            self.create(object, None);
        }
        selection.clear();
    }
}

/// Annotation authoring and synchronization capability
#[derive(Clone)]
pub struct AnnotationPlugin {
    inner: Arc<Shared>,
}

impl AnnotationPlugin {
    pub fn builder(engine: Arc<dyn DocumentEngine>) -> AnnotationPluginBuilder {
        AnnotationPluginBuilder {
            engine,
            config: AnnotationPluginConfig::default(),
            history: None,
            interaction: None,
            selection: None,
            services: None,
            handlers: HandlerRegistry::default(),
        }
    }

    /// Plugin with the default configuration and no collaborators
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self::builder(engine).build()
    }

    pub fn config(&self) -> &AnnotationPluginConfig {
        &self.inner.config
    }

    // Document lifecycle

    /// Open `doc` and load its annotations as synced
    pub async fn load_document(&self, doc: DocumentHandle) -> AnnotationResult<()> {
        let pages = self.inner.engine.get_all_annotations(&doc).await?;
        let count: usize = pages.values().map(Vec::len).sum();
        tracing::info!(document = %doc.id, annotations = count, "annotations loaded");

        *self.inner.document.lock() = Some(doc);
        self.inner.contexts.lock().clear();
        self.inner.mutate(move |state| state.set_annotations(pages));
        Ok(())
    }

    pub fn close_document(&self) {
        *self.inner.document.lock() = None;
        self.inner.contexts.lock().clear();
        self.inner.commit_requested.store(false, Ordering::SeqCst);
        self.inner.mutate(|state| state.clear_annotations());
    }

    pub fn document(&self) -> Option<DocumentHandle> {
        self.inner.document.lock().clone()
    }

    // State

    /// Snapshot of the current state
    pub fn state(&self) -> AnnotationState {
        self.inner.state.lock().clone()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.inner.state.lock().has_pending_changes()
    }

    pub fn get_annotation(&self, id: AnnotationId) -> Option<AnnotationObject> {
        self.inner.live_object(id)
    }

    /// Locally tracked annotations of a page, in page order
    pub fn page_annotations(&self, page_index: u32) -> Vec<AnnotationObject> {
        self.inner
            .state
            .lock()
            .page_annotations(page_index)
            .into_iter()
            .map(|t| t.object.clone())
            .collect()
    }

    pub fn get_selected_annotation(&self) -> Option<AnnotationObject> {
        self.inner.state.lock().selected().map(|t| t.object.clone())
    }

    pub fn select_annotation(&self, id: AnnotationId) -> bool {
        self.inner.mutate(|state| state.select(id))
    }

    pub fn deselect_annotation(&self) {
        self.inner.mutate(|state| state.deselect());
    }

    // Tools

    pub fn get_active_tool(&self) -> Option<Tool> {
        self.inner.state.lock().active_tool().cloned()
    }

    /// Activate a tool by id, or clear the active tool with `None`
    ///
    /// With an interaction manager attached, the tool becomes active once
    /// the manager reports the mode change.
    pub fn set_active_tool(&self, tool_id: Option<&str>) -> AnnotationResult<()> {
        self.inner.set_active_tool(tool_id)
    }

    pub fn get_tools(&self) -> Vec<Tool> {
        self.inner.state.lock().tools().tools().to_vec()
    }

    pub fn get_tool(&self, tool_id: &str) -> Option<Tool> {
        self.inner.state.lock().tools().get(tool_id).cloned()
    }

    /// Register a tool at runtime, replacing any tool with the same id
    pub fn register_tool(&self, tool: Tool) {
        self.inner.register_mode(&tool);
        self.inner.mutate(move |state| state.register_tool(tool));
    }

    pub fn set_tool_defaults(&self, tool_id: &str, patch: &ToolDefaults) -> AnnotationResult<()> {
        let (found, is_active) = self.inner.mutate(|state| {
            let found = state.set_tool_defaults(tool_id, patch);
            (found, state.active_tool_id() == Some(tool_id))
        });
        if !found {
            return Err(AnnotationError::UnknownTool(tool_id.to_string()));
        }
        if is_active {
            self.inner.emit_active_tool();
        }
        Ok(())
    }

    pub fn find_tool_for_annotation(&self, object: &AnnotationObject) -> Option<Tool> {
        self.inner
            .state
            .lock()
            .tools()
            .find_tool_for_annotation(object)
            .cloned()
    }

    // Color presets

    pub fn get_color_presets(&self) -> Vec<Color> {
        self.inner.state.lock().color_presets().to_vec()
    }

    pub fn add_color_preset(&self, color: Color) -> bool {
        self.inner.mutate(|state| state.add_color_preset(color))
    }

    // Mutations

    /// Track a new annotation; returns its id
    pub fn create_annotation(&self, object: AnnotationObject, context: Option<CreateContext>) -> AnnotationId {
        self.inner.create(object, context)
    }

    /// Patch a live annotation
    ///
    /// Point-based geometry changes without an explicit rect get their
    /// bounds recomputed. Returns false for unknown or deleted ids.
    pub fn update_annotation(&self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        let Some(original) = self.inner.live_object(id) else {
            return false;
        };
        let patch = property_patch(&original, patch);
        if patch.is_empty() {
            return false;
        }
        self.inner.update(id, &original, patch);
        true
    }

    pub fn delete_annotation(&self, id: AnnotationId) -> bool {
        if self.inner.live_object(id).is_none() {
            return false;
        }
        self.inner.delete(id);
        true
    }

    /// Apply the result of a finished move, resize or vertex edit
    pub fn apply_transform(&self, id: AnnotationId, transform: &TransformData) -> bool {
        let Some(original) = self.inner.live_object(id) else {
            return false;
        };
        let patch = transform_patch(&original, transform);
        if patch.is_empty() {
            return false;
        }
        self.inner.update(id, &original, patch);
        true
    }

    // Creation handlers

    /// Pointer handler for the active tool on a page
    pub fn create_handler(&self, page_index: u32, scale: f32) -> AnnotationResult<Box<dyn PointerHandler>> {
        let page_size = self
            .inner
            .document
            .lock()
            .as_ref()
            .ok_or_else(|| AnnotationError::NotFound("document".to_string()))?
            .page(page_index)
            .map(|p| p.size)
            .ok_or_else(|| AnnotationError::NotFound(format!("page {}", page_index)))?;

        let tool = self
            .get_active_tool()
            .ok_or_else(|| AnnotationError::NotFound("active tool".to_string()))?;
        if !self.inner.handlers.supports(tool.subtype) {
            return Err(AnnotationError::UnknownTool(format!(
                "{} has no creation handler",
                tool.id
            )));
        }

        let tool_id = tool.id.clone();
        let weak: Weak<Shared> = Arc::downgrade(&self.inner);
        let get_tool = {
            let weak = weak.clone();
            let tool_id = tool_id.clone();
            Arc::new(move || {
                let shared = weak.upgrade()?;
                let tool = shared.state.lock().tools().get(&tool_id).cloned();
                tool
            })
        };
        let on_preview = {
            let weak = weak.clone();
            Arc::new(move |preview: Option<PreviewState>| {
                if let Some(shared) = weak.upgrade() {
                    shared
                        .preview_changed
                        .emit(&PreviewEvent { page_index, preview });
                }
            })
        };
        let on_commit = Arc::new(move |object: AnnotationObject, context: Option<CreateContext>| {
            if let Some(shared) = weak.upgrade() {
                shared.create_from_handler(&tool_id, object, context);
            }
        });

        let context = HandlerContext {
            get_tool,
            page_index,
            page_size,
            scale,
            services: Arc::clone(&self.inner.services),
            on_preview,
            on_commit,
        };
        self.inner
            .handlers
            .create(tool.subtype, context)
            .ok_or_else(|| AnnotationError::UnknownTool(tool.id.clone()))
    }

    // Engine-facing queries

    /// Annotations of a page as the engine currently holds them
    pub async fn get_page_annotations(&self, page_index: u32) -> AnnotationResult<Vec<AnnotationObject>> {
        let doc = self.require_document()?;
        let page = doc
            .page(page_index)
            .ok_or_else(|| AnnotationError::NotFound(format!("page {}", page_index)))?;
        Ok(self.inner.engine.get_page_annotations(&doc, page).await?)
    }

    pub async fn render_annotation(&self, id: AnnotationId, options: RenderOptions) -> AnnotationResult<RgbaImage> {
        let object = self
            .inner
            .state
            .lock()
            .annotation(id)
            .map(|t| t.engine_object())
            .ok_or_else(|| AnnotationError::NotFound(format!("annotation {}", id)))?;
        let doc = self.require_document()?;
        let page = doc
            .page(object.page_index)
            .ok_or_else(|| AnnotationError::NotFound(format!("page {}", object.page_index)))?;
        Ok(self
            .inner
            .engine
            .render_page_annotation(&doc, page, &object, options)
            .await?)
    }

    fn require_document(&self) -> AnnotationResult<DocumentHandle> {
        self.document()
            .ok_or_else(|| AnnotationError::NotFound("document".to_string()))
    }

    // Commit

    /// Push every pending change to the engine
    ///
    /// Per-item failures are reported in the returned [`CommitReport`] and
    /// retried by the next commit.
    pub async fn commit(&self) -> AnnotationResult<CommitReport> {
        if !self.has_pending_changes() {
            tracing::debug!("nothing to commit");
            return Ok(CommitReport::default());
        }
        let doc = self.require_document()?;

        let inner = &self.inner;
        if inner.commits_in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            tracing::warn!("commit started while another commit is in flight");
        }
        let _in_flight = InFlight(&inner.commits_in_flight);

        let report = commit_pending(&inner.state, &inner.contexts, inner.engine.as_ref(), &doc).await;
        inner.publish();
        Ok(report)
    }

    /// Commit if a commit has been requested since the last flush
    pub async fn flush(&self) -> AnnotationResult<Option<CommitReport>> {
        if !self.inner.commit_requested.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.commit().await.map(Some)
    }

    pub fn commit_requested(&self) -> bool {
        self.inner.commit_requested.load(Ordering::SeqCst)
    }

    /// Serve commit requests until the returned future is dropped
    pub async fn run_auto_commit(&self) {
        loop {
            self.inner.commit_signal.notified().await;
            match self.flush().await {
                Ok(Some(report)) if !report.is_success() => {
                    tracing::warn!(failures = report.failures.len(), "auto commit left failures");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("auto commit failed: {}", err),
            }
        }
    }

    // Events

    pub fn on_state_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&AnnotationState) + Send + Sync + 'static,
    {
        self.inner.state_changed.subscribe(listener)
    }

    pub fn on_active_tool_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Option<Tool>) + Send + Sync + 'static,
    {
        self.inner.active_tool_changed.subscribe(listener)
    }

    pub fn on_preview<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PreviewEvent) + Send + Sync + 'static,
    {
        self.inner.preview_changed.subscribe(listener)
    }

    /// Remove a listener registered with any of the `on_*` methods
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.state_changed.unsubscribe(id)
            || self.inner.active_tool_changed.unsubscribe(id)
            || self.inner.preview_changed.unsubscribe(id)
    }
}
