//! Drag, resize and vertex-edit geometry
//!
//! [`DragResizeController`] turns raw screen-space pointer positions into
//! page-space geometry changes for an existing annotation. It accounts for
//! page rotation and zoom scale, enforces size and bounding-box constraints
//! and can lock the aspect ratio while resizing.
//!
//! The controller holds no UI references and performs no I/O. Every state
//! transition is reported through a single update callback.

use pdf_annotation_model::{Position, Rect, Size};
use serde::{Deserialize, Serialize};

/// Resize handle on the bounding box of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Nw,
    Ne,
    Sw,
    Se,
    N,
    E,
    S,
    W,
}

impl ResizeHandle {
    pub const CORNERS: [ResizeHandle; 4] =
        [ResizeHandle::Nw, ResizeHandle::Ne, ResizeHandle::Sw, ResizeHandle::Se];
    pub const SIDES: [ResizeHandle; 4] =
        [ResizeHandle::N, ResizeHandle::S, ResizeHandle::W, ResizeHandle::E];

    /// Handle moves the left edge
    pub fn moves_left(&self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Sw | ResizeHandle::W)
    }

    /// Handle moves the right edge
    pub fn moves_right(&self) -> bool {
        matches!(self, ResizeHandle::Ne | ResizeHandle::Se | ResizeHandle::E)
    }

    /// Handle moves the top edge
    pub fn moves_top(&self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::Ne | ResizeHandle::N)
    }

    /// Handle moves the bottom edge
    pub fn moves_bottom(&self) -> bool {
        matches!(self, ResizeHandle::Sw | ResizeHandle::Se | ResizeHandle::S)
    }

    pub fn is_side(&self) -> bool {
        Self::SIDES.contains(self)
    }

    /// CSS cursor name for this handle on a page rotated by `rotation` quarter turns
    ///
    /// Diagonal cursors swap on odd quarter turns; side cursors never change.
    pub fn cursor(&self, rotation: u8) -> &'static str {
        match self {
            ResizeHandle::N | ResizeHandle::S => "ns-resize",
            ResizeHandle::E | ResizeHandle::W => "ew-resize",
            ResizeHandle::Nw | ResizeHandle::Se if rotation % 2 == 0 => "nwse-resize",
            ResizeHandle::Ne | ResizeHandle::Sw if rotation % 2 == 0 => "nesw-resize",
            ResizeHandle::Nw | ResizeHandle::Se => "nesw-resize",
            ResizeHandle::Ne | ResizeHandle::Sw => "nwse-resize",
        }
    }
}

/// Size and placement limits applied on every move and resize
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Constraints {
    /// Minimum width (defaults to 1 when unset)
    pub min_width: Option<f32>,
    /// Minimum height (defaults to 1 when unset)
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    /// Page bounds; the element origin is kept within `[0, bounding_box - size]`
    pub bounding_box: Option<Size>,
}

impl Constraints {
    /// Constraints keeping an element on a page of the given size
    pub fn page(size: Size) -> Self {
        Self {
            bounding_box: Some(size),
            ..Default::default()
        }
    }
}

/// Configuration of a transform controller
#[derive(Debug, Clone, PartialEq)]
pub struct DragResizeConfig {
    /// Current rect of the element in page space
    pub element: Rect,
    /// Current vertices for vertex editing
    pub vertices: Vec<Position>,
    pub constraints: Option<Constraints>,
    pub maintain_aspect_ratio: bool,
    /// Page rotation in quarter turns (0..=3)
    pub page_rotation: u8,
    /// Zoom scale between screen and page units
    pub scale: f32,
}

impl DragResizeConfig {
    pub fn new(element: Rect) -> Self {
        Self {
            element,
            vertices: Vec::new(),
            constraints: None,
            maintain_aspect_ratio: false,
            page_rotation: 0,
            scale: 1.0,
        }
    }
}

/// Partial update to a [`DragResizeConfig`]
#[derive(Debug, Clone, Default)]
pub struct DragResizeConfigUpdate {
    pub element: Option<Rect>,
    pub vertices: Option<Vec<Position>>,
    pub constraints: Option<Option<Constraints>>,
    pub maintain_aspect_ratio: Option<bool>,
    pub page_rotation: Option<u8>,
    pub scale: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Dragging,
    Resizing,
    VertexEditing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformKind {
    Move,
    Resize,
    VertexEdit,
}

/// Geometry produced by a transform step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformChanges {
    pub rect: Option<Rect>,
    pub vertices: Option<Vec<Position>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformMetadata {
    pub handle: Option<ResizeHandle>,
    pub vertex_index: Option<usize>,
    pub maintain_aspect_ratio: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformData {
    pub kind: TransformKind,
    pub changes: TransformChanges,
    pub metadata: TransformMetadata,
}

impl TransformData {
    fn rect(kind: TransformKind, rect: Rect, metadata: TransformMetadata) -> Self {
        Self {
            kind,
            changes: TransformChanges {
                rect: Some(rect),
                vertices: None,
            },
            metadata,
        }
    }

    fn vertices(vertices: Vec<Position>, vertex_index: usize) -> Self {
        Self {
            kind: TransformKind::VertexEdit,
            changes: TransformChanges {
                rect: None,
                vertices: Some(vertices),
            },
            metadata: TransformMetadata {
                vertex_index: Some(vertex_index),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Start,
    Move,
    End,
}

/// Notification emitted on every controller state transition
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEvent {
    pub phase: EventPhase,
    pub transform: TransformData,
}

pub type TransformListener = Box<dyn FnMut(InteractionEvent) + Send>;

/// Pure geometric controller for move, resize and vertex-edit gestures
pub struct DragResizeController {
    config: DragResizeConfig,
    on_update: TransformListener,
    state: InteractionState,
    start_point: Option<Position>,
    start_element: Option<Rect>,
    active_handle: Option<ResizeHandle>,
    current_position: Option<Rect>,
    active_vertex_index: Option<usize>,
    start_vertices: Vec<Position>,
    current_vertices: Vec<Position>,
}

impl DragResizeController {
    pub fn new(config: DragResizeConfig, on_update: impl FnMut(InteractionEvent) + Send + 'static) -> Self {
        let current_vertices = config.vertices.clone();
        Self {
            config,
            on_update: Box::new(on_update),
            state: InteractionState::Idle,
            start_point: None,
            start_element: None,
            active_handle: None,
            current_position: None,
            active_vertex_index: None,
            start_vertices: Vec::new(),
            current_vertices,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn config(&self) -> &DragResizeConfig {
        &self.config
    }

    /// Merge a partial configuration update
    pub fn update_config(&mut self, update: DragResizeConfigUpdate) {
        if let Some(element) = update.element {
            self.config.element = element;
        }
        if let Some(vertices) = update.vertices {
            self.config.vertices = vertices;
        }
        if let Some(constraints) = update.constraints {
            self.config.constraints = constraints;
        }
        if let Some(maintain) = update.maintain_aspect_ratio {
            self.config.maintain_aspect_ratio = maintain;
        }
        if let Some(rotation) = update.page_rotation {
            self.config.page_rotation = rotation;
        }
        if let Some(scale) = update.scale {
            self.config.scale = scale;
        }
        self.current_vertices = self.config.vertices.clone();
    }

    /// Begin moving the whole element
    pub fn start_drag(&mut self, client_x: f32, client_y: f32) {
        self.state = InteractionState::Dragging;
        self.start_point = Some(Position::new(client_x, client_y));
        self.start_element = Some(self.config.element);
        self.current_position = Some(self.config.element);

        let data = TransformData::rect(TransformKind::Move, self.config.element, TransformMetadata::default());
        self.emit(EventPhase::Start, data);
    }

    /// Begin resizing from a handle
    pub fn start_resize(&mut self, handle: ResizeHandle, client_x: f32, client_y: f32) {
        self.state = InteractionState::Resizing;
        self.active_handle = Some(handle);
        self.start_point = Some(Position::new(client_x, client_y));
        self.start_element = Some(self.config.element);
        self.current_position = Some(self.config.element);

        let data = TransformData::rect(TransformKind::Resize, self.config.element, self.resize_metadata(handle));
        self.emit(EventPhase::Start, data);
    }

    /// Begin moving a single vertex
    ///
    /// An out-of-range index leaves the controller idle.
    pub fn start_vertex_edit(&mut self, vertex_index: usize, client_x: f32, client_y: f32) {
        self.current_vertices = self.config.vertices.clone();
        if vertex_index >= self.current_vertices.len() {
            return;
        }

        self.state = InteractionState::VertexEditing;
        self.active_vertex_index = Some(vertex_index);
        self.start_point = Some(Position::new(client_x, client_y));
        self.start_vertices = self.current_vertices.clone();

        let data = TransformData::vertices(self.start_vertices.clone(), vertex_index);
        self.emit(EventPhase::Start, data);
    }

    /// Feed the current pointer position
    pub fn move_to(&mut self, client_x: f32, client_y: f32) {
        let Some(start_point) = self.start_point else {
            return;
        };
        let delta = self.transform_delta(client_x - start_point.x, client_y - start_point.y);

        match self.state {
            InteractionState::Idle => {}
            InteractionState::Dragging => {
                let Some(start) = self.start_element else {
                    return;
                };
                let rect = self.apply_constraints(start.translate(delta.x, delta.y));
                self.current_position = Some(rect);
                self.emit(
                    EventPhase::Move,
                    TransformData::rect(TransformKind::Move, rect, TransformMetadata::default()),
                );
            }
            InteractionState::Resizing => {
                let (Some(start), Some(handle)) = (self.start_element, self.active_handle) else {
                    return;
                };
                let rect = self.resize_rect(&start, delta, handle);
                self.current_position = Some(rect);
                let metadata = self.resize_metadata(handle);
                self.emit(EventPhase::Move, TransformData::rect(TransformKind::Resize, rect, metadata));
            }
            InteractionState::VertexEditing => {
                let Some(index) = self.active_vertex_index else {
                    return;
                };
                let mut vertices = self.start_vertices.clone();
                let moved = vertices[index].offset(delta.x, delta.y);
                vertices[index] = self.clamp_point(moved);
                self.current_vertices = vertices.clone();
                self.emit(EventPhase::Move, TransformData::vertices(vertices, index));
            }
        }
    }

    /// Finish the gesture, emitting the final geometry
    pub fn end(&mut self) {
        match self.state {
            InteractionState::Idle => return,
            InteractionState::VertexEditing => {
                let index = self.active_vertex_index.unwrap_or_default();
                let data = TransformData::vertices(self.current_vertices.clone(), index);
                self.emit(EventPhase::End, data);
            }
            InteractionState::Dragging => {
                let rect = self.current_position.unwrap_or(self.config.element);
                self.emit(
                    EventPhase::End,
                    TransformData::rect(TransformKind::Move, rect, TransformMetadata::default()),
                );
            }
            InteractionState::Resizing => {
                let rect = self.current_position.unwrap_or(self.config.element);
                let metadata = self.active_handle.map(|h| self.resize_metadata(h)).unwrap_or_default();
                self.emit(EventPhase::End, TransformData::rect(TransformKind::Resize, rect, metadata));
            }
        }
        self.reset();
    }

    /// Abort the gesture, emitting the snapshot taken when it started
    pub fn cancel(&mut self) {
        match self.state {
            InteractionState::Idle => return,
            InteractionState::VertexEditing => {
                let index = self.active_vertex_index.unwrap_or_default();
                let data = TransformData::vertices(self.start_vertices.clone(), index);
                self.current_vertices = self.start_vertices.clone();
                self.emit(EventPhase::End, data);
            }
            InteractionState::Dragging => {
                if let Some(start) = self.start_element {
                    self.emit(
                        EventPhase::End,
                        TransformData::rect(TransformKind::Move, start, TransformMetadata::default()),
                    );
                }
            }
            InteractionState::Resizing => {
                if let Some(start) = self.start_element {
                    let metadata = self.active_handle.map(|h| self.resize_metadata(h)).unwrap_or_default();
                    self.emit(EventPhase::End, TransformData::rect(TransformKind::Resize, start, metadata));
                }
            }
        }
        self.reset();
    }

    fn emit(&mut self, phase: EventPhase, transform: TransformData) {
        (self.on_update)(InteractionEvent { phase, transform });
    }

    fn reset(&mut self) {
        self.state = InteractionState::Idle;
        self.start_point = None;
        self.start_element = None;
        self.active_handle = None;
        self.current_position = None;
        self.active_vertex_index = None;
        self.start_vertices.clear();
    }

    fn resize_metadata(&self, handle: ResizeHandle) -> TransformMetadata {
        TransformMetadata {
            handle: Some(handle),
            vertex_index: None,
            maintain_aspect_ratio: self.config.maintain_aspect_ratio,
        }
    }

    /// Rotate a screen delta into page space and undo the zoom scale
    fn transform_delta(&self, dx: f32, dy: f32) -> Position {
        let (cos, sin) = match self.config.page_rotation % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        let scale = if self.config.scale > 0.0 { self.config.scale } else { 1.0 };
        let sx = dx / scale;
        let sy = dy / scale;

        Position::new(cos * sx + sin * sy, -sin * sx + cos * sy)
    }

    fn clamp_point(&self, point: Position) -> Position {
        match self.config.constraints.as_ref().and_then(|c| c.bounding_box) {
            Some(bbox) => point.clamp_to(&bbox),
            None => point,
        }
    }

    fn resize_rect(&self, start: &Rect, delta: Position, handle: ResizeHandle) -> Rect {
        let mut x = start.origin.x;
        let mut y = start.origin.y;
        let mut width = start.size.width;
        let mut height = start.size.height;

        if handle.moves_left() {
            x += delta.x;
            width -= delta.x;
        }
        if handle.moves_right() {
            width += delta.x;
        }
        if handle.moves_top() {
            y += delta.y;
            height -= delta.y;
        }
        if handle.moves_bottom() {
            height += delta.y;
        }

        if self.config.maintain_aspect_ratio && start.size.height != 0.0 {
            let aspect_ratio = start.size.width / start.size.height;

            match handle {
                ResizeHandle::N | ResizeHandle::S => {
                    let new_width = height * aspect_ratio;
                    let diff = new_width - width;
                    width = new_width;
                    x -= diff / 2.0;
                }
                ResizeHandle::E | ResizeHandle::W => {
                    let new_height = width / aspect_ratio;
                    let diff = new_height - height;
                    height = new_height;
                    if handle == ResizeHandle::W {
                        x = start.right() - width;
                    }
                    y -= diff / 2.0;
                }
                _ => {
                    let width_change = (width - start.size.width).abs();
                    let height_change = (height - start.size.height).abs();
                    if width_change > height_change {
                        height = width / aspect_ratio;
                    } else {
                        width = height * aspect_ratio;
                    }
                    if handle.moves_left() {
                        x = start.right() - width;
                    }
                    if handle.moves_top() {
                        y = start.bottom() - height;
                    }
                }
            }
        }

        // Only the edges owned by the handle are clamped, so the opposite edge stays put.
        if let Some(bbox) = self.config.constraints.as_ref().and_then(|c| c.bounding_box) {
            if handle.moves_right() {
                width = width.min(bbox.width - x);
            }
            if handle.moves_bottom() {
                height = height.min(bbox.height - y);
            }
            if handle.moves_left() && x < 0.0 {
                width += x;
                x = 0.0;
            }
            if handle.moves_top() && y < 0.0 {
                height += y;
                y = 0.0;
            }
        }

        let constrained = self.apply_constraints(Rect::new(x, y, width, height));

        // Origin axes the handle does not drive stay pinned to the snapshot.
        let recentered = self.config.maintain_aspect_ratio;
        let pin_x = !handle.moves_left()
            && !(recentered && matches!(handle, ResizeHandle::N | ResizeHandle::S));
        let pin_y = !handle.moves_top()
            && !(recentered && matches!(handle, ResizeHandle::E | ResizeHandle::W));
        Rect {
            origin: Position::new(
                if pin_x { x } else { constrained.origin.x },
                if pin_y { y } else { constrained.origin.y },
            ),
            size: constrained.size,
        }
    }

    fn apply_constraints(&self, rect: Rect) -> Rect {
        let Some(constraints) = self.config.constraints.as_ref() else {
            return rect;
        };

        let mut width = rect.size.width.max(constraints.min_width.unwrap_or(1.0));
        let mut height = rect.size.height.max(constraints.min_height.unwrap_or(1.0));
        if let Some(max_width) = constraints.max_width {
            width = width.min(max_width);
        }
        if let Some(max_height) = constraints.max_height {
            height = height.min(max_height);
        }

        let mut x = rect.origin.x;
        let mut y = rect.origin.y;
        if let Some(bbox) = constraints.bounding_box {
            x = x.min(bbox.width - width).max(0.0);
            y = y.min(bbox.height - height).max(0.0);
        }

        Rect::new(x, y, width, height)
    }
}

/// Where resize handles sit relative to the element edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetMode {
    #[default]
    Outside,
    Inside,
    Center,
}

/// Presentation options for resize handles (screen pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeUi {
    pub handle_size: f32,
    /// Distance from the box edge
    pub spacing: f32,
    pub offset_mode: OffsetMode,
    pub include_sides: bool,
    pub rotation_aware_cursor: bool,
}

impl Default for ResizeUi {
    fn default() -> Self {
        Self {
            handle_size: 8.0,
            spacing: 1.0,
            offset_mode: OffsetMode::Outside,
            include_sides: false,
            rotation_aware_cursor: true,
        }
    }
}

/// Presentation options for vertex handles (screen pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexUi {
    pub vertex_size: f32,
}

impl Default for VertexUi {
    fn default() -> Self {
        Self { vertex_size: 12.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleTarget {
    Resize(ResizeHandle),
    Vertex(usize),
}

/// Placement of one handle, relative to the element's top-left corner on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleDescriptor {
    pub target: HandleTarget,
    pub left: f32,
    pub top: f32,
    pub size: f32,
    pub cursor: &'static str,
}

fn edge_offset(size: f32, spacing: f32, mode: OffsetMode) -> f32 {
    let base = -size / 2.0;
    match mode {
        OffsetMode::Center => base,
        OffsetMode::Outside => base - spacing,
        OffsetMode::Inside => base + spacing,
    }
}

/// Describe the resize handles for an element: four corners, plus sides when enabled
pub fn describe_resize_handles(config: &DragResizeConfig, ui: &ResizeUi) -> Vec<HandleDescriptor> {
    let k = ui.handle_size;
    let offset = edge_offset(k, ui.spacing, ui.offset_mode);
    let width = config.element.size.width * config.scale;
    let height = config.element.size.height * config.scale;
    let near = offset;
    let far_x = width - k - offset;
    let far_y = height - k - offset;
    let mid_x = width / 2.0 - k / 2.0;
    let mid_y = height / 2.0 - k / 2.0;

    let mut placements = vec![
        (ResizeHandle::Nw, near, near),
        (ResizeHandle::Ne, far_x, near),
        (ResizeHandle::Sw, near, far_y),
        (ResizeHandle::Se, far_x, far_y),
    ];
    if ui.include_sides {
        placements.extend([
            (ResizeHandle::N, mid_x, near),
            (ResizeHandle::S, mid_x, far_y),
            (ResizeHandle::W, near, mid_y),
            (ResizeHandle::E, far_x, mid_y),
        ]);
    }

    let rotation = config.page_rotation % 4;
    placements
        .into_iter()
        .map(|(handle, left, top)| HandleDescriptor {
            target: HandleTarget::Resize(handle),
            left,
            top,
            size: k,
            cursor: if ui.rotation_aware_cursor {
                handle.cursor(rotation)
            } else {
                "default"
            },
        })
        .collect()
}

/// Describe one handle per vertex, centered on the vertex
///
/// `live_vertices` overrides the configured vertices during an edit.
pub fn describe_vertex_handles(
    config: &DragResizeConfig,
    ui: &VertexUi,
    live_vertices: Option<&[Position]>,
) -> Vec<HandleDescriptor> {
    let origin = config.element.origin;
    let vertices = live_vertices.unwrap_or(&config.vertices);
    let half = ui.vertex_size / 2.0;

    vertices
        .iter()
        .enumerate()
        .map(|(i, v)| HandleDescriptor {
            target: HandleTarget::Vertex(i),
            left: (v.x - origin.x) * config.scale - half,
            top: (v.y - origin.y) * config.scale - half,
            size: ui.vertex_size,
            cursor: "pointer",
        })
        .collect()
}
