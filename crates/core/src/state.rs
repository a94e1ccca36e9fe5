//! Annotation state and the commit-state machine
//!
//! Local mutations are applied here synchronously and never fail. Each
//! tracked annotation records how it relates to the document engine so the
//! commit protocol knows what to create, update or remove.

use crate::tools::{Tool, ToolDefaults, ToolRegistry};
use pdf_annotation_model::{AnnotationId, AnnotationObject, AnnotationPatch, Color};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Relationship of a tracked annotation to the document engine
///
/// A creation that settles after the annotation was edited again moves
/// from `New` to `Dirty`: the engine now holds the dispatched revision, so
/// the item is synced and then immediately modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitState {
    /// Created locally, not yet in the engine
    New,
    /// Changed locally since the last sync
    Dirty,
    /// Deleted locally, still present in the engine
    Deleted,
    Synced,
}

/// An annotation plus its synchronization state
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAnnotation {
    pub object: AnnotationObject,
    pub commit_state: CommitState,
    /// Engine identity, set once the engine holds this annotation
    pub engine_id: Option<AnnotationId>,
    /// Bumped on every local mutation
    pub revision: u64,
}

impl TrackedAnnotation {
    /// Whether the engine has ever held this annotation
    pub fn ever_synced(&self) -> bool {
        self.engine_id.is_some()
    }

    /// Object as the engine knows it
    pub fn engine_object(&self) -> AnnotationObject {
        let mut object = self.object.clone();
        if let Some(engine_id) = self.engine_id {
            object.id = engine_id;
        }
        object
    }
}

/// A tracked entry removed by a delete, with its former page position
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedEntry {
    pub entry: TrackedAnnotation,
    pub index: usize,
}

/// Presets offered by color pickers
pub fn default_color_presets() -> Vec<Color> {
    vec![
        Color::RED,
        Color::ORANGE,
        Color::YELLOW,
        Color::GREEN,
        Color::TEAL,
        Color::BLUE,
        Color::PURPLE,
        Color::BROWN,
        Color::BLACK,
        Color::WHITE,
    ]
}

/// Aggregate annotation state
///
/// Every id listed in a page exists in the tracked map and the selection,
/// when set, refers to a live annotation. Deleted annotations awaiting a
/// commit stay tracked but are no longer listed on their page.
#[derive(Debug, Clone)]
pub struct AnnotationState {
    pages: BTreeMap<u32, Vec<AnnotationId>>,
    by_uid: HashMap<AnnotationId, TrackedAnnotation>,
    selected_uid: Option<AnnotationId>,
    tools: ToolRegistry,
    active_tool_id: Option<String>,
    color_presets: Vec<Color>,
    has_pending_changes: bool,
    revision_counter: u64,
    /// Ids whose engine creation has been dispatched but not settled
    creating: HashSet<AnnotationId>,
}

impl AnnotationState {
    pub fn new(tools: ToolRegistry, color_presets: Vec<Color>) -> Self {
        Self {
            pages: BTreeMap::new(),
            by_uid: HashMap::new(),
            selected_uid: None,
            tools,
            active_tool_id: None,
            color_presets,
            has_pending_changes: false,
            revision_counter: 0,
            creating: HashSet::new(),
        }
    }

    fn next_revision(&mut self) -> u64 {
        self.revision_counter += 1;
        self.revision_counter
    }

    fn refresh_pending(&mut self) {
        self.has_pending_changes = self
            .by_uid
            .values()
            .any(|t| t.commit_state != CommitState::Synced);
    }

    /// Replace all annotations with engine-loaded objects, all synced
    pub fn set_annotations(&mut self, pages: BTreeMap<u32, Vec<AnnotationObject>>) {
        self.pages.clear();
        self.by_uid.clear();
        self.creating.clear();
        self.selected_uid = None;
        for (page_index, objects) in pages {
            for mut object in objects {
                object.page_index = page_index;
                let id = object.id;
                let revision = self.next_revision();
                self.pages.entry(page_index).or_default().push(id);
                self.by_uid.insert(
                    id,
                    TrackedAnnotation {
                        object,
                        commit_state: CommitState::Synced,
                        engine_id: Some(id),
                        revision,
                    },
                );
            }
        }
        self.has_pending_changes = false;
    }

    /// Drop all annotations and the selection
    pub fn clear_annotations(&mut self) {
        self.pages.clear();
        self.by_uid.clear();
        self.creating.clear();
        self.selected_uid = None;
        self.has_pending_changes = false;
    }

    /// Track a new annotation at the end of its page
    ///
    /// Creating an id that is still tracked, such as a redo of an undone
    /// creation whose removal has not been committed, keeps its engine
    /// identity. The entry comes back `Dirty` instead of being created twice.
    pub fn create(&mut self, object: AnnotationObject) {
        let id = object.id;
        let page_index = object.page_index;
        let revision = self.next_revision();
        let mut engine_id = None;
        if let Some(previous) = self.by_uid.remove(&id) {
            if previous.commit_state != CommitState::Deleted {
                self.unlist(previous.object.page_index, id);
            }
            engine_id = previous.engine_id;
        }
        let commit_state = if engine_id.is_some() {
            CommitState::Dirty
        } else {
            CommitState::New
        };
        self.by_uid.insert(
            id,
            TrackedAnnotation {
                object,
                commit_state,
                engine_id,
                revision,
            },
        );
        self.pages.entry(page_index).or_default().push(id);
        self.has_pending_changes = true;
    }

    /// Merge a patch into a live annotation
    ///
    /// Returns the object as it was before the patch.
    pub fn patch(&mut self, id: AnnotationId, patch: &AnnotationPatch) -> Option<AnnotationObject> {
        let revision = self.next_revision();
        let tracked = self.by_uid.get_mut(&id)?;
        if tracked.commit_state == CommitState::Deleted {
            return None;
        }
        let previous = tracked.object.clone();
        patch.apply(&mut tracked.object);
        tracked.revision = revision;
        if tracked.commit_state == CommitState::Synced {
            tracked.commit_state = CommitState::Dirty;
        }
        self.has_pending_changes = true;
        Some(previous)
    }

    /// Delete a live annotation
    ///
    /// Annotations the engine never held are purged on the spot; others are
    /// kept as `Deleted` until a commit removes them. So is an annotation
    /// whose creation is in flight, since the engine is about to hold it.
    pub fn delete(&mut self, id: AnnotationId) -> Option<DeletedEntry> {
        let revision = self.next_revision();
        let tracked = self.by_uid.get(&id)?;
        if tracked.commit_state == CommitState::Deleted {
            return None;
        }
        let entry = tracked.clone();
        let index = self.unlist(entry.object.page_index, id)?;

        if entry.ever_synced() || self.creating.contains(&id) {
            if let Some(tracked) = self.by_uid.get_mut(&id) {
                tracked.commit_state = CommitState::Deleted;
                tracked.revision = revision;
            }
        } else {
            self.by_uid.remove(&id);
        }
        if self.selected_uid == Some(id) {
            self.selected_uid = None;
        }
        self.refresh_pending();
        Some(DeletedEntry { entry, index })
    }

    /// Reinsert a deleted entry at its former page position
    ///
    /// If the deletion already reached the engine the entry comes back as
    /// `New` so the next commit recreates it.
    pub fn restore(&mut self, deleted: DeletedEntry) {
        let DeletedEntry { mut entry, index } = deleted;
        let id = entry.object.id;
        let still_tracked = self
            .by_uid
            .get(&id)
            .is_some_and(|t| t.commit_state == CommitState::Deleted);

        if still_tracked {
            // The creation may have settled after the delete
            let current = self.by_uid.get(&id).and_then(|t| t.engine_id);
            if entry.engine_id.is_none() && current.is_some() {
                entry.engine_id = current;
                entry.commit_state = CommitState::Dirty;
            }
        } else {
            if self.by_uid.contains_key(&id) {
                return;
            }
            entry.commit_state = CommitState::New;
            entry.engine_id = None;
        }
        entry.revision = self.next_revision();

        let page = self.pages.entry(entry.object.page_index).or_default();
        page.insert(index.min(page.len()), id);
        self.by_uid.insert(id, entry);
        self.refresh_pending();
    }

    fn unlist(&mut self, page_index: u32, id: AnnotationId) -> Option<usize> {
        let page = self.pages.get_mut(&page_index)?;
        let index = page.iter().position(|uid| *uid == id)?;
        page.remove(index);
        if page.is_empty() {
            self.pages.remove(&page_index);
        }
        Some(index)
    }

    /// Mark an item synced if it has not changed since `revision`
    ///
    /// The engine id is recorded either way. Returns whether the item is
    /// now synced.
    pub fn mark_synced(&mut self, id: AnnotationId, revision: u64, engine_id: AnnotationId) -> bool {
        let Some(tracked) = self.by_uid.get_mut(&id) else {
            return false;
        };
        tracked.engine_id = Some(engine_id);
        let synced = if tracked.revision == revision {
            tracked.commit_state = CommitState::Synced;
            true
        } else {
            // Synced at the dispatched revision, then modified again
            if tracked.commit_state == CommitState::New {
                tracked.commit_state = CommitState::Dirty;
            }
            false
        };
        self.refresh_pending();
        synced
    }

    /// Record that the engine creation of `id` has been dispatched
    pub fn begin_creation(&mut self, id: AnnotationId) {
        self.creating.insert(id);
    }

    pub fn is_creating(&self, id: AnnotationId) -> bool {
        self.creating.contains(&id)
    }

    /// Record that the engine creation of `id` has settled
    ///
    /// Call after `mark_synced` on success. A deleted entry the engine
    /// never came to hold is purged.
    pub fn finish_creation(&mut self, id: AnnotationId) {
        self.creating.remove(&id);
        let orphaned = self
            .by_uid
            .get(&id)
            .is_some_and(|t| t.commit_state == CommitState::Deleted && !t.ever_synced());
        if orphaned {
            self.by_uid.remove(&id);
        }
        self.refresh_pending();
    }

    /// Settle a removal the engine has performed
    ///
    /// The entry is dropped unless it was restored in the meantime, in
    /// which case it must be recreated.
    pub fn settle_removal(&mut self, id: AnnotationId) {
        match self.by_uid.get_mut(&id) {
            Some(tracked) if tracked.commit_state == CommitState::Deleted => {
                self.by_uid.remove(&id);
            }
            Some(tracked) => {
                tracked.engine_id = None;
                tracked.commit_state = CommitState::New;
            }
            None => {}
        }
        self.refresh_pending();
    }

    /// Items not yet in sync with the engine
    pub fn pending(&self) -> Vec<TrackedAnnotation> {
        self.by_uid
            .values()
            .filter(|t| t.commit_state != CommitState::Synced)
            .cloned()
            .collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.has_pending_changes
    }

    pub fn get(&self, id: AnnotationId) -> Option<&TrackedAnnotation> {
        self.by_uid.get(&id)
    }

    /// Live annotation by id
    pub fn annotation(&self, id: AnnotationId) -> Option<&TrackedAnnotation> {
        self.by_uid
            .get(&id)
            .filter(|t| t.commit_state != CommitState::Deleted)
    }

    /// Live annotations of a page in page order
    pub fn page_annotations(&self, page_index: u32) -> Vec<&TrackedAnnotation> {
        self.pages
            .get(&page_index)
            .map(|ids| ids.iter().filter_map(|id| self.by_uid.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn page_ids(&self, page_index: u32) -> &[AnnotationId] {
        self.pages.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pages(&self) -> &BTreeMap<u32, Vec<AnnotationId>> {
        &self.pages
    }

    /// Number of tracked entries, including deletions awaiting a commit
    pub fn tracked_len(&self) -> usize {
        self.by_uid.len()
    }

    pub fn selected_uid(&self) -> Option<AnnotationId> {
        self.selected_uid
    }

    pub fn selected(&self) -> Option<&TrackedAnnotation> {
        self.selected_uid.and_then(|id| self.annotation(id))
    }

    /// Select a live annotation; returns false for unknown ids
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if self.annotation(id).is_none() {
            return false;
        }
        self.selected_uid = Some(id);
        true
    }

    pub fn deselect(&mut self) {
        self.selected_uid = None;
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn set_tool_defaults(&mut self, id: &str, patch: &ToolDefaults) -> bool {
        self.tools.set_tool_defaults(id, patch)
    }

    pub fn register_tool(&mut self, tool: Tool) {
        self.tools.register(tool);
    }

    pub fn active_tool_id(&self) -> Option<&str> {
        self.active_tool_id.as_deref()
    }

    pub fn active_tool(&self) -> Option<&Tool> {
        self.active_tool_id
            .as_deref()
            .and_then(|id| self.tools.get(id))
    }

    /// Set or clear the active tool; unknown ids are rejected
    pub fn set_active_tool(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if self.tools.get(id).is_none() => false,
            Some(id) => {
                self.active_tool_id = Some(id.to_string());
                true
            }
            None => {
                self.active_tool_id = None;
                true
            }
        }
    }

    pub fn color_presets(&self) -> &[Color] {
        &self.color_presets
    }

    /// Append a preset unless already present
    pub fn add_color_preset(&mut self, color: Color) -> bool {
        if self.color_presets.contains(&color) {
            return false;
        }
        self.color_presets.push(color);
        true
    }
}

impl Default for AnnotationState {
    fn default() -> Self {
        Self::new(ToolRegistry::with_defaults(Vec::new()), default_color_presets())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_annotation_model::{AnnotationKind, AnnotationStyle, Rect};

    fn square(page_index: u32) -> AnnotationObject {
        AnnotationObject::new(
            page_index,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            AnnotationKind::Square,
            AnnotationStyle::default(),
        )
    }

    fn loaded(objects: Vec<AnnotationObject>) -> AnnotationState {
        let mut state = AnnotationState::default();
        let mut pages = BTreeMap::new();
        for object in objects {
            pages
                .entry(object.page_index)
                .or_insert_with(Vec::new)
                .push(object);
        }
        state.set_annotations(pages);
        state
    }

    #[test]
    fn test_loaded_annotations_are_synced() {
        let object = square(1);
        let id = object.id;
        let state = loaded(vec![object]);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Synced);
        assert_eq!(tracked.engine_id, Some(id));
        assert!(!state.has_pending_changes());
        assert_eq!(state.page_ids(1), &[id]);
    }

    #[test]
    fn test_patch_marks_synced_dirty_and_new_stays_new() {
        let synced = square(0);
        let synced_id = synced.id;
        let mut state = loaded(vec![synced]);
        let fresh = square(0);
        let fresh_id = fresh.id;
        state.create(fresh);

        let patch = AnnotationPatch::new().with_opacity(0.5);
        let before = state.patch(synced_id, &patch).unwrap();
        assert_eq!(before.style.opacity, 1.0);
        state.patch(fresh_id, &patch);

        assert_eq!(state.get(synced_id).unwrap().commit_state, CommitState::Dirty);
        assert_eq!(state.get(fresh_id).unwrap().commit_state, CommitState::New);
        assert_eq!(state.get(synced_id).unwrap().object.style.opacity, 0.5);
    }

    #[test]
    fn test_delete_never_synced_is_purged() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        assert!(state.has_pending_changes());

        let deleted = state.delete(id).unwrap();
        assert_eq!(deleted.index, 0);
        assert!(state.get(id).is_none());
        assert!(state.pages().is_empty());
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_delete_synced_waits_for_commit() {
        let object = square(0);
        let id = object.id;
        let mut state = loaded(vec![object]);
        state.select(id);

        state.delete(id).unwrap();
        assert_eq!(state.get(id).unwrap().commit_state, CommitState::Deleted);
        assert!(state.annotation(id).is_none());
        assert!(state.page_ids(0).is_empty());
        assert_eq!(state.selected_uid(), None);
        assert!(state.has_pending_changes());

        state.settle_removal(id);
        assert!(state.get(id).is_none());
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_restore_keeps_position_and_state() {
        let objects = vec![square(0), square(0), square(0)];
        let ids: Vec<_> = objects.iter().map(|o| o.id).collect();
        let mut state = loaded(objects);

        let deleted = state.delete(ids[1]).unwrap();
        assert_eq!(deleted.index, 1);
        state.restore(deleted);

        assert_eq!(state.page_ids(0), ids.as_slice());
        assert_eq!(state.get(ids[1]).unwrap().commit_state, CommitState::Synced);
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_restore_after_removal_recreates() {
        let object = square(0);
        let id = object.id;
        let mut state = loaded(vec![object]);
        let deleted = state.delete(id).unwrap();
        state.settle_removal(id);

        state.restore(deleted);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::New);
        assert_eq!(tracked.engine_id, None);
        assert!(state.has_pending_changes());
    }

    #[test]
    fn test_mark_synced_respects_revision() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        let dispatched = state.get(id).unwrap().revision;

        state.patch(id, &AnnotationPatch::new().with_opacity(0.2));
        assert!(!state.mark_synced(id, dispatched, id));
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Dirty);
        assert_eq!(tracked.engine_id, Some(id));

        let current = tracked.revision;
        assert!(state.mark_synced(id, current, id));
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_stale_creation_settles_dirty() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        state.begin_creation(id);
        let dispatched = state.get(id).unwrap().revision;
        state.patch(id, &AnnotationPatch::new().with_opacity(0.7));

        assert!(!state.mark_synced(id, dispatched, id));
        state.finish_creation(id);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Dirty);
        assert_eq!(tracked.engine_id, Some(id));
        assert!(!state.is_creating(id));
    }

    #[test]
    fn test_recreate_of_pending_removal_keeps_engine_id() {
        let object = square(0);
        let id = object.id;
        let mut state = loaded(vec![object.clone()]);
        state.delete(id).unwrap();

        state.create(object);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Dirty);
        assert_eq!(tracked.engine_id, Some(id));
        assert_eq!(state.page_ids(0), &[id]);
        assert_eq!(state.annotation(id).unwrap().object.id, id);
    }

    #[test]
    fn test_delete_during_creation_leaves_tombstone() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        let dispatched = state.get(id).unwrap().revision;
        state.begin_creation(id);

        state.delete(id).unwrap();
        assert_eq!(state.get(id).unwrap().commit_state, CommitState::Deleted);
        assert!(state.page_ids(0).is_empty());

        state.mark_synced(id, dispatched, id);
        state.finish_creation(id);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Deleted);
        assert_eq!(tracked.engine_id, Some(id));
        assert!(state.has_pending_changes());
    }

    #[test]
    fn test_failed_creation_purges_tombstone() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        state.begin_creation(id);
        state.delete(id).unwrap();

        state.finish_creation(id);
        assert!(state.get(id).is_none());
        assert!(!state.has_pending_changes());
    }

    #[test]
    fn test_restore_picks_up_settled_creation() {
        let mut state = AnnotationState::default();
        let object = square(0);
        let id = object.id;
        state.create(object);
        let dispatched = state.get(id).unwrap().revision;
        state.begin_creation(id);
        let deleted = state.delete(id).unwrap();
        state.mark_synced(id, dispatched, id);
        state.finish_creation(id);

        state.restore(deleted);
        let tracked = state.get(id).unwrap();
        assert_eq!(tracked.commit_state, CommitState::Dirty);
        assert_eq!(tracked.engine_id, Some(id));
    }

    #[test]
    fn test_selection_requires_live_annotation() {
        let mut state = AnnotationState::default();
        assert!(!state.select(AnnotationId::new_v4()));
        let object = square(0);
        let id = object.id;
        state.create(object);
        assert!(state.select(id));
        assert_eq!(state.selected().unwrap().object.id, id);
        state.deselect();
        assert!(state.selected_uid().is_none());
    }

    #[test]
    fn test_active_tool_must_exist() {
        let mut state = AnnotationState::default();
        assert!(state.set_active_tool(Some("ink")));
        assert_eq!(state.active_tool().unwrap().id, "ink");
        assert!(!state.set_active_tool(Some("laser")));
        assert_eq!(state.active_tool_id(), Some("ink"));
        assert!(state.set_active_tool(None));
        assert!(state.active_tool().is_none());
    }

    #[test]
    fn test_color_presets_skip_duplicates() {
        let mut state = AnnotationState::default();
        assert_eq!(state.color_presets().len(), 10);
        assert!(!state.add_color_preset(Color::RED));
        assert!(state.add_color_preset(Color::rgb(1, 2, 3)));
        assert_eq!(state.color_presets().len(), 11);
    }
}
