//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::Mutex;
use pdf_annotation_core::{
    CreateContext, DocumentEngine, DocumentHandle, EngineError, EngineResult, PageInfo,
    RenderOptions,
};
use pdf_annotation_model::{
    AnnotationId, AnnotationKind, AnnotationObject, AnnotationStyle, Rect, Size,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { id: AnnotationId, with_context: bool },
    Update(AnnotationId),
    Remove(AnnotationId),
    GetAll,
    GetPage(u32),
    Render(AnnotationId),
}

/// In-memory document engine that records every call
#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<Call>>,
    stored: Mutex<BTreeMap<u32, Vec<AnnotationObject>>>,
    failing: Mutex<HashMap<AnnotationId, EngineError>>,
    rejected_updates: Mutex<HashSet<AnnotationId>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockEngine {
    pub fn with_annotations(objects: Vec<AnnotationObject>) -> Self {
        let engine = Self::default();
        {
            let mut stored = engine.stored.lock();
            for object in objects {
                stored.entry(object.page_index).or_default().push(object);
            }
        }
        engine
    }

    /// Fail every operation on `id` until [`MockEngine::recover`] is called
    pub fn fail_on(&self, id: AnnotationId, error: EngineError) {
        self.failing.lock().insert(id, error);
    }

    pub fn recover(&self, id: AnnotationId) {
        self.failing.lock().remove(&id);
    }

    pub fn reject_updates_of(&self, id: AnnotationId) {
        self.rejected_updates.lock().insert(id);
    }

    /// Park every creation until the returned gate is notified
    pub fn hold_creations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Create, update and remove calls only
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. } | Call::Update(_) | Call::Remove(_)))
            .collect()
    }

    pub fn stored_ids(&self, page_index: u32) -> Vec<AnnotationId> {
        self.stored
            .lock()
            .get(&page_index)
            .map(|objects| objects.iter().map(|o| o.id).collect())
            .unwrap_or_default()
    }

    fn check(&self, id: AnnotationId) -> EngineResult<()> {
        match self.failing.lock().get(&id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentEngine for MockEngine {
    async fn create_page_annotation(
        &self,
        _doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
        context: Option<CreateContext>,
    ) -> EngineResult<AnnotationId> {
        self.calls.lock().push(Call::Create {
            id: object.id,
            with_context: context.is_some(),
        });
        let gate = self.create_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(object.id)?;
        self.stored
            .lock()
            .entry(page.index)
            .or_default()
            .push(object.clone());
        Ok(object.id)
    }

    async fn update_page_annotation(
        &self,
        _doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
    ) -> EngineResult<bool> {
        self.calls.lock().push(Call::Update(object.id));
        self.check(object.id)?;
        if self.rejected_updates.lock().contains(&object.id) {
            return Ok(false);
        }
        let mut stored = self.stored.lock();
        let slot = stored
            .get_mut(&page.index)
            .and_then(|objects| objects.iter_mut().find(|o| o.id == object.id));
        match slot {
            Some(slot) => {
                *slot = object.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_page_annotation(
        &self,
        _doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
    ) -> EngineResult<bool> {
        self.calls.lock().push(Call::Remove(object.id));
        self.check(object.id)?;
        let mut stored = self.stored.lock();
        let Some(objects) = stored.get_mut(&page.index) else {
            return Ok(false);
        };
        let before = objects.len();
        objects.retain(|o| o.id != object.id);
        Ok(objects.len() != before)
    }

    async fn get_all_annotations(
        &self,
        _doc: &DocumentHandle,
    ) -> EngineResult<BTreeMap<u32, Vec<AnnotationObject>>> {
        self.calls.lock().push(Call::GetAll);
        Ok(self.stored.lock().clone())
    }

    async fn get_page_annotations(
        &self,
        _doc: &DocumentHandle,
        page: &PageInfo,
    ) -> EngineResult<Vec<AnnotationObject>> {
        self.calls.lock().push(Call::GetPage(page.index));
        Ok(self.stored.lock().get(&page.index).cloned().unwrap_or_default())
    }

    async fn render_page_annotation(
        &self,
        _doc: &DocumentHandle,
        _page: &PageInfo,
        object: &AnnotationObject,
        options: RenderOptions,
    ) -> EngineResult<RgbaImage> {
        self.calls.lock().push(Call::Render(object.id));
        self.check(object.id)?;
        let scale = options.scale * options.device_pixel_ratio;
        let width = (object.rect.size.width * scale).round().max(1.0) as u32;
        let height = (object.rect.size.height * scale).round().max(1.0) as u32;
        Ok(RgbaImage::new(width, height))
    }
}

/// Two 800x600 pages
pub fn document() -> DocumentHandle {
    let page = |index| PageInfo {
        index,
        size: Size::new(800.0, 600.0),
        rotation: 0,
    };
    DocumentHandle::new("doc-1", vec![page(0), page(1)])
}

pub fn square(page_index: u32, x: f32, y: f32) -> AnnotationObject {
    AnnotationObject::new(
        page_index,
        Rect::new(x, y, 20.0, 20.0),
        AnnotationKind::Square,
        AnnotationStyle::default(),
    )
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("pdf_annotation_core=debug")
        .try_init();
}
