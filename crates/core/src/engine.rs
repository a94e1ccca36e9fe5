//! Document engine collaborator
//!
//! The engine owns the persisted document. All calls are async and fail
//! with an [`EngineError`].

use crate::error::EngineError;
use async_trait::async_trait;
use image::RgbaImage;
use pdf_annotation_model::{AnnotationId, AnnotationObject, Size};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of an open document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub index: u32,
    pub size: Size,
    /// Page rotation in quarter turns
    pub rotation: u8,
}

/// An open document as seen by the annotation layer
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHandle {
    pub id: DocumentId,
    pub pages: Vec<PageInfo>,
}

impl DocumentHandle {
    pub fn new(id: impl Into<String>, pages: Vec<PageInfo>) -> Self {
        Self {
            id: DocumentId(id.into()),
            pages,
        }
    }

    pub fn page(&self, index: u32) -> Option<&PageInfo> {
        self.pages.iter().find(|p| p.index == index)
    }
}

/// Out-of-band payload forwarded with a creation
#[derive(Debug, Clone, PartialEq)]
pub enum CreateContext {
    /// Raster data of a stamp
    Image(Arc<RgbaImage>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub scale: f32,
    pub device_pixel_ratio: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            device_pixel_ratio: 1.0,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Create an annotation and return the engine's id for it
    async fn create_page_annotation(
        &self,
        doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
        context: Option<CreateContext>,
    ) -> EngineResult<AnnotationId>;

    async fn update_page_annotation(
        &self,
        doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
    ) -> EngineResult<bool>;

    async fn remove_page_annotation(
        &self,
        doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
    ) -> EngineResult<bool>;

    async fn get_all_annotations(
        &self,
        doc: &DocumentHandle,
    ) -> EngineResult<BTreeMap<u32, Vec<AnnotationObject>>>;

    async fn get_page_annotations(
        &self,
        doc: &DocumentHandle,
        page: &PageInfo,
    ) -> EngineResult<Vec<AnnotationObject>>;

    async fn render_page_annotation(
        &self,
        doc: &DocumentHandle,
        page: &PageInfo,
        object: &AnnotationObject,
        options: RenderOptions,
    ) -> EngineResult<RgbaImage>;
}
