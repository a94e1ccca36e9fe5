//! File and image services used by handlers
//!
//! The stamp handler needs a file picker and an image decoder. Both are
//! callback based since a picker usually completes on a later UI turn.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Accept filter for stamp images
pub const STAMP_IMAGE_ACCEPT: &str = "image/png,image/jpeg";

/// A file chosen by the user
#[derive(Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub struct FileRequest {
    /// Comma separated MIME types
    pub accept: String,
    pub on_file: Box<dyn FnOnce(SelectedFile) + Send>,
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Path or URL of an image
    Url(String),
    File(SelectedFile),
}

pub struct ImageRequest {
    pub source: ImageSource,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub on_complete: Box<dyn FnOnce(ProcessedImage) + Send>,
}

/// Decoded image scaled to fit the requested bounds
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: Arc<RgbaImage>,
    pub width: f32,
    pub height: f32,
}

/// UI services available to handlers
///
/// Callbacks may run synchronously or later. A request that is cancelled or
/// fails never calls its callback.
pub trait HandlerServices: Send + Sync {
    fn request_file(&self, request: FileRequest);
    fn process_image(&self, request: ImageRequest);
}

pub type FilePicker = Box<dyn Fn(&str) -> Option<SelectedFile> + Send + Sync>;

/// Services backed by the `image` crate
///
/// Decoding runs synchronously. File requests go to the optional picker,
/// which receives the accept filter.
#[derive(Default)]
pub struct DecodingServices {
    picker: Option<FilePicker>,
}

impl DecodingServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_picker(picker: FilePicker) -> Self {
        Self {
            picker: Some(picker),
        }
    }

    /// Decode and scale down to fit `max_width` x `max_height`
    ///
    /// Images are never scaled up.
    pub fn decode(
        source: &ImageSource,
        max_width: Option<f32>,
        max_height: Option<f32>,
    ) -> image::ImageResult<ProcessedImage> {
        let decoded = match source {
            ImageSource::Url(path) => image::open(Path::new(path))?,
            ImageSource::File(file) => image::load_from_memory(&file.bytes)?,
        };
        let rgba = decoded.to_rgba8();
        let (width, height) = fit_within(rgba.width(), rgba.height(), max_width, max_height);

        let image = if (width, height) == (rgba.width(), rgba.height()) {
            rgba
        } else {
            imageops::resize(&rgba, width, height, FilterType::Triangle)
        };

        Ok(ProcessedImage {
            width: image.width() as f32,
            height: image.height() as f32,
            image: Arc::new(image),
        })
    }
}

/// Largest size with the same aspect ratio that fits the bounds
fn fit_within(width: u32, height: u32, max_width: Option<f32>, max_height: Option<f32>) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let mut ratio = 1.0f32;
    if let Some(max) = max_width {
        ratio = ratio.min(max / width as f32);
    }
    if let Some(max) = max_height {
        ratio = ratio.min(max / height as f32);
    }
    if ratio >= 1.0 {
        return (width, height);
    }
    (
        ((width as f32 * ratio).round() as u32).max(1),
        ((height as f32 * ratio).round() as u32).max(1),
    )
}

impl HandlerServices for DecodingServices {
    fn request_file(&self, request: FileRequest) {
        let Some(picker) = &self.picker else {
            tracing::debug!("no file picker configured");
            return;
        };
        match picker(&request.accept) {
            Some(file) => (request.on_file)(file),
            None => tracing::debug!("file request cancelled"),
        }
    }

    fn process_image(&self, request: ImageRequest) {
        match Self::decode(&request.source, request.max_width, request.max_height) {
            Ok(processed) => (request.on_complete)(processed),
            Err(e) => tracing::warn!("failed to decode stamp image: {}", e),
        }
    }
}
