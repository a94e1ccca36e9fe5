//! Image stamp placement

use super::services::{FileRequest, ImageRequest, ImageSource, ProcessedImage, STAMP_IMAGE_ACCEPT};
use super::{centered_origin, HandlerContext, PointerEvent, PointerHandler};
use crate::engine::CreateContext;
use crate::tools::Tool;
use pdf_annotation_model::{AnnotationKind, AnnotationStyle, Position, Rect, Size};
use std::sync::Arc;

pub const DEFAULT_STAMP_ICON: &str = "Draft";
pub const DEFAULT_STAMP_SUBJECT: &str = "Stamp";

/// Places a stamp centered on each pointer-down
///
/// With an image source on the tool the image is decoded directly,
/// otherwise the user is asked for a file first.
pub struct StampHandler {
    context: HandlerContext,
}

pub(super) fn stamp_handler(context: HandlerContext) -> Box<dyn PointerHandler> {
    Box::new(StampHandler { context })
}

fn place_stamp(context: &HandlerContext, tool: &Tool, pos: Position, processed: ProcessedImage, size: Size) {
    let origin = centered_origin(pos, size, context.page_size);
    let rect = Rect::new(origin.x, origin.y, size.width, size.height);
    let kind = AnnotationKind::Stamp {
        icon: tool
            .defaults
            .icon
            .clone()
            .unwrap_or_else(|| DEFAULT_STAMP_ICON.to_string()),
        subject: tool
            .defaults
            .subject
            .clone()
            .unwrap_or_else(|| DEFAULT_STAMP_SUBJECT.to_string()),
    };
    let style = tool.defaults.resolve_style(AnnotationStyle::default());
    let object = context.new_object(tool, rect, kind, style);
    context.commit(object, Some(CreateContext::Image(processed.image)));
}

impl PointerHandler for StampHandler {
    fn on_pointer_down(&mut self, pos: Position, _event: &PointerEvent<'_>) {
        let Some(tool) = self.context.tool() else {
            return;
        };
        let page = self.context.page_size;
        let services = Arc::clone(&self.context.services);

        if let Some(src) = tool.defaults.image_src.clone() {
            let context = self.context.clone();
            let fixed_size = tool.defaults.image_size;
            services.process_image(ImageRequest {
                source: ImageSource::Url(src),
                max_width: Some(page.width),
                max_height: Some(page.height),
                on_complete: Box::new(move |processed| {
                    let size = fixed_size
                        .unwrap_or_else(|| Size::new(processed.width, processed.height));
                    place_stamp(&context, &tool, pos, processed, size);
                }),
            });
        } else {
            let context = self.context.clone();
            let image_services = Arc::clone(&services);
            services.request_file(FileRequest {
                accept: STAMP_IMAGE_ACCEPT.to_string(),
                on_file: Box::new(move |file| {
                    image_services.process_image(ImageRequest {
                        source: ImageSource::File(file),
                        max_width: Some(page.width),
                        max_height: Some(page.height),
                        on_complete: Box::new(move |processed| {
                            let size = Size::new(processed.width, processed.height);
                            place_stamp(&context, &tool, pos, processed, size);
                        }),
                    });
                }),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::services::{HandlerServices, SelectedFile};
    use super::super::test_support::{context_with_services, Recorder};
    use super::*;
    use crate::tools::default_tools;
    use image::RgbaImage;
    use parking_lot::Mutex;

    /// Serves a fixed decoded image and records requests
    struct FakeServices {
        size: (u32, u32),
        requests: Mutex<Vec<String>>,
    }

    impl HandlerServices for FakeServices {
        fn request_file(&self, request: FileRequest) {
            self.requests.lock().push(format!("file:{}", request.accept));
            (request.on_file)(SelectedFile {
                name: "stamp.png".into(),
                bytes: Vec::new(),
            });
        }

        fn process_image(&self, request: ImageRequest) {
            let label = match &request.source {
                ImageSource::Url(url) => format!("url:{}", url),
                ImageSource::File(file) => format!("bytes:{}", file.name),
            };
            self.requests.lock().push(label);
            let (w, h) = self.size;
            (request.on_complete)(ProcessedImage {
                image: Arc::new(RgbaImage::new(w, h)),
                width: w as f32,
                height: h as f32,
            });
        }
    }

    fn stamp() -> Tool {
        default_tools().into_iter().find(|t| t.id == "stamp").unwrap()
    }

    #[test]
    fn test_file_stamp_centered_and_clamped() {
        let services = Arc::new(FakeServices {
            size: (100, 60),
            requests: Mutex::new(Vec::new()),
        });
        let recorder = Arc::new(Recorder::default());
        let mut handler = stamp_handler(context_with_services(
            stamp(),
            Size::new(800.0, 600.0),
            &recorder,
            services.clone(),
        ));
        handler.on_pointer_down(Position::new(20.0, 300.0), &PointerEvent::default());

        assert_eq!(
            *services.requests.lock(),
            vec!["file:image/png,image/jpeg".to_string(), "bytes:stamp.png".to_string()]
        );
        let commits = recorder.commits.lock();
        let (object, context) = &commits[0];
        assert_eq!(object.rect, Rect::new(0.0, 270.0, 100.0, 60.0));
        assert_eq!(
            object.kind,
            AnnotationKind::Stamp {
                icon: "Draft".into(),
                subject: "Stamp".into()
            }
        );
        assert!(matches!(context, Some(CreateContext::Image(img)) if img.dimensions() == (100, 60)));
    }

    #[test]
    fn test_predefined_source_uses_fixed_size() {
        let services = Arc::new(FakeServices {
            size: (400, 400),
            requests: Mutex::new(Vec::new()),
        });
        let mut tool = stamp();
        tool.defaults.image_src = Some("approved.png".into());
        tool.defaults.image_size = Some(Size::new(120.0, 40.0));
        let recorder = Arc::new(Recorder::default());
        let mut handler = stamp_handler(context_with_services(
            tool,
            Size::new(800.0, 600.0),
            &recorder,
            services.clone(),
        ));
        handler.on_pointer_down(Position::new(400.0, 300.0), &PointerEvent::default());

        assert_eq!(*services.requests.lock(), vec!["url:approved.png".to_string()]);
        assert_eq!(recorder.committed()[0].rect, Rect::new(340.0, 280.0, 120.0, 40.0));
    }
}
