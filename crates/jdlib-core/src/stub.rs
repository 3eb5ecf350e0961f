//! Scripted in-process backend for exercising the façade without a native library.

use crate::backend::{BackendError, HandleKind, LandmarkMode, RawHandle, VisionBackend};
use crate::buffer::ImageBuffer;
use crate::types::{FaceDescriptor, Rect};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// One recorded backend invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    CreateDetector,
    CreateShapePredictor(String),
    CreateEmbedder(String),
    Release(HandleKind, RawHandle),
    Detect {
        detector: RawHandle,
        width: u32,
        height: u32,
    },
    Landmarks {
        mode: LandmarkMode,
        shape_predictor: RawHandle,
        detector: RawHandle,
    },
    Embeddings {
        embedder: RawHandle,
        shape_predictor: RawHandle,
        detector: RawHandle,
    },
}

/// Returns canned results and records every call.
///
/// Clones share the call log, so a test can keep one clone after handing the
/// other to a [`Jdlib`](crate::Jdlib).
#[derive(Debug, Clone)]
pub struct StubBackend {
    calls: Rc<RefCell<Vec<StubCall>>>,
    next_handle: Rc<Cell<RawHandle>>,
    detections: Option<Vec<Rect>>,
    faces: Option<Vec<FaceDescriptor>>,
    null_handles: bool,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    /// A backend that finds no faces.
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            next_handle: Rc::new(Cell::new(1)),
            detections: Some(Vec::new()),
            faces: Some(Vec::new()),
            null_handles: false,
        }
    }

    pub fn with_detections(mut self, rects: Vec<Rect>) -> Self {
        self.detections = Some(rects);
        self
    }

    /// Faces returned by both landmark and embedding queries.
    pub fn with_faces(mut self, faces: Vec<FaceDescriptor>) -> Self {
        self.faces = Some(faces);
        self
    }

    /// Every query returns a null result.
    pub fn with_null_results(mut self) -> Self {
        self.detections = None;
        self.faces = None;
        self
    }

    /// Every handle constructor returns 0.
    pub fn with_null_handles(mut self) -> Self {
        self.null_handles = true;
        self
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&StubCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: StubCall) {
        self.calls.borrow_mut().push(call);
    }

    fn new_handle(&self) -> RawHandle {
        if self.null_handles {
            return 0;
        }
        let h = self.next_handle.get();
        self.next_handle.set(h + 1);
        h
    }
}

impl VisionBackend for StubBackend {
    fn create_detector(&self) -> Result<RawHandle, BackendError> {
        self.record(StubCall::CreateDetector);
        Ok(self.new_handle())
    }

    fn create_shape_predictor(&self, model_path: &str) -> Result<RawHandle, BackendError> {
        self.record(StubCall::CreateShapePredictor(model_path.to_owned()));
        Ok(self.new_handle())
    }

    fn create_embedder(&self, model_path: &str) -> Result<RawHandle, BackendError> {
        self.record(StubCall::CreateEmbedder(model_path.to_owned()));
        Ok(self.new_handle())
    }

    fn release(&self, kind: HandleKind, handle: RawHandle) {
        self.record(StubCall::Release(kind, handle));
    }

    fn detect(
        &self,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<Rect>>, BackendError> {
        self.record(StubCall::Detect {
            detector,
            width: image.width(),
            height: image.height(),
        });
        Ok(self.detections.clone())
    }

    fn landmarks(
        &self,
        mode: LandmarkMode,
        shape_predictor: RawHandle,
        detector: RawHandle,
        _image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError> {
        self.record(StubCall::Landmarks {
            mode,
            shape_predictor,
            detector,
        });
        Ok(self.faces.clone())
    }

    fn embeddings(
        &self,
        embedder: RawHandle,
        shape_predictor: RawHandle,
        detector: RawHandle,
        _image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError> {
        self.record(StubCall::Embeddings {
            embedder,
            shape_predictor,
            detector,
        });
        Ok(self.faces.clone())
    }
}
