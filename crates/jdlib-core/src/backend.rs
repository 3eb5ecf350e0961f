//! Capability interface over the native vision library.
//!
//! The façade only speaks to a [`VisionBackend`]; the dynamically loaded
//! library and the scripted [`StubBackend`](crate::stub::StubBackend) are
//! two implementations of it.

use crate::buffer::ImageBuffer;
use crate::types::{FaceDescriptor, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque token for state held inside the native library. Never zero.
pub type RawHandle = i64;

/// What a native handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Detector,
    ShapePredictor,
    Embedder,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleKind::Detector => "face detector",
            HandleKind::ShapePredictor => "shape predictor",
            HandleKind::Embedder => "face embedder",
        })
    }
}

/// Which native landmark entry point to call.
///
/// The difference between the two is defined by the native library alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandmarkMode {
    /// Detect faces first, then fit landmarks inside each detection.
    PerFace,
    /// Fit landmarks over the full image without a separate detection pass.
    WholeImage,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("native library returned a null {0} handle")]
    HandleCreation(HandleKind),
    #[error("model path is not a valid C string: {0}")]
    InvalidPath(String),
}

/// Native face-vision operations.
///
/// Query methods return `Ok(None)` when the native side produced no data at
/// all (a null result); normalizing that to an empty collection is the
/// caller's job.
pub trait VisionBackend {
    fn create_detector(&self) -> Result<RawHandle, BackendError>;

    fn create_shape_predictor(&self, model_path: &str) -> Result<RawHandle, BackendError>;

    fn create_embedder(&self, model_path: &str) -> Result<RawHandle, BackendError>;

    /// Free native state behind `handle`. Called exactly once per created handle.
    fn release(&self, kind: HandleKind, handle: RawHandle);

    fn detect(
        &self,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<Rect>>, BackendError>;

    fn landmarks(
        &self,
        mode: LandmarkMode,
        shape_predictor: RawHandle,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError>;

    fn embeddings(
        &self,
        embedder: RawHandle,
        shape_predictor: RawHandle,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError>;
}
