//! The face-vision façade: image in, face records out.

use crate::backend::{BackendError, HandleKind, LandmarkMode, VisionBackend};
use crate::buffer::{ImageBuffer, ImageError};
use crate::handles::HandleCache;
use crate::types::{FaceDescriptor, Rect};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JdlibError {
    #[error("path to face embedding model isn't provided")]
    MissingEmbeddingModel,
    #[error("image: {0}")]
    Image(#[from] ImageError),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
}

/// Model paths use `/` on every platform; the native side expects it.
pub fn normalize_model_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Face detection, landmark and embedding queries over a [`VisionBackend`].
///
/// Native handles are created lazily on first use, reused across calls, and
/// released when the façade is dropped.
pub struct Jdlib<B: VisionBackend> {
    backend: B,
    landmark_model: String,
    embedding_model: Option<String>,
    handles: HandleCache,
}

impl<B: VisionBackend> Jdlib<B> {
    /// Landmark queries only; [`face_embeddings`](Self::face_embeddings) will fail.
    pub fn new(backend: B, landmark_model: &str) -> Self {
        Self {
            backend,
            landmark_model: normalize_model_path(landmark_model),
            embedding_model: None,
            handles: HandleCache::new(),
        }
    }

    pub fn with_embedding_model(
        backend: B,
        landmark_model: &str,
        embedding_model: &str,
    ) -> Self {
        let mut jdlib = Self::new(backend, landmark_model);
        jdlib.embedding_model = Some(normalize_model_path(embedding_model));
        jdlib
    }

    pub fn landmark_model(&self) -> &str {
        &self.landmark_model
    }

    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of native handles currently held.
    pub fn loaded_handles(&self) -> usize {
        self.handles.len()
    }

    /// Release every native handle now. Later queries reload what they need.
    pub fn release_handles(&mut self) {
        self.handles.release_all(&self.backend);
    }

    /// Detect face bounding boxes.
    pub fn detect_faces(&mut self, img: &DynamicImage) -> Result<Vec<Rect>, JdlibError> {
        let buffer = ImageBuffer::from_image(img)?;
        self.detect_faces_in(&buffer)
    }

    pub fn detect_faces_in(&mut self, image: &ImageBuffer) -> Result<Vec<Rect>, JdlibError> {
        let detector = self.handles.acquire(&self.backend, HandleKind::Detector, None)?;
        let data = self.backend.detect(detector.raw, image)?;
        let rects = or_empty(data, "detect_faces");
        tracing::debug!(
            faces = rects.len(),
            width = image.width(),
            height = image.height(),
            "detect_faces"
        );
        Ok(rects)
    }

    /// Detect faces, then fit landmarks inside each detection.
    pub fn landmarks_per_face(
        &mut self,
        img: &DynamicImage,
    ) -> Result<Vec<FaceDescriptor>, JdlibError> {
        let buffer = ImageBuffer::from_image(img)?;
        self.landmarks_in(LandmarkMode::PerFace, &buffer)
    }

    /// Fit landmarks over the whole image without a separate detection pass.
    pub fn landmarks_whole_image(
        &mut self,
        img: &DynamicImage,
    ) -> Result<Vec<FaceDescriptor>, JdlibError> {
        let buffer = ImageBuffer::from_image(img)?;
        self.landmarks_in(LandmarkMode::WholeImage, &buffer)
    }

    pub fn landmarks_in(
        &mut self,
        mode: LandmarkMode,
        image: &ImageBuffer,
    ) -> Result<Vec<FaceDescriptor>, JdlibError> {
        let predictor = self.handles.acquire(
            &self.backend,
            HandleKind::ShapePredictor,
            Some(self.landmark_model.as_str()),
        )?;
        let detector = self.handles.acquire(&self.backend, HandleKind::Detector, None)?;

        let data = self.backend.landmarks(mode, predictor.raw, detector.raw, image)?;
        let faces = or_empty(data, "landmarks");
        tracing::debug!(?mode, faces = faces.len(), "landmarks");
        Ok(faces)
    }

    /// Compute one embedding per detected face.
    ///
    /// Fails with [`JdlibError::MissingEmbeddingModel`] before looking at the
    /// image if no embedding model was configured.
    pub fn face_embeddings(
        &mut self,
        img: &DynamicImage,
    ) -> Result<Vec<FaceDescriptor>, JdlibError> {
        if self.embedding_model.is_none() {
            return Err(JdlibError::MissingEmbeddingModel);
        }
        let buffer = ImageBuffer::from_image(img)?;
        self.face_embeddings_in(&buffer)
    }

    pub fn face_embeddings_in(
        &mut self,
        image: &ImageBuffer,
    ) -> Result<Vec<FaceDescriptor>, JdlibError> {
        let embedding_model = self
            .embedding_model
            .as_deref()
            .ok_or(JdlibError::MissingEmbeddingModel)?;

        let embedder =
            self.handles.acquire(&self.backend, HandleKind::Embedder, Some(embedding_model))?;
        let predictor = self.handles.acquire(
            &self.backend,
            HandleKind::ShapePredictor,
            Some(self.landmark_model.as_str()),
        )?;
        let detector = self.handles.acquire(&self.backend, HandleKind::Detector, None)?;

        let data = self.backend.embeddings(embedder.raw, predictor.raw, detector.raw, image)?;
        let faces = or_empty(data, "face_embeddings");
        tracing::debug!(faces = faces.len(), "face_embeddings");
        Ok(faces)
    }
}

impl<B: VisionBackend> Drop for Jdlib<B> {
    fn drop(&mut self) {
        self.handles.release_all(&self.backend);
    }
}

fn or_empty<T>(data: Option<Vec<T>>, op: &'static str) -> Vec<T> {
    data.unwrap_or_else(|| {
        tracing::warn!(op, "native layer returned null data");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubBackend;

    #[test]
    fn test_normalize_model_path() {
        assert_eq!(
            normalize_model_path(r"C:\models\shape_predictor_68_face_landmarks.dat"),
            "C:/models/shape_predictor_68_face_landmarks.dat"
        );
        assert_eq!(normalize_model_path("/already/fine.dat"), "/already/fine.dat");
    }

    #[test]
    fn test_constructor_normalizes_both_paths() {
        let jdlib = Jdlib::with_embedding_model(StubBackend::new(), r"a\b.dat", r"c\d\e.dat");
        assert_eq!(jdlib.landmark_model(), "a/b.dat");
        assert_eq!(jdlib.embedding_model(), Some("c/d/e.dat"));
    }

    #[test]
    fn test_single_path_constructor_has_no_embedding_model() {
        let jdlib = Jdlib::new(StubBackend::new(), "sp.dat");
        assert_eq!(jdlib.embedding_model(), None);
        assert_eq!(jdlib.loaded_handles(), 0);
    }

    #[test]
    fn test_or_empty() {
        assert_eq!(or_empty::<u8>(None, "t"), Vec::<u8>::new());
        assert_eq!(or_empty(Some(vec![1]), "t"), vec![1]);
    }
}
