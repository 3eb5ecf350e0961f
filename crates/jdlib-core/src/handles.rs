//! Native handle ownership.
//!
//! Each (kind, model path) pair is loaded at most once and released exactly
//! once, when the cache is cleared.

use crate::backend::{BackendError, HandleKind, RawHandle, VisionBackend};
use std::collections::HashMap;

/// A native handle owned by a [`HandleCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub kind: HandleKind,
    pub raw: RawHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    kind: HandleKind,
    /// Normalized model path; `None` for the built-in detector.
    model_path: Option<String>,
}

#[derive(Debug, Default)]
pub struct HandleCache {
    entries: HashMap<HandleKey, Handle>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `(kind, model_path)`, creating it through
    /// the backend on first use.
    pub fn acquire<B: VisionBackend + ?Sized>(
        &mut self,
        backend: &B,
        kind: HandleKind,
        model_path: Option<&str>,
    ) -> Result<Handle, BackendError> {
        let key = HandleKey {
            kind,
            model_path: model_path.map(str::to_owned),
        };
        if let Some(handle) = self.entries.get(&key) {
            return Ok(*handle);
        }

        let raw = match (kind, model_path) {
            (HandleKind::Detector, _) => backend.create_detector()?,
            (HandleKind::ShapePredictor, Some(path)) => backend.create_shape_predictor(path)?,
            (HandleKind::Embedder, Some(path)) => backend.create_embedder(path)?,
            (_, None) => {
                return Err(BackendError::InvalidPath(format!("{kind} requires a model path")))
            }
        };
        if raw == 0 {
            return Err(BackendError::HandleCreation(kind));
        }

        tracing::info!(
            %kind,
            path = model_path.unwrap_or("<builtin>"),
            raw,
            "native handle created"
        );
        let handle = Handle { kind, raw };
        self.entries.insert(key, handle);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every cached handle through `backend` and forget them.
    pub fn release_all<B: VisionBackend + ?Sized>(&mut self, backend: &B) {
        for (key, handle) in self.entries.drain() {
            tracing::debug!(
                kind = %handle.kind,
                path = ?key.model_path,
                raw = handle.raw,
                "releasing native handle"
            );
            backend.release(handle.kind, handle.raw);
        }
    }
}
