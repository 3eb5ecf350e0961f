//! jdlib-core: face detection, landmark and embedding queries over a native
//! vision library.
//!
//! Holds the value types, the BGR pixel marshaling, the [`VisionBackend`]
//! capability trait and the [`Jdlib`] façade. Loading the actual shared
//! library lives in `jdlib-native`.

pub mod backend;
pub mod binding;
pub mod buffer;
pub mod handles;
pub mod stub;
pub mod types;

pub use backend::{BackendError, HandleKind, LandmarkMode, RawHandle, VisionBackend};
pub use binding::{normalize_model_path, Jdlib, JdlibError};
pub use buffer::{ImageBuffer, ImageError};
pub use types::{Embedding, FaceDescriptor, Point, Rect, DEFAULT_MATCH_DISTANCE};
