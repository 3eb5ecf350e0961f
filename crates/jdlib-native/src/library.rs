//! Dynamic loading of the native library and the [`VisionBackend`] over it.

use crate::ffi::{self, RawFaceList, RawRectList};
use crate::platform::Platform;
use crate::resources::{extract_to_temp, ResourceBundle};
use jdlib_core::{
    BackendError, FaceDescriptor, HandleKind, ImageBuffer, LandmarkMode, RawHandle, Rect,
    VisionBackend,
};
use libloading::Library;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{0} is not supported; rebuild Jdlib for it and load that library by path")]
    UnsupportedPlatform(String),
    #[error("bundled native library not found: {0}")]
    ResourceNotFound(String),
    #[error("failed to extract native library: {0}")]
    Extract(std::io::Error),
    #[error("failed to load native library: {0}")]
    Load(#[from] libloading::Error),
    #[error("native library is missing symbol {0}")]
    MissingSymbol(String),
}

/// Entry points resolved once at load time.
struct Symbols {
    detector_create: ffi::DetectorCreateFn,
    shape_predictor_create: ffi::ModelCreateFn,
    embedding_create: ffi::ModelCreateFn,
    handle_release: ffi::HandleReleaseFn,
    face_detect: ffi::FaceDetectFn,
    facial_landmarks: ffi::LandmarksFn,
    facial_landmarks_whole_image: ffi::LandmarksFn,
    face_embeddings: ffi::EmbeddingsFn,
    rect_list_free: ffi::RectListFreeFn,
    face_list_free: ffi::FaceListFreeFn,
}

impl Symbols {
    fn resolve(library: &Library) -> Result<Self, LoadError> {
        // SAFETY: each symbol is declared with the signature in ffi.rs; the
        // copied fn pointers are only used while `library` stays loaded.
        unsafe {
            Ok(Self {
                detector_create: symbol(library, ffi::SYM_DETECTOR_CREATE)?,
                shape_predictor_create: symbol(library, ffi::SYM_SHAPE_PREDICTOR_CREATE)?,
                embedding_create: symbol(library, ffi::SYM_EMBEDDING_CREATE)?,
                handle_release: symbol(library, ffi::SYM_HANDLE_RELEASE)?,
                face_detect: symbol(library, ffi::SYM_FACE_DETECT)?,
                facial_landmarks: symbol(library, ffi::SYM_FACIAL_LANDMARKS)?,
                facial_landmarks_whole_image: symbol(
                    library,
                    ffi::SYM_FACIAL_LANDMARKS_WHOLE_IMAGE,
                )?,
                face_embeddings: symbol(library, ffi::SYM_FACE_EMBEDDINGS)?,
                rect_list_free: symbol(library, ffi::SYM_RECT_LIST_FREE)?,
                face_list_free: symbol(library, ffi::SYM_FACE_LIST_FREE)?,
            })
        }
    }
}

/// # Safety
///
/// `T` must match the exported symbol's real type.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, LoadError> {
    // SAFETY: forwarded to the caller.
    match unsafe { library.get::<T>(name) } {
        Ok(sym) => Ok(*sym),
        Err(_) => Err(LoadError::MissingSymbol(
            String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned(),
        )),
    }
}

/// The loaded native library.
///
/// Field order matters: the symbols go first, the library is unloaded next,
/// and only then is the extracted temp file deleted.
pub struct NativeLibrary {
    symbols: Symbols,
    _library: Library,
    extracted: Option<TempPath>,
    path: PathBuf,
}

impl NativeLibrary {
    /// Extract this platform's bundled library and load it.
    pub fn load_bundled(bundle: &dyn ResourceBundle) -> Result<Self, LoadError> {
        let platform = Platform::detect().map_err(log_failure)?;
        Self::load_bundled_for(bundle, platform)
    }

    /// Extract `platform`'s bundled library and load it.
    pub fn load_bundled_for(
        bundle: &dyn ResourceBundle,
        platform: Platform,
    ) -> Result<Self, LoadError> {
        let resource = platform.resource_path();
        tracing::info!(
            ?platform,
            resource = %resource,
            bundle = %bundle.describe(),
            "loading bundled native library"
        );

        let extracted =
            extract_to_temp(bundle, &resource, platform.library_suffix()).map_err(log_failure)?;
        let path = extracted.to_path_buf();
        let mut lib = Self::load_path(&path).map_err(log_failure)?;
        lib.extracted = Some(extracted);
        Ok(lib)
    }

    /// Load an already-installed library from `path`; nothing is extracted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_path(path.as_ref()).map_err(log_failure)
    }

    fn load_path(path: &Path) -> Result<Self, LoadError> {
        // SAFETY: loading runs the library's initializers; the bundled Jdlib
        // build has no unsound ones.
        let library = unsafe { Library::new(path) }?;
        let symbols = Symbols::resolve(&library)?;
        tracing::info!(path = %path.display(), "native library loaded");
        Ok(Self {
            symbols,
            _library: library,
            extracted: None,
            path: path.to_path_buf(),
        })
    }

    /// Filesystem path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the library was extracted from a bundle into a temp file.
    pub fn is_extracted(&self) -> bool {
        self.extracted.is_some()
    }

    fn create_model(
        &self,
        create: ffi::ModelCreateFn,
        model_path: &str,
    ) -> Result<RawHandle, BackendError> {
        let c_path = CString::new(model_path)
            .map_err(|_| BackendError::InvalidPath(model_path.to_string()))?;
        // SAFETY: c_path is a valid NUL-terminated string alive for the call.
        Ok(unsafe { create(c_path.as_ptr()) })
    }

    fn take_rects(&self, list: *mut RawRectList) -> Option<Vec<Rect>> {
        if list.is_null() {
            return None;
        }
        // SAFETY: non-null list returned by the library, valid until freed below.
        let rects = unsafe { ffi::decode_rect_list(list) };
        // SAFETY: list came from this library and is freed exactly once.
        unsafe { (self.symbols.rect_list_free)(list) };
        rects
    }

    fn take_faces(&self, list: *mut RawFaceList) -> Option<Vec<FaceDescriptor>> {
        if list.is_null() {
            return None;
        }
        // SAFETY: non-null list returned by the library, valid until freed below.
        let faces = unsafe { ffi::decode_face_list(list) };
        // SAFETY: list came from this library and is freed exactly once.
        unsafe { (self.symbols.face_list_free)(list) };
        faces
    }
}

fn log_failure(err: LoadError) -> LoadError {
    tracing::error!(error = %err, "error during loading native library");
    err
}

impl VisionBackend for NativeLibrary {
    fn create_detector(&self) -> Result<RawHandle, BackendError> {
        // SAFETY: no arguments; returns a handle or 0.
        Ok(unsafe { (self.symbols.detector_create)() })
    }

    fn create_shape_predictor(&self, model_path: &str) -> Result<RawHandle, BackendError> {
        self.create_model(self.symbols.shape_predictor_create, model_path)
    }

    fn create_embedder(&self, model_path: &str) -> Result<RawHandle, BackendError> {
        self.create_model(self.symbols.embedding_create, model_path)
    }

    fn release(&self, kind: HandleKind, handle: RawHandle) {
        tracing::trace!(%kind, handle, "jdlib_handle_release");
        // SAFETY: handle was created by this library and is released once.
        unsafe { (self.symbols.handle_release)(handle) }
    }

    fn detect(
        &self,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<Rect>>, BackendError> {
        // SAFETY: pixels hold height*width*3 bytes and outlive the call.
        let list = unsafe {
            (self.symbols.face_detect)(
                detector,
                image.pixels().as_ptr(),
                image.height_i32(),
                image.width_i32(),
            )
        };
        Ok(self.take_rects(list))
    }

    fn landmarks(
        &self,
        mode: LandmarkMode,
        shape_predictor: RawHandle,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError> {
        let entry = match mode {
            LandmarkMode::PerFace => self.symbols.facial_landmarks,
            LandmarkMode::WholeImage => self.symbols.facial_landmarks_whole_image,
        };
        // SAFETY: pixels hold height*width*3 bytes and outlive the call.
        let list = unsafe {
            entry(
                shape_predictor,
                detector,
                image.pixels().as_ptr(),
                image.height_i32(),
                image.width_i32(),
            )
        };
        Ok(self.take_faces(list))
    }

    fn embeddings(
        &self,
        embedder: RawHandle,
        shape_predictor: RawHandle,
        detector: RawHandle,
        image: &ImageBuffer,
    ) -> Result<Option<Vec<FaceDescriptor>>, BackendError> {
        // SAFETY: pixels hold height*width*3 bytes and outlive the call.
        let list = unsafe {
            (self.symbols.face_embeddings)(
                embedder,
                shape_predictor,
                detector,
                image.pixels().as_ptr(),
                image.height_i32(),
                image.width_i32(),
            )
        };
        Ok(self.take_faces(list))
    }
}
