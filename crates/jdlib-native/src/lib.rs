//! jdlib-native: loads the bundled Jdlib shared library and exposes it as a
//! [`VisionBackend`](jdlib_core::VisionBackend).
//!
//! The platform's build is copied out of a [`ResourceBundle`] into a temp
//! file, loaded with `libloading`, and its C entry points resolved up front.
//! Load failures are returned, never swallowed.

#![warn(unsafe_op_in_unsafe_fn)]

pub mod ffi;
pub mod library;
pub mod platform;
pub mod resources;

pub use library::{LoadError, NativeLibrary};
pub use platform::Platform;
pub use resources::{DirBundle, ResourceBundle, StaticBundle};

use jdlib_core::Jdlib;

/// A façade over the real native library.
pub type NativeJdlib = Jdlib<NativeLibrary>;

/// Load the bundled library and wrap it in a façade.
///
/// Without `embedding_model`, embedding queries fail with
/// [`JdlibError::MissingEmbeddingModel`](jdlib_core::JdlibError::MissingEmbeddingModel).
pub fn load_bundled(
    bundle: &dyn ResourceBundle,
    landmark_model: &str,
    embedding_model: Option<&str>,
) -> Result<NativeJdlib, LoadError> {
    let library = NativeLibrary::load_bundled(bundle)?;
    Ok(wrap(library, landmark_model, embedding_model))
}

/// Wrap an already loaded library in a façade.
pub fn wrap(
    library: NativeLibrary,
    landmark_model: &str,
    embedding_model: Option<&str>,
) -> NativeJdlib {
    match embedding_model {
        Some(embedding) => Jdlib::with_embedding_model(library, landmark_model, embedding),
        None => Jdlib::new(library, landmark_model),
    }
}
