//! Bundled resources and extraction of the native library to a temp file.

use crate::library::LoadError;
use crate::platform::LIBRARY_NAME;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Read-only store of named binary resources.
pub trait ResourceBundle {
    /// Open the resource at a `/`-separated logical path.
    fn open(&self, logical_path: &str) -> io::Result<Box<dyn Read + '_>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Resources laid out under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, logical_path: &str) -> PathBuf {
        logical_path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl ResourceBundle for DirBundle {
    fn open(&self, logical_path: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.resolve(logical_path))?;
        Ok(Box::new(file))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Resources compiled into the binary, typically with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct StaticBundle {
    entries: HashMap<&'static str, &'static [u8]>,
}

impl StaticBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, logical_path: &'static str, bytes: &'static [u8]) -> Self {
        self.entries.insert(logical_path, bytes);
        self
    }
}

impl ResourceBundle for StaticBundle {
    fn open(&self, logical_path: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.entries.get(logical_path) {
            Some(bytes) => Ok(Box::new(*bytes)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no embedded resource {logical_path}"),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("<embedded: {} entries>", self.entries.len())
    }
}

/// Copy a bundled resource into a uniquely named temp file and close it.
///
/// The file is deleted when the returned path is dropped.
pub fn extract_to_temp(
    bundle: &dyn ResourceBundle,
    logical_path: &str,
    suffix: &str,
) -> Result<TempPath, LoadError> {
    let mut reader = bundle.open(logical_path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LoadError::ResourceNotFound(format!("{logical_path} in {}", bundle.describe()))
        } else {
            LoadError::Extract(e)
        }
    })?;

    let mut file = tempfile::Builder::new()
        .prefix(LIBRARY_NAME)
        .suffix(suffix)
        .tempfile()
        .map_err(LoadError::Extract)?;

    let written = io::copy(&mut reader, &mut file).map_err(LoadError::Extract)?;
    file.flush().map_err(LoadError::Extract)?;

    let path = file.into_temp_path();
    tracing::debug!(
        resource = logical_path,
        path = %path.display(),
        bytes = written,
        "extracted native library"
    );
    Ok(path)
}
