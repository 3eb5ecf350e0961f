use anyhow::{Context, Result};
use jdlib_core::DEFAULT_MATCH_DISTANCE;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration. Sources, lowest to highest precedence: built-in
/// defaults, an optional TOML file, `JDLIB_*` environment variables, flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Load this installed library instead of extracting the bundled one.
    pub library_path: Option<PathBuf>,
    /// Directory holding `native/<platform>/<library>`.
    pub resource_dir: PathBuf,
    /// dlib shape predictor model.
    pub landmark_model: String,
    /// dlib face recognition model. Embedding commands need it.
    pub embedding_model: Option<String>,
    /// Euclidean distance under which two faces are the same person.
    pub match_distance: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_path: None,
            resource_dir: PathBuf::from("resources"),
            landmark_model: "shape_predictor_68_face_landmarks.dat".to_string(),
            embedding_model: None,
            match_distance: DEFAULT_MATCH_DISTANCE,
        }
    }
}

impl Config {
    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply `JDLIB_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("JDLIB_LIBRARY_PATH") {
            self.library_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("JDLIB_RESOURCE_DIR") {
            self.resource_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("JDLIB_LANDMARK_MODEL") {
            self.landmark_model = v;
        }
        if let Some(v) = lookup("JDLIB_EMBEDDING_MODEL") {
            self.embedding_model = Some(v);
        }
        if let Some(v) = lookup("JDLIB_MATCH_DISTANCE").and_then(|v| v.parse().ok()) {
            self.match_distance = v;
        }
        self
    }
}
