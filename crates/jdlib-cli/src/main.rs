use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::DynamicImage;
use jdlib_core::{FaceDescriptor, LandmarkMode};
use jdlib_native::{DirBundle, NativeJdlib, NativeLibrary, Platform};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(
    name = "jdlib",
    about = "Face detection, landmarks and embeddings via the Jdlib native library"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Load an installed native library instead of the bundled one
    #[arg(long, global = true)]
    library: Option<PathBuf>,
    /// Directory containing native/<platform>/<library>
    #[arg(long, global = true)]
    resources: Option<PathBuf>,
    /// Shape predictor (landmark) model file
    #[arg(long, global = true)]
    landmarks: Option<String>,
    /// Face recognition (embedding) model file
    #[arg(long, global = true)]
    embedding: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print face bounding boxes
    Detect { image: PathBuf },
    /// Print face boxes with landmark points
    Landmarks {
        image: PathBuf,
        /// Fit landmarks over the whole image instead of per detection
        #[arg(long)]
        whole_image: bool,
    },
    /// Print face boxes with embedding vectors
    Embed { image: PathBuf },
    /// Compare the first face of two images
    Compare {
        first: PathBuf,
        second: PathBuf,
        /// Maximum Euclidean distance for a match
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Show platform and library resolution without loading anything
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = apply_flags(Config::load(cli.config.as_deref())?, &cli);
    tracing::debug!(?config, "configuration resolved");

    let output = match &cli.command {
        Commands::Info => info(&config),
        Commands::Detect { image } => {
            let img = open_image(image)?;
            let faces = open_jdlib(&config)?.detect_faces(&img)?;
            serde_json::json!({
                "image": image.display().to_string(),
                "width": img.width(),
                "height": img.height(),
                "faces": faces,
            })
        }
        Commands::Landmarks { image, whole_image } => {
            let img = open_image(image)?;
            let mode = if *whole_image { LandmarkMode::WholeImage } else { LandmarkMode::PerFace };
            let mut jdlib = open_jdlib(&config)?;
            let faces = match mode {
                LandmarkMode::PerFace => jdlib.landmarks_per_face(&img)?,
                LandmarkMode::WholeImage => jdlib.landmarks_whole_image(&img)?,
            };
            serde_json::json!({
                "image": image.display().to_string(),
                "mode": mode,
                "faces": faces,
            })
        }
        Commands::Embed { image } => {
            let img = open_image(image)?;
            let faces = open_jdlib(&config)?.face_embeddings(&img)?;
            serde_json::json!({
                "image": image.display().to_string(),
                "faces": faces,
            })
        }
        Commands::Compare { first, second, threshold } => {
            let threshold = threshold.unwrap_or(config.match_distance);
            let mut jdlib = open_jdlib(&config)?;
            let a = first_face(jdlib.face_embeddings(&open_image(first)?)?, first)?;
            let b = first_face(jdlib.face_embeddings(&open_image(second)?)?, second)?;
            compare_faces(&a, &b, threshold)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Command-line flags win over file and environment settings.
fn apply_flags(mut config: Config, cli: &Cli) -> Config {
    if let Some(path) = &cli.library {
        config.library_path = Some(path.clone());
    }
    if let Some(dir) = &cli.resources {
        config.resource_dir = dir.clone();
    }
    if let Some(model) = &cli.landmarks {
        config.landmark_model = model.clone();
    }
    if let Some(model) = &cli.embedding {
        config.embedding_model = Some(model.clone());
    }
    config
}

fn open_jdlib(config: &Config) -> Result<NativeJdlib> {
    let library = match &config.library_path {
        Some(path) => NativeLibrary::open(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let bundle = DirBundle::new(&config.resource_dir);
            NativeLibrary::load_bundled(&bundle).with_context(|| {
                format!("loading bundled library from {}", config.resource_dir.display())
            })?
        }
    };
    Ok(jdlib_native::wrap(
        library,
        &config.landmark_model,
        config.embedding_model.as_deref(),
    ))
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("decoding {}", path.display()))
}

fn first_face(faces: Vec<FaceDescriptor>, image: &Path) -> Result<FaceDescriptor> {
    match faces.into_iter().next() {
        Some(face) => Ok(face),
        None => bail!("no face detected in {}", image.display()),
    }
}

fn compare_faces(
    a: &FaceDescriptor,
    b: &FaceDescriptor,
    threshold: f32,
) -> Result<serde_json::Value> {
    let distance = a
        .distance_to(b)
        .context("faces lack comparable embeddings (missing, empty or different lengths)")?;
    Ok(serde_json::json!({
        "distance": distance,
        "threshold": threshold,
        "matched": a.matches(b, threshold),
    }))
}

fn info(config: &Config) -> serde_json::Value {
    let platform = Platform::detect();
    let (platform_name, resource) = match &platform {
        Ok(p) => (format!("{p:?}"), Some(p.resource_path())),
        Err(e) => (e.to_string(), None),
    };
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "platform": platform_name,
        "resource": resource,
        "resource_dir": config.resource_dir.display().to_string(),
        "library_path": config.library_path.as_ref().map(|p| p.display().to_string()),
        "landmark_model": jdlib_core::normalize_model_path(&config.landmark_model),
        "embedding_model": config.embedding_model.as_deref().map(jdlib_core::normalize_model_path),
    })
}
