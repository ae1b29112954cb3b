use std::{
    fmt,
    fs::OpenOptions,
    future::Future,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    pin::Pin,
    str::FromStr,
};

use color_eyre::{Result, eyre::bail};
use log::{error, info};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::GenBox;

pub mod openai;
pub use openai::OpenAiGenerator;

pub mod stability;
pub use stability::StabilityGenerator;

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    EnumString,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[value(name = "openai")]
    OpenAi,
    Stability,
}

impl Provider {
    /// Identifier used in batch documents, config keys and artifact names.
    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Stability => "stability",
        }
    }

    pub fn make(&self, api_key: Option<String>) -> GenBox {
        match self {
            Provider::OpenAi => Box::new(OpenAiGenerator::new(api_key)),
            Provider::Stability => Box::new(StabilityGenerator::new(api_key)),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{provider} API key not configured")]
    MissingApiKey { provider: Provider },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid image size {0:?}, expected WIDTHxHEIGHT with positive integers")]
pub struct InvalidSize(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::new(1024, 1024)
    }
}

impl FromStr for ImageSize {
    type Err = InvalidSize;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || InvalidSize(s.to_string());
        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub count: u32,
    pub output_dir: PathBuf,
}

pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Vec<PathBuf>, ConfigurationError>> + Send + 'a>>;

/// A provider that turns a prompt into image files on disk.
///
/// A missing credential is reported as [`ConfigurationError`] before any network
/// traffic. Every other failure is logged and yields an empty list of paths.
pub trait ImageGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a>;

    fn provider(&self) -> &str;
}

pub(crate) fn require_api_key(
    api_key: Option<&str>,
    provider: Provider,
) -> std::result::Result<&str, ConfigurationError> {
    api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigurationError::MissingApiKey { provider })
}

/// Creates the output directory, then drives the transport. Failures end up in the log
/// and as an empty result.
pub(crate) async fn run_transport(
    provider: Provider,
    output_dir: &Path,
    transport: impl Future<Output = Result<Vec<PathBuf>>>,
) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!(
            "Could not create output directory {}: {e}",
            output_dir.display()
        );
        return vec![];
    }

    match transport.await {
        Ok(paths) => {
            info!("{provider}: saved {} image(s) to {}", paths.len(), output_dir.display());
            paths
        }
        Err(e) => {
            error!("{provider} generation failed: {e:?}");
            vec![]
        }
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Writes `bytes` as `file_name`, or as `<stem>-2.<ext>`, `<stem>-3.<ext>`, ... when an
/// earlier artifact already holds the name. Existing files are never overwritten.
pub(crate) fn save_artifact(output_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, "png"));

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = match attempt {
            1 => output_dir.join(file_name),
            n => output_dir.join(format!("{stem}-{n}.{ext}")),
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    bail!(
        "No free file name for {file_name} in {}",
        output_dir.display()
    )
}
