use crate::generator::ImageGenerator;

pub mod batch;
pub mod config;
pub mod generator;
pub mod naming;
pub mod registry;

pub type GenBox = Box<dyn ImageGenerator + Send + Sync>;

pub use batch::{BatchReport, BatchRunner};
pub use config::Config;
pub use generator::{ConfigurationError, GenerationRequest, ImageSize, Provider};
pub use registry::GeneratorRegistry;
