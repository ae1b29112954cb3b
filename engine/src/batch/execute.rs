use std::path::{Path, PathBuf};

use log::info;

use crate::{
    GeneratorRegistry,
    batch::{
        error::{ExecuteError, ValidationError},
        job::Job,
    },
    generator::GenerationRequest,
    naming::job_dir_name,
};

/// Runs one job through its provider's generator, writing into
/// `output_dir/job_NNNN`. Errors are returned to the caller, which decides whether they
/// are fatal.
pub async fn execute_job(
    job: &Job,
    registry: &GeneratorRegistry,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExecuteError> {
    let spec = job.resolve()?;
    let generator = registry
        .get(&spec.provider)
        .ok_or_else(|| ValidationError::UnknownProvider(spec.provider.clone()))?;
    let job_output = output_dir.join(job_dir_name(&spec.prompt));

    info!("Prompt: {}", spec.prompt);
    info!("Provider: {}", spec.provider);
    info!("Size: {}, Count: {}", spec.size, spec.count);
    info!("Output: {}", job_output.display());

    let request = GenerationRequest {
        prompt: spec.prompt,
        size: spec.size,
        count: spec.count,
        output_dir: job_output,
    };

    Ok(generator.generate(&request).await?)
}
