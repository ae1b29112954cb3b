use log::warn;

use crate::{
    GeneratorRegistry,
    batch::{
        error::ValidationError,
        job::{Job, JobSpec},
    },
};

/// Checks a job against the registry without touching either.
///
/// The prompt's presence is checked before the provider so that a job missing both
/// reports the missing field. Field values are checked last.
pub fn validate_job(job: &Job, registry: &GeneratorRegistry) -> Result<JobSpec, ValidationError> {
    let result = check(job, registry);
    if let Err(e) = &result {
        warn!("{e}");
    }
    result
}

fn check(job: &Job, registry: &GeneratorRegistry) -> Result<JobSpec, ValidationError> {
    if job.prompt.is_none() {
        return Err(ValidationError::MissingField("prompt"));
    }

    let provider = job.provider()?;
    if !registry.contains(provider) {
        return Err(ValidationError::UnknownProvider(provider.to_string()));
    }

    job.resolve()
}
