use std::{fs, io::ErrorKind, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    batch::error::{BatchError, ValidationError},
    generator::ImageSize,
};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_SIZE: &str = "1024x1024";
pub const DEFAULT_COUNT: i64 = 1;
pub const DEFAULT_DELAY_SECS: f64 = 2.0;

/// One entry of a batch document, exactly as written. Field types are only checked by
/// the accessors, so that a mistyped job is rejected on its own instead of failing the
/// whole document. A `null` field counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Value>,
}

/// A job with defaults applied and every field checked.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub prompt: String,
    pub provider: String,
    pub size: ImageSize,
    pub count: u32,
    pub delay: Duration,
}

fn typed<'a, T>(
    value: &'a Option<Value>,
    field: &'static str,
    expected: &'static str,
    cast: impl FnOnce(&'a Value) -> Option<T>,
) -> Result<Option<T>, ValidationError> {
    value
        .as_ref()
        .map(|v| {
            cast(v).ok_or_else(|| ValidationError::InvalidField {
                field,
                expected,
                found: v.to_string(),
            })
        })
        .transpose()
}

impl Job {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(Value::String(prompt.into())),
            ..Default::default()
        }
    }

    pub fn prompt(&self) -> Result<Option<&str>, ValidationError> {
        typed(&self.prompt, "prompt", "a string", Value::as_str)
    }

    pub fn provider(&self) -> Result<&str, ValidationError> {
        Ok(typed(&self.provider, "provider", "a string", Value::as_str)?.unwrap_or(DEFAULT_PROVIDER))
    }

    pub fn size(&self) -> Result<&str, ValidationError> {
        Ok(typed(&self.size, "size", "a string", Value::as_str)?.unwrap_or(DEFAULT_SIZE))
    }

    pub fn count(&self) -> Result<i64, ValidationError> {
        Ok(typed(&self.count, "count", "an integer", Value::as_i64)?.unwrap_or(DEFAULT_COUNT))
    }

    pub fn delay(&self) -> Result<f64, ValidationError> {
        Ok(typed(&self.delay, "delay", "a number", Value::as_f64)?.unwrap_or(DEFAULT_DELAY_SECS))
    }

    /// Applies defaults and checks field types and values. Does not know about providers.
    pub fn resolve(&self) -> Result<JobSpec, ValidationError> {
        let prompt = self.prompt()?.ok_or(ValidationError::MissingField("prompt"))?;
        if prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        let provider = self.provider()?;
        let size = self.size()?.parse::<ImageSize>()?;
        let count = self.count()?;
        let count = u32::try_from(count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ValidationError::InvalidCount(count))?;
        let delay = self.delay()?;
        let delay = Duration::try_from_secs_f64(delay)
            .map_err(|_| ValidationError::InvalidDelay(delay))?;

        Ok(JobSpec {
            prompt: prompt.to_string(),
            provider: provider.to_string(),
            size,
            count,
            delay,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchDocument {
    pub jobs: Vec<Job>,
}

impl BatchDocument {
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let src = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => BatchError::NotFound(path.to_path_buf()),
            _ => BatchError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        src.parse()
    }
}

impl std::str::FromStr for BatchDocument {
    type Err = BatchError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let document: Value = serde_json::from_str(src)
            .map_err(|e| BatchError::Malformed(format!("invalid JSON: {e}")))?;

        let jobs = document
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| BatchError::Malformed("batch file must contain a 'jobs' array".into()))?;

        let jobs = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| {
                if !job.is_object() {
                    return Err(BatchError::Malformed(format!(
                        "job {} must be an object, found {job}",
                        i + 1
                    )));
                }
                serde_json::from_value(job.clone())
                    .map_err(|e| BatchError::Malformed(format!("job {}: {e}", i + 1)))
            })
            .collect::<Result<Vec<Job>, _>>()?;

        Ok(Self { jobs })
    }
}
