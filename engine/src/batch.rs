use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    time::Duration,
};

use log::{error, info, warn};

use crate::GeneratorRegistry;

pub mod error;
pub use error::{BatchError, ExecuteError, ValidationError};

pub mod job;
pub use job::{BatchDocument, Job, JobSpec};

mod execute;
pub use execute::execute_job;

mod validate;
pub use validate::validate_job;

/// Waits between two consecutive jobs.
pub trait Pacer {
    fn pause<'a>(&'a self, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    fn pause<'a>(&'a self, delay: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(delay))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Succeeded(Vec<PathBuf>),
    /// Failed validation and never reached a generator.
    Rejected(ValidationError),
    /// The generator ran but produced nothing.
    NoImages,
    Errored(ExecuteError),
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// 1-based position in the batch document.
    pub index: usize,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            outcomes: Vec::with_capacity(total),
            ..Default::default()
        }
    }

    fn record(&mut self, index: usize, status: JobStatus) {
        if status.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(JobOutcome { index, status });
    }

    /// A batch succeeds when at least one job did.
    pub fn succeeded(&self) -> bool {
        self.successful > 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Successful: {}", self.successful)?;
        writeln!(f, "Failed: {}", self.failed)?;
        write!(f, "Total: {}", self.total)
    }
}

/// Runs batch documents one job at a time, pausing between jobs.
pub struct BatchRunner<P = TokioPacer> {
    registry: GeneratorRegistry,
    pacer: P,
}

impl BatchRunner {
    pub fn new(registry: GeneratorRegistry) -> Self {
        Self::with_pacer(registry, TokioPacer)
    }
}

impl<P: Pacer> BatchRunner<P> {
    pub fn with_pacer(registry: GeneratorRegistry, pacer: P) -> Self {
        Self { registry, pacer }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Loads `source` and runs it. Only a missing or malformed document is an error;
    /// job failures are recorded in the report.
    pub async fn run(&self, source: &Path, output_dir: &Path) -> Result<BatchReport, BatchError> {
        let document = BatchDocument::load(source)?;
        Ok(self.run_document(&document, output_dir).await)
    }

    /// Like [`BatchRunner::run`], reduced to whether any job succeeded.
    pub async fn process_batch_file(&self, source: &Path, output_dir: &Path) -> bool {
        match self.run(source, output_dir).await {
            Ok(report) => report.succeeded(),
            Err(e) => {
                error!("{e}");
                false
            }
        }
    }

    pub async fn run_document(&self, document: &BatchDocument, output_dir: &Path) -> BatchReport {
        let total = document.jobs.len();
        info!("Processing {total} batch jobs...");
        let mut report = BatchReport::new(total);

        for (i, job) in document.jobs.iter().enumerate() {
            let index = i + 1;
            info!("--- Job {index}/{total} ---");

            let spec = match validate_job(job, &self.registry) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!("Skipping invalid job {index}");
                    report.record(index, JobStatus::Rejected(e));
                    continue;
                }
            };

            let status = match execute_job(job, &self.registry, output_dir).await {
                Ok(artifacts) if !artifacts.is_empty() => {
                    info!("Job {index} completed successfully");
                    JobStatus::Succeeded(artifacts)
                }
                Ok(_) => {
                    error!("Job {index} failed: no images were generated");
                    JobStatus::NoImages
                }
                Err(e) => {
                    error!("Error processing job {index}: {e}");
                    JobStatus::Errored(e)
                }
            };
            report.record(index, status);

            if index < total {
                info!(
                    "Waiting {} seconds before next job...",
                    spec.delay.as_secs_f64()
                );
                self.pacer.pause(spec.delay).await;
            }
        }

        info!(
            "Batch complete: {} successful, {} failed, {} total",
            report.successful, report.failed, report.total
        );
        report
    }
}
