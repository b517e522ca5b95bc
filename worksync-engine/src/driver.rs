//! Workflow driver
//!
//! Runs the reconciliation engine over a pipeline, one job at a time, in the
//! order the graph builder placed them. The first failing job aborts the run;
//! jobs after it are left for the next run.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use worksync_client::Platform;
use worksync_core::domain::bundle::BundleState;

use crate::engine::{ReconciliationEngine, UpsertResult};
use crate::error::Result;
use crate::graph::{DependencyGraphBuilder, PipelineTemplate};

/// Default interval between bundle state polls when waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Settings for one reconciliation run
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Name of the target worksheet
    pub worksheet: String,
    pub pipeline: PipelineTemplate,
    /// Bundle to wait for after submission, usually the last job
    pub wait_for: Option<String>,
    pub poll_interval: Duration,
}

impl DriverConfig {
    pub fn new(worksheet: impl Into<String>, pipeline: PipelineTemplate) -> Self {
        Self {
            worksheet: worksheet.into(),
            pipeline,
            wait_for: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of upserting one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub name: String,
    pub result: UpsertResult,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub worksheet: String,
    /// One entry per job, in submission order
    pub outcomes: Vec<JobOutcome>,
    /// Terminal state of the awaited bundle, if any
    pub waited: Option<BundleState>,
}

impl RunReport {
    pub fn submitted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.submitted())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.submitted()
    }
}

/// Drives a whole pipeline to its desired state
pub struct WorkflowDriver {
    platform: Arc<dyn Platform>,
    config: DriverConfig,
}

impl WorkflowDriver {
    pub fn new(platform: Arc<dyn Platform>, config: DriverConfig) -> Self {
        Self { platform, config }
    }

    /// Build the job graph and upsert every job in order
    ///
    /// The graph is validated before the worksheet is contacted, so a broken
    /// template never causes a platform call.
    ///
    /// # Errors
    /// Returns the first error raised; jobs after the failing one are not
    /// attempted.
    pub async fn run(&self) -> Result<RunReport> {
        let jobs = DependencyGraphBuilder::new(&self.config.pipeline).build()?;
        info!("Pipeline expanded to {} job(s)", jobs.len());

        let mut engine =
            ReconciliationEngine::connect(Arc::clone(&self.platform), &self.config.worksheet)
                .await?;

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let result = match engine.upsert(job).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Job {} failed: {}", job.name, e);
                    return Err(e);
                }
            };

            info!("Job {}: {}", job.name, result);
            outcomes.push(JobOutcome {
                name: job.name.clone(),
                result,
            });
        }

        let waited = match &self.config.wait_for {
            Some(name) => {
                info!("Waiting for bundle {} to finish", name);
                let state = self
                    .platform
                    .wait(engine.worksheet(), name, self.config.poll_interval)
                    .await?;
                info!("Bundle {} finished: {}", name, state);
                Some(state)
            }
            None => None,
        };

        Ok(RunReport {
            worksheet: engine.worksheet().name.clone(),
            outcomes,
            waited,
        })
    }
}
