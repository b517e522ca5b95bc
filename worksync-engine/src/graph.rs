//! Dependency graph construction
//!
//! Expands a pipeline template into the ordered list of jobs to reconcile.
//! The graph is layered by construction:
//!
//! ```text
//! prerequisites → scenario caches → scenario × model evaluations → aggregation → post-processing
//! ```
//!
//! Every job only references jobs placed before it, so submitting the list in
//! order never submits a job ahead of its dependencies.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use worksync_core::command::{Command, Operation};
use worksync_core::domain::job::{Job, Visibility};
use worksync_core::naming;

use crate::error::GraphError;

/// Placeholder replaced with the scenario description in step templates
pub const SCENARIO_PLACEHOLDER: &str = "{scenario}";
/// Placeholder replaced with the model name in step templates
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Declarative description of an evaluation pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineTemplate {
    /// Upload and setup jobs, in declaration order
    #[serde(default)]
    pub prerequisites: Vec<JobTemplate>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
    #[serde(default)]
    pub models: Vec<String>,
    /// Job caching one scenario's data
    pub cache: StepTemplate,
    /// Job evaluating one model on one scenario
    pub evaluation: StepTemplate,
    /// Job depending on every evaluation
    pub aggregation: JobTemplate,
    /// Optional job after aggregation, also depending on every evaluation
    #[serde(default)]
    pub post_processing: Option<JobTemplate>,
}

/// A scenario to evaluate
///
/// Accepts either a bare string or `{ "description": ..., "cache": ... }`.
/// Scenarios sharing a cache key share a single cache job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ScenarioEntry")]
pub struct ScenarioSpec {
    pub description: String,
    pub cache: Option<String>,
}

impl ScenarioSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cache: None,
        }
    }

    /// The scenario whose cached data this one reads
    pub fn cache_key(&self) -> &str {
        self.cache.as_deref().unwrap_or(&self.description)
    }

    /// Bundle name of this scenario's cache job
    pub fn cache_job_name(&self) -> String {
        naming::encode(self.cache_key())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioEntry {
    Plain(String),
    Detailed {
        description: String,
        #[serde(default)]
        cache: Option<String>,
    },
}

impl From<ScenarioEntry> for ScenarioSpec {
    fn from(entry: ScenarioEntry) -> Self {
        match entry {
            ScenarioEntry::Plain(description) => ScenarioSpec::new(description),
            ScenarioEntry::Detailed { description, cache } => ScenarioSpec { description, cache },
        }
    }
}

/// A single named job
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobTemplate {
    pub name: String,
    #[serde(default = "default_operation")]
    pub operation: Operation,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Positional arguments, e.g. the paths of an upload
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Shell command of a run
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
    #[serde(default)]
    pub visibility: Visibility,
}

/// A job repeated per scenario (and model), named by the builder
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepTemplate {
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub shell: String,
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
}

fn default_operation() -> Operation {
    Operation::Run
}

impl JobTemplate {
    fn to_job(&self, extra_dependencies: &[String]) -> Result<Job, GraphError> {
        let arguments = self.arguments.iter().chain(self.shell.iter()).cloned();
        let dependencies = self.dependencies.iter().chain(extra_dependencies).cloned();

        let command = build_command(
            &self.name,
            self.operation.clone(),
            arguments,
            dependencies,
            &self.flags,
        )?;
        Ok(Job::new(&self.name, command).with_visibility(self.visibility))
    }
}

impl StepTemplate {
    fn to_job(
        &self,
        name: String,
        scenario: &str,
        model: Option<&str>,
        extra_dependencies: &[String],
    ) -> Result<Job, GraphError> {
        let mut shell = self.shell.replace(SCENARIO_PLACEHOLDER, scenario);
        if let Some(model) = model {
            shell = shell.replace(MODEL_PLACEHOLDER, model);
        }

        let dependencies = self.dependencies.iter().chain(extra_dependencies).cloned();
        let command = build_command(&name, Operation::Run, [shell], dependencies, &self.flags)?;
        Ok(Job::new(name, command))
    }
}

fn build_command(
    job: &str,
    operation: Operation,
    arguments: impl IntoIterator<Item = String>,
    dependencies: impl IntoIterator<Item = String>,
    flags: &BTreeMap<String, String>,
) -> Result<Command, GraphError> {
    let to_graph_error = |source| GraphError::Command {
        job: job.to_string(),
        source,
    };

    let mut command = Command::new(operation, arguments).map_err(to_graph_error)?;
    for dependency in dependencies {
        command = command.with_dependency(dependency);
    }
    for (key, value) in flags {
        command = command.with_flag(key, value).map_err(to_graph_error)?;
    }
    Ok(command)
}

/// Builds the ordered job list for a pipeline template
pub struct DependencyGraphBuilder<'a> {
    template: &'a PipelineTemplate,
    placed: IndexMap<String, Job>,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(template: &'a PipelineTemplate) -> Self {
        Self {
            template,
            placed: IndexMap::new(),
        }
    }

    /// Expand the template into jobs in submission order
    ///
    /// # Errors
    /// - [`GraphError::EmptyPipeline`] without scenarios or models
    /// - [`GraphError::UnresolvedDependency`] if a job references a job not
    ///   placed before it
    /// - [`GraphError::DuplicateJob`] if two distinct jobs share a name
    pub fn build(mut self) -> Result<Vec<Job>, GraphError> {
        let template = self.template;
        if template.scenarios.is_empty() || template.models.is_empty() {
            return Err(GraphError::EmptyPipeline);
        }

        for prerequisite in &template.prerequisites {
            self.place(prerequisite.to_job(&[])?)?;
        }

        let mut caches = HashSet::new();
        for scenario in &template.scenarios {
            let name = scenario.cache_job_name();
            if !caches.insert(name.clone()) {
                continue;
            }
            let job = template
                .cache
                .to_job(name, scenario.cache_key(), None, &[])?;
            self.place(job)?;
        }

        let mut evaluations = Vec::new();
        for scenario in &template.scenarios {
            let cache = [scenario.cache_job_name()];
            for model in &template.models {
                let name = naming::evaluation_job_name(&scenario.description, model);
                let job = template.evaluation.to_job(
                    name.clone(),
                    &scenario.description,
                    Some(model),
                    &cache,
                )?;
                self.place(job)?;
                evaluations.push(name);
            }
        }

        self.place(template.aggregation.to_job(&evaluations)?)?;
        if let Some(post_processing) = &template.post_processing {
            self.place(post_processing.to_job(&evaluations)?)?;
        }

        Ok(self.placed.into_values().collect())
    }

    fn place(&mut self, job: Job) -> Result<(), GraphError> {
        if !naming::is_valid(&job.name) {
            return Err(GraphError::InvalidName(job.name));
        }
        if self.placed.contains_key(&job.name) {
            return Err(GraphError::DuplicateJob(job.name));
        }
        if let Some(missing) = job
            .dependencies
            .iter()
            .find(|dependency| !self.placed.contains_key(dependency.as_str()))
        {
            return Err(GraphError::UnresolvedDependency {
                job: job.name.clone(),
                dependency: missing.clone(),
            });
        }

        self.placed.insert(job.name.clone(), job);
        Ok(())
    }
}
