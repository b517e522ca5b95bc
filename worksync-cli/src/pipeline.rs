//! Pipeline loading
//!
//! Reads the pipeline template from a pipeline directory.

use anyhow::{Context, Result};
use std::path::Path;
use worksync_engine::PipelineTemplate;

/// Load and parse a `pipeline.json` file
///
/// # Arguments
/// * `path` - Path to the pipeline file
///
/// # Errors
/// Fails if the file cannot be read or is not a valid pipeline template
pub fn load(path: &Path) -> Result<PipelineTemplate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline file {}", path.display()))
}

/// Name of the job to wait for: post-processing if present, else aggregation
pub fn final_job(template: &PipelineTemplate) -> &str {
    template
        .post_processing
        .as_ref()
        .unwrap_or(&template.aggregation)
        .name
        .as_str()
}
