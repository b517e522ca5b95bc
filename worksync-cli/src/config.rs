//! Configuration module
//!
//! Settings for one `worksync` invocation, assembled from command-line
//! arguments and their environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

/// Server used when neither `--server` nor `WORKSYNC_SERVER` is given
pub const DEFAULT_SERVER: &str = "https://worksheets.codalab.org";

/// File inside the pipeline directory describing the jobs
pub const PIPELINE_FILE: &str = "pipeline.json";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Worksheet server base URL
    pub server: String,

    /// Bearer token for the server, if it requires one
    pub token: Option<String>,

    /// Directory holding `pipeline.json`
    pub pipeline_dir: PathBuf,

    /// Target worksheet name
    pub worksheet: String,

    /// Block until the final job settles
    pub wait: bool,

    /// How often to poll while waiting
    pub poll_interval: Duration,
}

impl Config {
    /// Path of the pipeline description
    pub fn pipeline_file(&self) -> PathBuf {
        self.pipeline_dir.join(PIPELINE_FILE)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.is_empty() {
            anyhow::bail!("server cannot be empty");
        }

        if !self.server.starts_with("http://") && !self.server.starts_with("https://") {
            anyhow::bail!("server must start with http:// or https://");
        }

        if self.worksheet.trim().is_empty() {
            anyhow::bail!("worksheet cannot be empty");
        }

        if self.token.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("token cannot be empty when given");
        }

        if self.wait && self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        Ok(())
    }
}
