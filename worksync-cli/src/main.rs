//! Worksync CLI
//!
//! Reconciles a worksheet against a pipeline description: every job whose
//! bundle is missing or failed is (re)submitted, healthy bundles are left
//! untouched. Running it twice in a row submits nothing the second time.

mod config;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worksync_client::PlatformClient;
use worksync_engine::{DriverConfig, WorkflowDriver};

use crate::config::{Config, DEFAULT_SERVER};

#[derive(Parser)]
#[command(name = "worksync")]
#[command(about = "Reconcile a worksheet against a pipeline of named bundles", long_about = None)]
struct Cli {
    /// Worksheet server URL
    #[arg(long, env = "WORKSYNC_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Bearer token for the server
    #[arg(long, env = "WORKSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Wait for the final job to finish
    #[arg(long)]
    wait: bool,

    /// Seconds between state polls while waiting
    #[arg(long, default_value = "30")]
    poll_interval: u64,

    /// Directory containing pipeline.json
    pipeline_dir: PathBuf,

    /// Name of the target worksheet (created if absent)
    worksheet: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            server: cli.server,
            token: cli.token,
            pipeline_dir: cli.pipeline_dir,
            worksheet: cli.worksheet,
            wait: cli.wait,
            poll_interval: Duration::from_secs(cli.poll_interval),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "worksync=info,worksync_engine=info,worksync_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(Cli::parse());
    config.validate().context("Invalid configuration")?;

    let template = pipeline::load(&config.pipeline_file())?;
    info!(
        "Loaded pipeline: {} prerequisite(s), {} scenario(s), {} model(s)",
        template.prerequisites.len(),
        template.scenarios.len(),
        template.models.len()
    );

    let mut client = PlatformClient::new(&config.server);
    if let Some(token) = &config.token {
        client = client.with_token(token);
    }

    let mut driver_config = DriverConfig::new(&config.worksheet, template);
    driver_config.poll_interval = config.poll_interval;
    if config.wait {
        driver_config.wait_for = Some(pipeline::final_job(&driver_config.pipeline).to_string());
    }

    let driver = WorkflowDriver::new(Arc::new(client), driver_config);
    let report = match driver.run().await {
        Ok(report) => report,
        Err(e) => {
            let context = report::failure_context(&e, &config.worksheet);
            return Err(anyhow::Error::new(e).context(context));
        }
    };

    report::print_report(&report);
    Ok(())
}
