//! Platform abstraction
//!
//! The reconciliation engine only ever talks to the worksheet server through
//! this trait. [`PlatformClient`] implements it over HTTP; tests substitute an
//! in-memory implementation.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use worksync_core::domain::bundle::BundleState;
use worksync_core::domain::permission::{AccessLevel, VisibilityTarget};
use worksync_core::dto::worksheet::{WorksheetHandle, WorksheetInfo, WorksheetItem};

use crate::PlatformClient;
use crate::error::{ClientError, Result};

/// Operations the engine needs from the remote execution platform
///
/// Every call is a blocking round trip from the caller's point of view.
/// Implementations must not retry on their own.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolve a worksheet by name, creating it if absent
    async fn resolve_worksheet(&self, name: &str) -> Result<WorksheetHandle>;

    /// Fetch the worksheet with its items and their bundles
    async fn fetch_worksheet(&self, worksheet: &WorksheetHandle) -> Result<WorksheetInfo>;

    /// Submit a bundle-creating command
    ///
    /// The new bundle is only observable through a later fetch.
    async fn submit(&self, worksheet: &WorksheetHandle, tokens: &[String]) -> Result<()>;

    /// Rename a bundle on the worksheet
    async fn rename(&self, worksheet: &WorksheetHandle, name: &str, new_name: &str) -> Result<()>;

    /// Set the public group's access to the worksheet or one of its bundles
    async fn set_visibility(
        &self,
        worksheet: &WorksheetHandle,
        target: &VisibilityTarget,
        level: AccessLevel,
    ) -> Result<()>;

    /// Items currently attached to the worksheet
    async fn fetch_items(&self, worksheet: &WorksheetHandle) -> Result<Vec<WorksheetItem>> {
        Ok(self.fetch_worksheet(worksheet).await?.items)
    }

    /// Current public access to the worksheet or one of its bundles
    ///
    /// # Returns
    /// `None` if the server did not report the access level
    async fn visibility(
        &self,
        worksheet: &WorksheetHandle,
        target: &VisibilityTarget,
    ) -> Result<Option<AccessLevel>> {
        let info = self.fetch_worksheet(worksheet).await?;
        match target {
            VisibilityTarget::Worksheet => Ok(info.public_permission),
            VisibilityTarget::Bundle(name) => info
                .bundles()
                .find(|bundle| bundle.name() == name.as_str())
                .map(|bundle| bundle.public_permission)
                .ok_or_else(|| ClientError::NotFound(format!("bundle {}", name))),
        }
    }

    /// Block until the named bundle reaches a terminal state
    ///
    /// # Returns
    /// The terminal state the bundle settled in
    async fn wait(
        &self,
        worksheet: &WorksheetHandle,
        name: &str,
        poll_interval: Duration,
    ) -> Result<BundleState> {
        loop {
            let info = self.fetch_worksheet(worksheet).await?;
            let state = info
                .bundles()
                .find(|bundle| bundle.name() == name)
                .map(|bundle| bundle.state.clone())
                .ok_or_else(|| ClientError::NotFound(format!("bundle {}", name)))?;

            if state.is_terminal() {
                return Ok(state);
            }

            debug!("Bundle {} is {}, polling again in {:?}", name, state, poll_interval);
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[async_trait]
impl Platform for PlatformClient {
    async fn resolve_worksheet(&self, name: &str) -> Result<WorksheetHandle> {
        self.get_or_create_worksheet(name).await
    }

    async fn fetch_worksheet(&self, worksheet: &WorksheetHandle) -> Result<WorksheetInfo> {
        self.get_worksheet(worksheet).await
    }

    async fn submit(&self, worksheet: &WorksheetHandle, tokens: &[String]) -> Result<()> {
        self.run_command(worksheet, tokens).await.map(|_| ())
    }

    async fn rename(&self, worksheet: &WorksheetHandle, name: &str, new_name: &str) -> Result<()> {
        self.rename_bundle(worksheet, name, new_name).await
    }

    async fn set_visibility(
        &self,
        worksheet: &WorksheetHandle,
        target: &VisibilityTarget,
        level: AccessLevel,
    ) -> Result<()> {
        self.set_public_access(worksheet, target, level).await
    }
}
