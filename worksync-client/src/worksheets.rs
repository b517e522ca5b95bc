//! Worksheet-related API endpoints

use reqwest::Method;
use tracing::info;
use worksync_core::dto::worksheet::{CreateWorksheet, WorksheetHandle, WorksheetInfo};

use crate::PlatformClient;
use crate::error::{ClientError, Result};

impl PlatformClient {
    // =============================================================================
    // Worksheet Lookup
    // =============================================================================

    /// Find worksheets matching a name or UUID spec
    ///
    /// # Returns
    /// The matching worksheets (empty when nothing matches)
    pub async fn find_worksheets(&self, spec: &str) -> Result<Vec<WorksheetHandle>> {
        let response = self
            .request(Method::GET, "worksheets")
            .query(&[("specs", spec)])
            .send()
            .await?;

        match self.handle_response(response).await {
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            other => other,
        }
    }

    /// Create a new worksheet
    pub async fn create_worksheet(&self, name: &str) -> Result<WorksheetHandle> {
        let response = self
            .request(Method::POST, "worksheets")
            .json(&CreateWorksheet {
                name: name.to_string(),
            })
            .send()
            .await?;

        let worksheet: WorksheetHandle = self.handle_response(response).await?;
        info!("Created worksheet {} ({})", worksheet.name, worksheet.uuid);
        Ok(worksheet)
    }

    /// Resolve a worksheet by name, creating it if it does not exist
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidRequest`] if the name matches more than
    /// one worksheet.
    pub async fn get_or_create_worksheet(&self, name: &str) -> Result<WorksheetHandle> {
        let mut matches = self.find_worksheets(name).await?;

        match matches.len() {
            0 => self.create_worksheet(name).await,
            1 => Ok(matches.remove(0)),
            n => Err(ClientError::InvalidRequest(format!(
                "worksheet name '{}' is ambiguous ({} matches)",
                name, n
            ))),
        }
    }

    // =============================================================================
    // Worksheet Contents
    // =============================================================================

    /// Fetch a worksheet with its items and their bundles
    pub async fn get_worksheet(&self, worksheet: &WorksheetHandle) -> Result<WorksheetInfo> {
        let response = self
            .request(Method::GET, &format!("worksheets/{}", worksheet.uuid))
            .query(&[("include", "items,items.bundle")])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
