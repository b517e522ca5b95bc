//! Scoped suspension of public worksheet access
//!
//! Private bundles (credentials and the like) must never be readable by the
//! public group, not even for the moment between upload and the permission
//! change on the bundle itself. The worksheet is therefore closed to the
//! public for the duration of the upload and reopened afterwards.
//!
//! A worksheet whose access level the server does not report is treated as
//! public: it is closed anyway and reopened to [`AccessLevel::Read`].

use std::sync::Arc;
use tracing::{debug, error, warn};
use worksync_client::Platform;
use worksync_core::domain::permission::{AccessLevel, VisibilityTarget};
use worksync_core::dto::worksheet::WorksheetHandle;

use crate::error::Result;

/// Level restored when the previous level is unknown
const UNKNOWN_RESTORE_LEVEL: AccessLevel = AccessLevel::Read;

/// Keeps a worksheet closed to the public until restored
///
/// Call [`restore`](Self::restore) on every exit path. A guard dropped while
/// still armed (panic, cancelled future) schedules the restore on the current
/// tokio runtime instead.
pub struct VisibilityGuard {
    platform: Arc<dyn Platform>,
    worksheet: WorksheetHandle,
    previous: AccessLevel,
    armed: bool,
}

impl VisibilityGuard {
    /// Record the worksheet's public access level and revoke it
    pub async fn suspend(platform: Arc<dyn Platform>, worksheet: WorksheetHandle) -> Result<Self> {
        let reported = platform
            .visibility(&worksheet, &VisibilityTarget::Worksheet)
            .await?;

        let previous = reported.unwrap_or_else(|| {
            warn!(
                "Worksheet {} did not report its public access; assuming '{}'",
                worksheet.name, UNKNOWN_RESTORE_LEVEL
            );
            UNKNOWN_RESTORE_LEVEL
        });

        if previous != AccessLevel::None {
            platform
                .set_visibility(&worksheet, &VisibilityTarget::Worksheet, AccessLevel::None)
                .await?;
            debug!(
                "Suspended public access to worksheet {} (was {})",
                worksheet.name, previous
            );
        }

        Ok(Self {
            armed: previous != AccessLevel::None,
            platform,
            worksheet,
            previous,
        })
    }

    /// Public access level in effect before suspension
    pub fn previous(&self) -> AccessLevel {
        self.previous
    }

    /// Put the worksheet's public access back to its previous level
    pub async fn restore(mut self) -> Result<()> {
        if !self.armed {
            return Ok(());
        }

        self.platform
            .set_visibility(&self.worksheet, &VisibilityTarget::Worksheet, self.previous)
            .await?;
        self.armed = false;
        debug!(
            "Restored public access to worksheet {} ({})",
            self.worksheet.name, self.previous
        );
        Ok(())
    }
}

impl Drop for VisibilityGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(
            "Visibility guard for worksheet {} dropped without restore",
            self.worksheet.name
        );

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                "No runtime to restore public access to worksheet {}; set it to '{}' manually",
                self.worksheet.name, self.previous
            );
            return;
        };

        let platform = Arc::clone(&self.platform);
        let worksheet = self.worksheet.clone();
        let level = self.previous;
        runtime.spawn(async move {
            if let Err(e) = platform
                .set_visibility(&worksheet, &VisibilityTarget::Worksheet, level)
                .await
            {
                error!(
                    "Failed to restore public access to worksheet {}: {}",
                    worksheet.name, e
                );
            }
        });
    }
}
