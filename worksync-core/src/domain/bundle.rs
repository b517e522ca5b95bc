//! Bundle domain types
//!
//! Observed state of bundles on a worksheet, as reported by the server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a bundle
///
/// Only [`BundleState::Failed`] triggers recreation. Every other state,
/// including ones this crate does not know about, counts as healthy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BundleState {
    Created,
    Staged,
    Starting,
    Preparing,
    Running,
    Finalizing,
    Ready,
    Failed,
    Killed,
    Other(String),
}

impl BundleState {
    pub fn as_str(&self) -> &str {
        match self {
            BundleState::Created => "created",
            BundleState::Staged => "staged",
            BundleState::Starting => "starting",
            BundleState::Preparing => "preparing",
            BundleState::Running => "running",
            BundleState::Finalizing => "finalizing",
            BundleState::Ready => "ready",
            BundleState::Failed => "failed",
            BundleState::Killed => "killed",
            BundleState::Other(state) => state,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BundleState::Failed)
    }

    pub fn is_healthy(&self) -> bool {
        !self.is_failed()
    }

    /// Whether the bundle will not change state again on its own
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BundleState::Ready | BundleState::Failed | BundleState::Killed
        )
    }
}

impl From<String> for BundleState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "created" => BundleState::Created,
            "staged" => BundleState::Staged,
            "starting" => BundleState::Starting,
            "preparing" => BundleState::Preparing,
            "running" => BundleState::Running,
            "finalizing" => BundleState::Finalizing,
            "ready" => BundleState::Ready,
            "failed" => BundleState::Failed,
            "killed" => BundleState::Killed,
            _ => BundleState::Other(state),
        }
    }
}

impl From<&str> for BundleState {
    fn from(state: &str) -> Self {
        BundleState::from(state.to_string())
    }
}

impl From<BundleState> for String {
    fn from(state: BundleState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for BundleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bundle attached to a worksheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    pub uuid: String,
    pub name: String,
    pub state: BundleState,
}
