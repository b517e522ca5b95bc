//! Job domain types
//!
//! A [`Job`] is the desired state of one named bundle. Jobs are rebuilt from
//! the pipeline template on every run; they are never persisted.

use serde::{Deserialize, Serialize};

use crate::command::Command;

/// Desired bundle on a worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Bundle name, also the idempotency key
    pub name: String,
    pub command: Command,
    /// Jobs this command references; they must be submitted first
    pub dependencies: Vec<String>,
    pub visibility: Visibility,
}

impl Job {
    /// Create a public job whose dependencies are the ones its command references
    pub fn new(name: impl Into<String>, command: Command) -> Self {
        let dependencies = command.dependencies().to_vec();
        Self {
            name: name.into(),
            command,
            dependencies,
            visibility: Visibility::Public,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}

/// Whether a bundle may be read by anonymous users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}
