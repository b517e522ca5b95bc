//! CLI command DTOs
//!
//! The server executes CLI commands on behalf of the caller through a single
//! endpoint. Bundle creation, renames and permission changes all go through it.

use serde::{Deserialize, Serialize};

/// Request to run a CLI command in the context of a worksheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliCommandRequest {
    pub worksheet_uuid: String,
    pub command: String,
}

/// Result of a CLI command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliCommandResponse {
    #[serde(default)]
    pub output: String,
    /// Set when the command raised on the server
    #[serde(default)]
    pub exception: Option<String>,
}
