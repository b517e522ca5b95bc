//! Permission domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level granted to the `public` group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    None,
    Read,
    All,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::Read => "read",
            AccessLevel::All => "all",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a permission change applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityTarget {
    /// The worksheet itself
    Worksheet,
    /// A single bundle on the worksheet, by name
    Bundle(String),
}

impl fmt::Display for VisibilityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisibilityTarget::Worksheet => write!(f, "worksheet"),
            VisibilityTarget::Bundle(name) => write!(f, "bundle {}", name),
        }
    }
}
