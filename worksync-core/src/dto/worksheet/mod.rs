//! Worksheet DTOs

use serde::{Deserialize, Serialize};

use crate::domain::bundle::{BundleRecord, BundleState};
use crate::domain::permission::AccessLevel;

/// Item type of bundle entries on a worksheet
pub const BUNDLE_ITEM_TYPE: &str = "bundle";

/// A resolved worksheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetHandle {
    pub uuid: String,
    pub name: String,
}

/// Request to create a new worksheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorksheet {
    pub name: String,
}

/// Worksheet contents, fetched with `include=items,items.bundle`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetInfo {
    pub uuid: String,
    pub name: String,
    /// Public group access; `None` when the server did not report it
    #[serde(default)]
    pub public_permission: Option<AccessLevel>,
    #[serde(default)]
    pub items: Vec<WorksheetItem>,
}

impl WorksheetInfo {
    /// Bundles on the worksheet, in item order
    pub fn bundles(&self) -> impl Iterator<Item = &BundleInfo> {
        self.items.iter().filter_map(WorksheetItem::bundle)
    }
}

/// One entry on a worksheet (markup, bundle, table, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub bundle: Option<BundleInfo>,
}

impl WorksheetItem {
    /// The bundle this item shows, if it is a bundle item
    pub fn bundle(&self) -> Option<&BundleInfo> {
        if self.item_type == BUNDLE_ITEM_TYPE {
            self.bundle.as_ref()
        } else {
            None
        }
    }
}

/// Bundle as embedded in a worksheet item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleInfo {
    pub uuid: String,
    pub state: BundleState,
    pub metadata: BundleMetadata,
    #[serde(default)]
    pub public_permission: Option<AccessLevel>,
}

impl BundleInfo {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn to_record(&self) -> BundleRecord {
        BundleRecord {
            uuid: self.uuid.clone(),
            name: self.metadata.name.clone(),
            state: self.state.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub name: String,
}
