//! Bundle state cache
//!
//! Holds the last observed name → state mapping of a worksheet. A refresh
//! always rebuilds the snapshot from scratch and swaps it in whole, so bundles
//! renamed or removed by someone else disappear from the cache immediately.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;
use worksync_client::Platform;
use worksync_core::domain::bundle::{BundleRecord, BundleState};
use worksync_core::dto::worksheet::{BundleInfo, WorksheetHandle};

use crate::error::{ReconcileError, Result};

/// Immutable view of the bundles on a worksheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    records: BTreeMap<String, BundleRecord>,
}

impl WorkspaceSnapshot {
    /// Build a snapshot, enforcing one bundle per name
    ///
    /// # Errors
    /// Returns [`ReconcileError::DuplicateName`] if two records share a name.
    pub fn from_records(records: impl IntoIterator<Item = BundleRecord>) -> Result<Self> {
        let mut by_name: BTreeMap<String, BundleRecord> = BTreeMap::new();

        for record in records {
            if let Some(existing) = by_name.get(&record.name) {
                return Err(ReconcileError::DuplicateName {
                    name: record.name,
                    first: existing.uuid.clone(),
                    second: record.uuid,
                });
            }
            by_name.insert(record.name.clone(), record);
        }

        Ok(Self { records: by_name })
    }

    pub fn get(&self, name: &str) -> Option<&BundleRecord> {
        self.records.get(name)
    }

    pub fn state(&self, name: &str) -> Option<&BundleState> {
        self.records.get(name).map(|record| &record.state)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// All bundle names on the worksheet
    pub fn names(&self) -> BTreeSet<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &BundleRecord> {
        self.records.values()
    }

    /// First name of the form `base`, `base_1`, `base_2`, ... not in use
    pub fn free_name(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }

        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Read-through cache of a worksheet's bundle states
pub struct BundleStateCache {
    platform: Arc<dyn Platform>,
    worksheet: WorksheetHandle,
    snapshot: WorkspaceSnapshot,
}

impl BundleStateCache {
    /// Create an empty cache for a worksheet; call [`refresh`](Self::refresh)
    /// before relying on lookups
    pub fn new(platform: Arc<dyn Platform>, worksheet: WorksheetHandle) -> Self {
        Self {
            platform,
            worksheet,
            snapshot: WorkspaceSnapshot::default(),
        }
    }

    /// Replace the snapshot with the worksheet's current bundles
    ///
    /// # Errors
    /// Fails with [`ReconcileError::DuplicateName`] if two bundles share a
    /// name; the previous snapshot is kept in that case.
    pub async fn refresh(&mut self) -> Result<&WorkspaceSnapshot> {
        let items = self.platform.fetch_items(&self.worksheet).await?;

        let snapshot = WorkspaceSnapshot::from_records(
            items
                .iter()
                .filter_map(|item| item.bundle())
                .map(BundleInfo::to_record),
        )?;

        debug!(
            "Refreshed worksheet {}: {} bundle(s)",
            self.worksheet.name,
            snapshot.len()
        );

        self.snapshot = snapshot;
        Ok(&self.snapshot)
    }

    /// State of a bundle in the last snapshot; never touches the network
    pub fn lookup(&self, name: &str) -> Option<&BundleState> {
        self.snapshot.state(name)
    }

    pub fn snapshot(&self) -> &WorkspaceSnapshot {
        &self.snapshot
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.snapshot.names()
    }

    pub fn worksheet(&self) -> &WorksheetHandle {
        &self.worksheet
    }
}
