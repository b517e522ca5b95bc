//! In-memory platform for engine tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;
use worksync_client::{ClientError, Platform, Result};
use worksync_core::domain::bundle::BundleState;
use worksync_core::domain::permission::{AccessLevel, VisibilityTarget};
use worksync_core::dto::worksheet::{
    BUNDLE_ITEM_TYPE, BundleInfo, BundleMetadata, WorksheetHandle, WorksheetInfo, WorksheetItem,
};

/// How the fake reacts to the next submission
#[derive(Debug, Clone)]
pub enum Submission {
    /// Create one bundle under the requested name
    Honor,
    /// Accept the command but create nothing
    Nothing,
    /// Create the requested bundle plus an extra one
    Two,
    /// Create one bundle under another name
    Renamed(String),
    /// Fail with a server error
    Error,
}

#[derive(Debug, Clone)]
pub struct FakeBundle {
    pub uuid: String,
    pub name: String,
    pub state: BundleState,
    pub public: AccessLevel,
}

#[derive(Debug)]
struct FakeState {
    worksheet: WorksheetHandle,
    public: AccessLevel,
    bundles: Vec<FakeBundle>,
    submissions: Vec<Vec<String>>,
    visibility_changes: Vec<(VisibilityTarget, AccessLevel)>,
    behaviors: VecDeque<Submission>,
    fetches: usize,
    calls: usize,
    report_public: bool,
    stall_visibility: bool,
}

/// A single worksheet kept in memory
#[derive(Debug)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                worksheet: WorksheetHandle {
                    uuid: "0xworksheet".to_string(),
                    name: "helm-dev".to_string(),
                },
                public: AccessLevel::Read,
                bundles: Vec::new(),
                submissions: Vec::new(),
                visibility_changes: Vec::new(),
                behaviors: VecDeque::new(),
                fetches: 0,
                calls: 0,
                report_public: true,
                stall_visibility: false,
            }),
        }
    }

    pub fn with_bundle(self, name: &str, state: &str) -> Self {
        self.state.lock().unwrap().bundles.push(FakeBundle {
            uuid: new_uuid(),
            name: name.to_string(),
            state: BundleState::from(state),
            public: AccessLevel::Read,
        });
        self
    }

    /// Queue the behavior of the next submission
    pub fn then(&self, behavior: Submission) -> &Self {
        self.state.lock().unwrap().behaviors.push_back(behavior);
        self
    }

    pub fn set_state(&self, name: &str, state: &str) {
        let mut inner = self.state.lock().unwrap();
        for bundle in inner.bundles.iter_mut().filter(|b| b.name == name) {
            bundle.state = BundleState::from(state);
        }
    }

    pub fn remove(&self, name: &str) {
        self.state.lock().unwrap().bundles.retain(|b| b.name != name);
    }

    pub fn bundles(&self) -> Vec<FakeBundle> {
        self.state.lock().unwrap().bundles.clone()
    }

    pub fn bundles_named(&self, name: &str) -> Vec<FakeBundle> {
        self.bundles().into_iter().filter(|b| b.name == name).collect()
    }

    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Names passed with `-n`, in submission order
    pub fn submitted_names(&self) -> Vec<String> {
        self.submissions()
            .iter()
            .map(|tokens| tokens[2].clone())
            .collect()
    }

    pub fn public_access(&self) -> AccessLevel {
        self.state.lock().unwrap().public
    }

    pub fn set_public_access(&self, level: AccessLevel) {
        self.state.lock().unwrap().public = level;
    }

    /// Leave `public_permission` out of worksheet responses
    pub fn omit_public_permission(&self) {
        self.state.lock().unwrap().report_public = false;
    }

    /// Make the next visibility change hang forever without taking effect
    pub fn stall_next_visibility_change(&self) {
        self.state.lock().unwrap().stall_visibility = true;
    }

    pub fn visibility_changes(&self) -> Vec<(VisibilityTarget, AccessLevel)> {
        self.state.lock().unwrap().visibility_changes.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    /// Total number of platform calls of any kind
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

fn new_uuid() -> String {
    format!("0x{}", Uuid::new_v4().simple())
}

fn healthy_bundle(name: &str) -> FakeBundle {
    FakeBundle {
        uuid: new_uuid(),
        name: name.to_string(),
        state: BundleState::Created,
        public: AccessLevel::Read,
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn resolve_worksheet(&self, name: &str) -> Result<WorksheetHandle> {
        let mut inner = self.state.lock().unwrap();
        inner.calls += 1;
        inner.worksheet.name = name.to_string();
        Ok(inner.worksheet.clone())
    }

    async fn fetch_worksheet(&self, worksheet: &WorksheetHandle) -> Result<WorksheetInfo> {
        let mut inner = self.state.lock().unwrap();
        inner.calls += 1;
        inner.fetches += 1;
        let mut items = vec![WorksheetItem {
            item_type: "markup".to_string(),
            bundle: None,
        }];
        items.extend(inner.bundles.iter().map(|b| WorksheetItem {
            item_type: BUNDLE_ITEM_TYPE.to_string(),
            bundle: Some(BundleInfo {
                uuid: b.uuid.clone(),
                state: b.state.clone(),
                metadata: BundleMetadata {
                    name: b.name.clone(),
                },
                public_permission: Some(b.public),
            }),
        }));

        Ok(WorksheetInfo {
            uuid: worksheet.uuid.clone(),
            name: worksheet.name.clone(),
            public_permission: inner.report_public.then_some(inner.public),
            items,
        })
    }

    async fn submit(&self, _worksheet: &WorksheetHandle, tokens: &[String]) -> Result<()> {
        let mut inner = self.state.lock().unwrap();
        inner.calls += 1;
        inner.submissions.push(tokens.to_vec());
        let name = tokens[2].clone();

        match inner.behaviors.pop_front().unwrap_or(Submission::Honor) {
            Submission::Honor => inner.bundles.push(healthy_bundle(&name)),
            Submission::Nothing => {}
            Submission::Two => {
                inner.bundles.push(healthy_bundle(&name));
                inner.bundles.push(healthy_bundle(&format!("{}-extra", name)));
            }
            Submission::Renamed(other) => inner.bundles.push(healthy_bundle(&other)),
            Submission::Error => return Err(ClientError::api_error(500, "worker exploded")),
        }
        Ok(())
    }

    async fn rename(&self, _worksheet: &WorksheetHandle, name: &str, new_name: &str) -> Result<()> {
        let mut inner = self.state.lock().unwrap();
        inner.calls += 1;
        let bundle = inner
            .bundles
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| ClientError::NotFound(format!("bundle {}", name)))?;
        bundle.name = new_name.to_string();
        Ok(())
    }

    async fn set_visibility(
        &self,
        _worksheet: &WorksheetHandle,
        target: &VisibilityTarget,
        level: AccessLevel,
    ) -> Result<()> {
        let stall = {
            let mut inner = self.state.lock().unwrap();
            std::mem::take(&mut inner.stall_visibility)
        };
        if stall {
            std::future::pending::<()>().await;
        }

        let mut inner = self.state.lock().unwrap();
        inner.calls += 1;
        inner.visibility_changes.push((target.clone(), level));
        match target {
            VisibilityTarget::Worksheet => inner.public = level,
            VisibilityTarget::Bundle(name) => {
                let bundle = inner
                    .bundles
                    .iter_mut()
                    .find(|b| &b.name == name)
                    .ok_or_else(|| ClientError::NotFound(format!("bundle {}", name)))?;
                bundle.public = level;
            }
        }
        Ok(())
    }
}
