//! Reconciliation engine
//!
//! Implements the upsert protocol for a single job:
//!
//! 1. A bundle with the job's name in a healthy state is left alone.
//! 2. A failed bundle is soft-deleted: renamed to `_failed_<name>` so the
//!    name is free again, without destroying anything.
//! 3. The job's command is submitted with `-n <name>`, and the worksheet is
//!    re-read to check that exactly one new bundle appeared under that name.
//!
//! The server has no "create with exactly this name or fail" primitive, so
//! step 3 synthesizes one by diffing the bundle names before and after the
//! submission. Any deviation is reported, never patched up.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use worksync_client::Platform;
use worksync_core::command::{CommandError, is_name_flag};
use worksync_core::domain::bundle::BundleState;
use worksync_core::domain::job::Job;
use worksync_core::domain::permission::{AccessLevel, VisibilityTarget};
use worksync_core::dto::worksheet::WorksheetHandle;
use worksync_core::naming;

use crate::cache::BundleStateCache;
use crate::error::{ReconcileError, Result};
use crate::visibility::VisibilityGuard;

/// Tag prefixed to the names of soft-deleted failed bundles
const FAILED_REASON: &str = "failed";

/// What an upsert did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult {
    /// A healthy bundle already existed
    Skipped(BundleState),
    /// No bundle existed; one was created
    Created,
    /// A failed bundle was renamed to `previous` and a new one created
    Recreated { previous: String },
}

impl UpsertResult {
    /// Whether a bundle was submitted
    pub fn submitted(&self) -> bool {
        !matches!(self, UpsertResult::Skipped(_))
    }
}

impl fmt::Display for UpsertResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertResult::Skipped(state) => write!(f, "skipped ({})", state),
            UpsertResult::Created => write!(f, "created"),
            UpsertResult::Recreated { previous } => write!(f, "recreated (old bundle: {})", previous),
        }
    }
}

/// Reconciles jobs against one worksheet
pub struct ReconciliationEngine {
    platform: Arc<dyn Platform>,
    worksheet: WorksheetHandle,
    cache: BundleStateCache,
}

impl ReconciliationEngine {
    /// Resolve (or create) the worksheet and load its bundles
    ///
    /// # Errors
    /// Fails on platform errors, or with [`ReconcileError::DuplicateName`] if
    /// the worksheet already holds two bundles with the same name.
    pub async fn connect(platform: Arc<dyn Platform>, worksheet_name: &str) -> Result<Self> {
        let worksheet = platform.resolve_worksheet(worksheet_name).await?;
        info!("Reconciling worksheet {} ({})", worksheet.name, worksheet.uuid);

        let mut cache = BundleStateCache::new(Arc::clone(&platform), worksheet.clone());
        cache.refresh().await?;

        Ok(Self {
            platform,
            worksheet,
            cache,
        })
    }

    pub fn worksheet(&self) -> &WorksheetHandle {
        &self.worksheet
    }

    pub fn cache(&self) -> &BundleStateCache {
        &self.cache
    }

    /// Make sure a healthy bundle named `job.name` exists on the worksheet
    ///
    /// For private jobs the worksheet is closed to the public for the whole
    /// call and reopened to its previous level on every exit path.
    pub async fn upsert(&mut self, job: &Job) -> Result<UpsertResult> {
        if !naming::is_valid(&job.name) {
            return Err(ReconcileError::InvalidName(job.name.clone()));
        }

        if !job.is_private() {
            return self.reconcile(job).await;
        }

        let guard =
            VisibilityGuard::suspend(Arc::clone(&self.platform), self.worksheet.clone()).await?;
        let outcome = self.reconcile(job).await;
        let restored = guard.restore().await;

        match (outcome, restored) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_error)) => {
                error!(
                    "Failed to restore public access to worksheet {} after error: {}",
                    self.worksheet.name, restore_error
                );
                Err(e)
            }
        }
    }

    async fn reconcile(&mut self, job: &Job) -> Result<UpsertResult> {
        let mut previous = None;

        match self.cache.lookup(&job.name).cloned() {
            Some(state) if state.is_healthy() => {
                debug!("Bundle {} is {}, skipping", job.name, state);
                return Ok(UpsertResult::Skipped(state));
            }
            Some(state) => {
                warn!("Bundle {} is {}, recreating", job.name, state);
                previous = Some(self.soft_delete(&job.name, FAILED_REASON).await?);
            }
            None => {}
        }

        self.create(job).await?;

        if job.is_private() {
            self.platform
                .set_visibility(
                    &self.worksheet,
                    &VisibilityTarget::Bundle(job.name.clone()),
                    AccessLevel::None,
                )
                .await?;
        }

        Ok(match previous {
            Some(previous) => UpsertResult::Recreated { previous },
            None => UpsertResult::Created,
        })
    }

    /// Submit the job and verify that exactly the expected bundle appeared
    async fn create(&mut self, job: &Job) -> Result<()> {
        let tokens = job.command.tokens(&job.name);
        if let Some(token) = tokens.iter().skip(3).find(|token| is_name_flag(token)) {
            return Err(ReconcileError::ReservedFlag(CommandError::ReservedFlag {
                token: token.clone(),
            }));
        }

        let before = self.cache.names();
        self.platform.submit(&self.worksheet, &tokens).await?;
        let after = self.cache.refresh().await?.names();

        let created: Vec<String> = after.difference(&before).cloned().collect();
        if created.len() != 1 {
            return Err(ReconcileError::AmbiguousSubmission {
                job: job.name.clone(),
                created,
            });
        }

        if created[0] != job.name {
            return Err(ReconcileError::NameMismatch {
                expected: job.name.clone(),
                actual: created[0].clone(),
            });
        }

        info!("Created bundle {}", job.name);
        Ok(())
    }

    /// Rename a bundle out of the way, tagged with `reason`
    ///
    /// # Returns
    /// The bundle's new name
    async fn soft_delete(&mut self, name: &str, reason: &str) -> Result<String> {
        if self.cache.lookup(name).is_none() {
            return Err(ReconcileError::BundleNotFound(name.to_string()));
        }

        let new_name = self
            .cache
            .snapshot()
            .free_name(&format!("_{}_{}", reason, name));

        self.platform.rename(&self.worksheet, name, &new_name).await?;
        self.cache.refresh().await?;

        info!("Soft-deleted bundle {} as {}", name, new_name);
        Ok(new_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, Submission};
    use worksync_client::ClientError;
    use worksync_core::command::Command;
    use worksync_core::domain::job::Visibility;

    async fn engine(platform: &Arc<FakePlatform>) -> ReconciliationEngine {
        ReconciliationEngine::connect(platform.clone(), "helm-dev")
            .await
            .unwrap()
    }

    fn venv() -> Job {
        Job::new(
            "venv",
            Command::run(["scripts"], "bash scripts/install.sh").unwrap(),
        )
    }

    fn credentials() -> Job {
        Job::new("credentials", Command::upload(["credentials"]).unwrap())
            .with_visibility(Visibility::Private)
    }

    #[tokio::test]
    async fn test_create_then_skip() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;

        assert_eq!(engine.upsert(&venv()).await.unwrap(), UpsertResult::Created);
        assert_eq!(
            engine.upsert(&venv()).await.unwrap(),
            UpsertResult::Skipped(BundleState::Created)
        );

        assert_eq!(platform.bundles_named("venv").len(), 1);
        assert_eq!(platform.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_submits_with_name_flag() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;

        engine.upsert(&venv()).await.unwrap();

        assert_eq!(
            platform.submissions()[0],
            vec!["run", "-n", "venv", ":scripts", "bash scripts/install.sh"]
        );
    }

    #[tokio::test]
    async fn test_healthy_states_are_skipped() {
        for state in ["staged", "running", "ready", "killed", "worker_offline"] {
            let platform = Arc::new(FakePlatform::new().with_bundle("venv", state));
            let mut engine = engine(&platform).await;

            let result = engine.upsert(&venv()).await.unwrap();
            assert_eq!(result, UpsertResult::Skipped(BundleState::from(state)));
            assert!(platform.submissions().is_empty());
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_abort_connect() {
        let platform = Arc::new(
            FakePlatform::new()
                .with_bundle("venv", "ready")
                .with_bundle("venv", "ready"),
        );

        let err = ReconciliationEngine::connect(platform, "helm-dev")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ReconcileError::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn test_submission_creating_nothing() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        platform.then(Submission::Nothing);

        let err = engine.upsert(&venv()).await.unwrap_err();
        match err {
            ReconcileError::AmbiguousSubmission { job, created } => {
                assert_eq!(job, "venv");
                assert!(created.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(engine.cache().lookup("venv").is_none());
    }

    #[tokio::test]
    async fn test_submission_creating_two() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        platform.then(Submission::Two);

        let err = engine.upsert(&venv()).await.unwrap_err();
        match err {
            ReconcileError::AmbiguousSubmission { created, .. } => {
                assert_eq!(created, vec!["venv", "venv-extra"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submission_under_wrong_name() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        platform.then(Submission::Renamed("venv2".to_string()));

        let err = engine.upsert(&venv()).await.unwrap_err();
        match err {
            ReconcileError::NameMismatch { expected, actual } => {
                assert_eq!(expected, "venv");
                assert_eq!(actual, "venv2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_bundle_is_soft_deleted_and_recreated() {
        let platform = Arc::new(FakePlatform::new().with_bundle("venv", "failed"));
        let old_uuid = platform.bundles_named("venv")[0].uuid.clone();
        let mut engine = engine(&platform).await;

        let result = engine.upsert(&venv()).await.unwrap();
        assert_eq!(
            result,
            UpsertResult::Recreated {
                previous: "_failed_venv".to_string()
            }
        );

        let tombstone = platform.bundles_named("_failed_venv");
        assert_eq!(tombstone.len(), 1);
        assert_eq!(tombstone[0].uuid, old_uuid);
        assert_eq!(tombstone[0].state, BundleState::Failed);

        let fresh = platform.bundles_named("venv");
        assert_eq!(fresh.len(), 1);
        assert_ne!(fresh[0].uuid, old_uuid);
        assert!(fresh[0].state.is_healthy());
    }

    #[tokio::test]
    async fn test_soft_delete_avoids_existing_tombstones() {
        let platform = Arc::new(
            FakePlatform::new()
                .with_bundle("_failed_venv", "failed")
                .with_bundle("venv", "failed"),
        );
        let mut engine = engine(&platform).await;

        let result = engine.upsert(&venv()).await.unwrap();
        assert_eq!(
            result,
            UpsertResult::Recreated {
                previous: "_failed_venv_1".to_string()
            }
        );
        assert_eq!(platform.bundles_named("_failed_venv").len(), 1);
        assert_eq!(platform.bundles_named("_failed_venv_1").len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_of_missing_bundle() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;

        let err = engine.soft_delete("venv", FAILED_REASON).await.unwrap_err();
        assert!(matches!(err, ReconcileError::BundleNotFound(ref name) if name == "venv"));
    }

    #[tokio::test]
    async fn test_private_job_hides_bundle_and_restores_worksheet() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;

        assert_eq!(
            engine.upsert(&credentials()).await.unwrap(),
            UpsertResult::Created
        );

        assert_eq!(platform.public_access(), AccessLevel::Read);
        assert_eq!(
            platform.bundles_named("credentials")[0].public,
            AccessLevel::None
        );
        assert_eq!(
            platform.visibility_changes(),
            vec![
                (VisibilityTarget::Worksheet, AccessLevel::None),
                (
                    VisibilityTarget::Bundle("credentials".to_string()),
                    AccessLevel::None
                ),
                (VisibilityTarget::Worksheet, AccessLevel::Read),
            ]
        );
    }

    #[tokio::test]
    async fn test_private_job_on_worksheet_without_reported_access() {
        let platform = Arc::new(FakePlatform::new());
        platform.omit_public_permission();
        let mut engine = engine(&platform).await;

        engine.upsert(&credentials()).await.unwrap();

        assert_eq!(
            platform.visibility_changes(),
            vec![
                (VisibilityTarget::Worksheet, AccessLevel::None),
                (
                    VisibilityTarget::Bundle("credentials".to_string()),
                    AccessLevel::None
                ),
                (VisibilityTarget::Worksheet, AccessLevel::Read),
            ]
        );
        assert_eq!(platform.public_access(), AccessLevel::Read);
    }

    #[tokio::test]
    async fn test_private_skip_restores_worksheet() {
        let platform = Arc::new(FakePlatform::new().with_bundle("credentials", "ready"));
        let mut engine = engine(&platform).await;

        let result = engine.upsert(&credentials()).await.unwrap();
        assert!(!result.submitted());
        assert_eq!(platform.public_access(), AccessLevel::Read);
    }

    #[tokio::test]
    async fn test_visibility_restored_when_submission_fails() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        platform.then(Submission::Error);

        let err = engine.upsert(&credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Platform(ClientError::ApiError { status: 500, .. })
        ));
        assert_eq!(platform.public_access(), AccessLevel::Read);
    }

    #[tokio::test]
    async fn test_visibility_restored_when_verification_fails() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        platform.then(Submission::Two);

        let err = engine.upsert(&credentials()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::AmbiguousSubmission { .. }));
        assert_eq!(platform.public_access(), AccessLevel::Read);
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_any_call() {
        let platform = Arc::new(FakePlatform::new());
        let mut engine = engine(&platform).await;
        let calls = platform.calls();

        let job = Job::new("openai/davinci", Command::upload(["x"]).unwrap());
        let err = engine.upsert(&job).await.unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidName(_)));
        assert_eq!(platform.calls(), calls);
    }
}
