//! Error types for reconciliation

use thiserror::Error;
use worksync_client::ClientError;
use worksync_core::command::CommandError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that abort a reconciliation run
///
/// None of these are retried. Re-running the whole pipeline is always safe
/// because healthy bundles are skipped.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Two bundles on the worksheet share a name
    #[error("found more than one bundle named '{name}' ({first} and {second})")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// A command tried to assign its own bundle name
    #[error(transparent)]
    ReservedFlag(#[from] CommandError),

    /// A job name the server would not accept
    #[error("'{0}' is not a legal bundle name")]
    InvalidName(String),

    /// A submission did not create exactly one new bundle
    #[error(
        "submitting '{job}' created {} bundle(s) instead of exactly one: {created:?}",
        .created.len()
    )]
    AmbiguousSubmission { job: String, created: Vec<String> },

    /// A submission created a bundle under another name
    #[error("expected submission to create bundle '{expected}', but it created '{actual}'")]
    NameMismatch { expected: String, actual: String },

    /// Soft-delete was asked to rename a bundle that is not on the worksheet
    #[error("cannot soft-delete bundle '{0}': it is not on the worksheet")]
    BundleNotFound(String),

    /// The pipeline template does not describe a valid job graph
    #[error("invalid pipeline: {0}")]
    Graph(#[from] GraphError),

    /// Communication with the worksheet server failed
    #[error("platform request failed: {0}")]
    Platform(#[from] ClientError),
}

/// Errors raised while expanding a pipeline template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No scenario × model evaluation jobs to run
    #[error("pipeline has no evaluation jobs: scenarios and models must both be non-empty")]
    EmptyPipeline,

    /// A job references a job that is not placed before it
    #[error("job '{job}' depends on '{dependency}', which is not placed before it")]
    UnresolvedDependency { job: String, dependency: String },

    /// Two distinct jobs would get the same bundle name
    #[error("job name '{0}' is produced more than once")]
    DuplicateJob(String),

    /// A declared job name the server would not accept
    #[error("'{0}' is not a legal bundle name")]
    InvalidName(String),

    /// A job template cannot be turned into a command
    #[error("job '{job}': {source}")]
    Command {
        job: String,
        #[source]
        source: CommandError,
    },
}
