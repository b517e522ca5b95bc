//! Worksync Engine
//!
//! Reconciles a declarative pipeline of named bundles against a worksheet.
//!
//! Architecture:
//! - Cache: name → state snapshot of the worksheet, replaced on every refresh
//! - Engine: the idempotent upsert protocol (skip, recreate or create)
//! - Visibility: scoped suspension of public access around private uploads
//! - Graph: expands a pipeline template into an ordered list of jobs
//! - Driver: runs the engine over the graph, one job at a time
//!
//! Everything runs on a single sequential control flow. The before/after
//! name diff that verifies each submission is only sound when nothing else
//! submits to the worksheet in between.

pub mod cache;
pub mod driver;
pub mod engine;
pub mod error;
pub mod graph;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use cache::{BundleStateCache, WorkspaceSnapshot};
pub use driver::{DriverConfig, JobOutcome, RunReport, WorkflowDriver};
pub use engine::{ReconciliationEngine, UpsertResult};
pub use error::{GraphError, ReconcileError, Result};
pub use graph::{DependencyGraphBuilder, PipelineTemplate};
