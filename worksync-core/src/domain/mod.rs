//! Core domain types
//!
//! This module contains the structures shared between the platform client
//! (which observes them) and the reconciliation engine (which acts on them).

pub mod bundle;
pub mod job;
pub mod permission;
