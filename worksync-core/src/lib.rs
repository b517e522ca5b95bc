//! Worksync Core
//!
//! Core types and abstractions for reconciling named bundles on a worksheet.
//!
//! This crate contains:
//! - Domain types: desired jobs, observed bundle records and access levels
//! - Commands: the structured CLI command a job submits
//! - Naming: mapping free-form descriptions onto platform-legal bundle names
//! - DTOs: wire types for the worksheet server API

pub mod command;
pub mod domain;
pub mod dto;
pub mod naming;
