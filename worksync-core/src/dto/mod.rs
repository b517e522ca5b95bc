//! Data Transfer Objects for the worksheet server API
//!
//! DTOs mirror the JSON shapes exchanged with the server. They are converted
//! into domain types at the client boundary.

pub mod command;
pub mod worksheet;
