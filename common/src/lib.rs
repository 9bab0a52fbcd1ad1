//! Shared model for the `cfst` workspace.
//!
//! * [`network`]: address ranges and the candidate/result types that flow
//!   through the measurement pipeline.
//! * [`config`]: user-facing settings consumed by the pipeline.
//! * [`error`]: typed errors for range parsing and settings validation.

pub mod config;
pub mod error;
pub mod network;
