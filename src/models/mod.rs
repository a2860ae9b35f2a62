//! Data models for the measurement workflow.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `User`, `Role`: account entries managed through the admin endpoints
//! - `ProcessResult`, `ScanDimensions`, `HoleDimensions`: analysis output
//! - `DetectResponse`: live card-detection result
//! - `SubmitResponse`: dossier submission acknowledgement

pub mod scan;
pub mod user;

pub use scan::{DetectResponse, HoleDimensions, ProcessResult, ScanDimensions, SubmitResponse};
pub use user::{Role, User};
