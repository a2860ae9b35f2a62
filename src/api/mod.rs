//! REST API client module for the measurement backend.
//!
//! This module provides the `ApiClient` for authentication, account
//! administration and the scan pipeline (live detection, analysis,
//! dossier submission).
//!
//! The API uses JWT bearer token authentication obtained through the
//! token endpoint; an unauthorized response always maps to the fixed
//! `ApiError::Unauthorized` so the caller can force a re-login.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
