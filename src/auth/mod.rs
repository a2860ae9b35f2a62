//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: token-based session holder persisted to disk
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! A session is considered authenticated as long as it holds a token;
//! token expiry is discovered reactively through a 401 response, never
//! checked client-side.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
