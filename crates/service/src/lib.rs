//! Credential and session lifecycle services on top of the identity models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in the `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod auth;
pub mod notify;
