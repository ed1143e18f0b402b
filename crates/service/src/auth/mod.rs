//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration and session lifecycle logic live here behind the
//! `CredentialStore` persistence contract.

pub mod domain;
pub mod errors;
pub mod otp;
pub mod password;
pub mod registration;
pub mod repo;
pub mod repository;
pub mod service;
pub mod token;

pub use registration::RegistrationService;
pub use service::AuthService;
