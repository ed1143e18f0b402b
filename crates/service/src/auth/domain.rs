use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::otp::OtpChallenge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    EndUser,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::EndUser => "END_USER",
            Role::Employer => "EMPLOYER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "END_USER" => Some(Role::EndUser),
            "EMPLOYER" => Some(Role::Employer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Option<AccountStatus> {
        match s {
            "ACTIVE" => Some(AccountStatus::Active),
            "BLOCKED" => Some(AccountStatus::Blocked),
            _ => None,
        }
    }
}

/// External identity providers that pre-verify address ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    Google,
    Apple,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "GOOGLE",
            AuthProvider::Apple => "APPLE",
        }
    }

    pub fn parse(s: &str) -> Option<AuthProvider> {
        match s {
            "GOOGLE" => Some(AuthProvider::Google),
            "APPLE" => Some(AuthProvider::Apple),
            _ => None,
        }
    }
}

/// Stored view of one identity, as the services consume it. The OTP code and
/// its expiry travel together inside `OtpChallenge`.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub is_email_verified: bool,
    pub auth_provider: Option<AuthProvider>,
    pub image: Option<String>,
    pub otp: Option<OtpChallenge>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub accepted_terms: bool,
    pub marketing_opt_in: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload handed to the credential store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_email_verified: bool,
    pub auth_provider: Option<AuthProvider>,
    pub image: Option<String>,
    pub otp: Option<OtpChallenge>,
    pub accepted_terms: bool,
    pub marketing_opt_in: bool,
}

/// Direct registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub accepted_terms: bool,
    #[serde(default)]
    pub marketing_opt_in: bool,
}

/// Externally pre-verified identity, as handed over by the provider callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialInput {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub provider: AuthProvider,
}

/// Redacted identity returned from registration and pending-verification
/// logins. Never carries credentials or tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<&Identity> for PublicProfile {
    fn from(user: &Identity) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            image: user.image.clone(),
        }
    }
}

/// Fuller redacted projection for profile reads and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub accepted_terms: bool,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for Profile {
    fn from(user: &Identity) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            accepted_terms: user.accepted_terms,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signed bearer credentials for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A login either completes with a token pair or stalls on email
/// verification; tokens are never issued while unverified.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    VerificationRequired { user: PublicProfile },
    LoggedIn { tokens: TokenPair },
}

/// Token pair plus the signed-in profile, returned by social sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub user: PublicProfile,
}

/// One page of the user listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<Profile>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}
