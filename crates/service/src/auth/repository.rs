use async_trait::async_trait;
use uuid::Uuid;

use common::pagination::Pagination;

use super::domain::{AccountStatus, Identity, NewIdentity, TokenPair};
use super::errors::AuthError;
use super::otp::OtpChallenge;

/// Persistence contract for identity records.
///
/// Mutations are intent-named so callers can never write half an OTP
/// challenge or half a token pair. Single-record updates are atomic; the
/// stored token values resolve concurrent writers last-writer-wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    /// Fails with `AuthError::Conflict` when the email is already registered.
    async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError>;

    /// Replace the outstanding OTP challenge, code and expiry together.
    async fn set_otp_challenge(&self, id: Uuid, challenge: &OtpChallenge) -> Result<(), AuthError>;

    /// Flip the verification flag, consume the challenge, and store the
    /// fresh pair in one update.
    async fn mark_verified(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError>;

    /// Overwrite both tokens; the previous refresh token is dead afterwards.
    async fn store_token_pair(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError>;

    /// Rotate the access token only.
    async fn store_access_token(&self, id: Uuid, access_token: &str) -> Result<(), AuthError>;

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError>;

    /// Store a new password hash and consume any outstanding challenge.
    async fn reset_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError>;

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<Identity, AuthError>;

    /// Non-blocked identities, newest first, with the total under the same
    /// filter.
    async fn list_active(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Identity>, u64), AuthError>;
}

/// Simple in-memory store for tests and doc examples
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockCredentialStore {
        users: Mutex<HashMap<Uuid, Identity>>, // key: user id
    }

    impl MockCredentialStore {
        fn update<T>(
            &self,
            id: Uuid,
            f: impl FnOnce(&mut Identity) -> T,
        ) -> Result<T, AuthError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(&id)
                .ok_or_else(|| AuthError::NotFound("user not found".into()))?;
            let out = f(user);
            user.updated_at = Utc::now();
            Ok(out)
        }
    }

    #[async_trait]
    impl CredentialStore for MockCredentialStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&id).cloned())
        }

        async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == new.email) {
                return Err(AuthError::Conflict("email already registered".into()));
            }
            let now = Utc::now();
            let user = Identity {
                id: Uuid::new_v4(),
                email: new.email,
                first_name: new.first_name,
                last_name: new.last_name,
                password_hash: new.password_hash,
                role: new.role,
                status: AccountStatus::Active,
                is_email_verified: new.is_email_verified,
                auth_provider: new.auth_provider,
                image: new.image,
                otp: new.otp,
                access_token: None,
                refresh_token: None,
                accepted_terms: new.accepted_terms,
                marketing_opt_in: new.marketing_opt_in,
                created_at: now,
                updated_at: now,
            };
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn set_otp_challenge(
            &self,
            id: Uuid,
            challenge: &OtpChallenge,
        ) -> Result<(), AuthError> {
            self.update(id, |u| u.otp = Some(challenge.clone()))
        }

        async fn mark_verified(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError> {
            self.update(id, |u| {
                u.is_email_verified = true;
                u.otp = None;
                u.access_token = Some(tokens.access_token.clone());
                u.refresh_token = Some(tokens.refresh_token.clone());
            })
        }

        async fn store_token_pair(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError> {
            self.update(id, |u| {
                u.access_token = Some(tokens.access_token.clone());
                u.refresh_token = Some(tokens.refresh_token.clone());
            })
        }

        async fn store_access_token(&self, id: Uuid, access_token: &str) -> Result<(), AuthError> {
            self.update(id, |u| u.access_token = Some(access_token.to_string()))
        }

        async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError> {
            self.update(id, |u| {
                u.access_token = None;
                u.refresh_token = None;
            })
        }

        async fn reset_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
            self.update(id, |u| {
                u.password_hash = Some(password_hash.to_string());
                u.otp = None;
            })
        }

        async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<Identity, AuthError> {
            self.update(id, |u| {
                u.status = status;
                u.clone()
            })
        }

        async fn list_active(
            &self,
            search: Option<&str>,
            page: Pagination,
        ) -> Result<(Vec<Identity>, u64), AuthError> {
            let users = self.users.lock().unwrap();
            let term = search.map(str::to_lowercase);
            let mut rows: Vec<Identity> = users
                .values()
                .filter(|u| u.status != AccountStatus::Blocked)
                .filter(|u| match &term {
                    Some(t) => {
                        u.first_name.to_lowercase().contains(t)
                            || u.last_name.to_lowercase().contains(t)
                            || u.email.to_lowercase().contains(t)
                    }
                    None => true,
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = rows.len() as u64;
            let (start, end) = page.slice_bounds(rows.len());
            Ok((rows[start..end].to_vec(), total))
        }
    }
}
