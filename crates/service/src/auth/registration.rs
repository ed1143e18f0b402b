use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;

use super::domain::{
    AccountStatus, AuthSession, NewIdentity, Profile, PublicProfile, RegisterInput, Role,
    SocialInput, UserPage,
};
use super::errors::AuthError;
use super::otp::OtpChallenge;
use super::password;
use super::repository::CredentialStore;
use super::token::TokenSigner;
use crate::notify::{template, NotificationGateway, NotificationKind};

const MIN_PASSWORD_LEN: usize = 6;

/// Creates identities and administers their account status.
pub struct RegistrationService<S: CredentialStore> {
    store: Arc<S>,
    tokens: TokenSigner,
    notifier: Arc<dyn NotificationGateway>,
}

impl<S: CredentialStore> RegistrationService<S> {
    pub fn new(store: Arc<S>, tokens: TokenSigner, notifier: Arc<dyn NotificationGateway>) -> Self {
        Self { store, tokens, notifier }
    }

    /// Register an end user with a password. The identity starts unverified;
    /// the OTP emailed here (or on the first login attempt) gates token
    /// issuance.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::RegistrationService;
    /// use service::auth::domain::RegisterInput;
    /// use service::auth::repository::mock::MockCredentialStore;
    /// use service::auth::token::TokenSigner;
    /// use service::notify::mock::RecordingMailer;
    ///
    /// let store = Arc::new(MockCredentialStore::default());
    /// let signer = TokenSigner::new(&configs::JwtConfig {
    ///     access_secret: "access".into(),
    ///     refresh_secret: "refresh".into(),
    ///     ..configs::JwtConfig::default()
    /// });
    /// let svc = RegistrationService::new(store, signer, Arc::new(RecordingMailer::default()));
    /// let profile = tokio_test::block_on(svc.register_direct(RegisterInput {
    ///     first_name: "Ada".into(),
    ///     last_name: "Lovelace".into(),
    ///     email: "ada@example.com".into(),
    ///     password: "secret1".into(),
    ///     accepted_terms: true,
    ///     marketing_opt_in: false,
    /// })).unwrap();
    /// assert_eq!(profile.email, "ada@example.com");
    /// ```
    pub async fn register_direct(&self, input: RegisterInput) -> Result<PublicProfile, AuthError> {
        self.register_with_role(input, Role::EndUser).await
    }

    /// Same flow as `register_direct` with the employer role.
    pub async fn register_employer(&self, input: RegisterInput) -> Result<PublicProfile, AuthError> {
        self.register_with_role(input, Role::Employer).await
    }

    #[instrument(skip(self, input), fields(email = %input.email, role = ?role))]
    async fn register_with_role(
        &self,
        input: RegisterInput,
        role: Role,
    ) -> Result<PublicProfile, AuthError> {
        if input.password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "password must be at least 6 characters long".into(),
            ));
        }
        if !input.accepted_terms {
            return Err(AuthError::Validation(
                "terms and policy must be accepted to register".into(),
            ));
        }
        if let Some(existing) = self.store.find_by_email(&input.email).await? {
            debug!(user_id = %existing.id, "email already registered");
            return Err(AuthError::Conflict("user already exists".into()));
        }

        let hash = password::hash_password(&input.password)?;
        let challenge = OtpChallenge::issue();
        let user = self
            .store
            .create(NewIdentity {
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                password_hash: Some(hash),
                role,
                is_email_verified: false,
                auth_provider: None,
                image: None,
                otp: Some(challenge.clone()),
                accepted_terms: input.accepted_terms,
                marketing_opt_in: input.marketing_opt_in,
            })
            .await?;

        self.notifier
            .send(NotificationKind::Otp, &user.email, &template::otp_email(&challenge.code))
            .await?;
        info!(user_id = %user.id, "user registered");
        Ok(PublicProfile::from(&user))
    }

    /// Sign in or sign up an externally pre-verified identity. The provider
    /// already proved address ownership, so the OTP gate is skipped on this
    /// path only; a blocked account is refused before any tokens are minted.
    #[instrument(skip(self, input), fields(email = %input.email, provider = ?input.provider))]
    pub async fn register_external(&self, input: SocialInput) -> Result<AuthSession, AuthError> {
        if let Some(user) = self.store.find_by_email(&input.email).await? {
            if user.status == AccountStatus::Blocked {
                return Err(AuthError::Forbidden("account is blocked, contact support".into()));
            }
            let pair = self.tokens.issue_pair(&user, false)?;
            self.store.store_token_pair(user.id, &pair).await?;
            info!(user_id = %user.id, "social login");
            return Ok(AuthSession {
                tokens: pair,
                user: PublicProfile::from(&user),
            });
        }

        let (first_name, last_name) = split_display_name(&input.name);
        let user = self
            .store
            .create(NewIdentity {
                email: input.email,
                first_name,
                last_name,
                password_hash: None,
                role: Role::EndUser,
                is_email_verified: true,
                auth_provider: Some(input.provider),
                image: input.image,
                otp: None,
                accepted_terms: true,
                marketing_opt_in: false,
            })
            .await?;
        let pair = self.tokens.issue_pair(&user, false)?;
        self.store.store_token_pair(user.id, &pair).await?;
        info!(user_id = %user.id, "social signup");
        Ok(AuthSession {
            tokens: pair,
            user: PublicProfile::from(&user),
        })
    }

    /// Administrative block/unblock.
    #[instrument(skip(self), fields(user_id = %id, status = ?status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Profile, AuthError> {
        let user = self.store.set_status(id, status).await?;
        info!(user_id = %user.id, "account status updated");
        Ok(Profile::from(&user))
    }

    /// Page through non-blocked identities, optionally filtered by a
    /// name/email substring.
    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<UserPage, AuthError> {
        let (rows, total) = self.store.list_active(search, page).await?;
        Ok(UserPage {
            users: rows.iter().map(Profile::from).collect(),
            page: if page.page == 0 { 1 } else { page.page },
            per_page: page.per_page.clamp(1, 100),
            total,
        })
    }
}

/// First whitespace-separated word becomes the first name, the rest the
/// last name.
fn split_display_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}
