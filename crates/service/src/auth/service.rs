use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use super::domain::{AccountStatus, LoginOutcome, Profile, PublicProfile, TokenPair};
use super::errors::AuthError;
use super::otp::OtpChallenge;
use super::password;
use super::repository::CredentialStore;
use super::token::TokenSigner;
use crate::notify::{template, NotificationGateway, NotificationKind};

/// Session lifecycle orchestrator, independent of the web framework.
///
/// Stateless between calls: every operation reads and writes through the
/// credential store and completes within the request that triggered it.
pub struct AuthService<S: CredentialStore> {
    store: Arc<S>,
    tokens: TokenSigner,
    notifier: Arc<dyn NotificationGateway>,
}

impl<S: CredentialStore> AuthService<S> {
    pub fn new(store: Arc<S>, tokens: TokenSigner, notifier: Arc<dyn NotificationGateway>) -> Self {
        Self { store, tokens, notifier }
    }

    /// Authenticate by password. Unverified identities get a fresh OTP email
    /// and no tokens; verified identities get a new pair, with the access
    /// expiry widened when `remember_me` is set.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, RegistrationService};
    /// use service::auth::domain::{LoginOutcome, RegisterInput};
    /// use service::auth::repository::mock::MockCredentialStore;
    /// use service::auth::token::TokenSigner;
    /// use service::notify::mock::RecordingMailer;
    ///
    /// let store = Arc::new(MockCredentialStore::default());
    /// let mailer = Arc::new(RecordingMailer::default());
    /// let signer = TokenSigner::new(&configs::JwtConfig {
    ///     access_secret: "access".into(),
    ///     refresh_secret: "refresh".into(),
    ///     ..configs::JwtConfig::default()
    /// });
    /// let reg = RegistrationService::new(store.clone(), signer.clone(), mailer.clone());
    /// let auth = AuthService::new(store, signer, mailer);
    /// tokio_test::block_on(async {
    ///     reg.register_direct(RegisterInput {
    ///         first_name: "Ada".into(),
    ///         last_name: "Lovelace".into(),
    ///         email: "ada@example.com".into(),
    ///         password: "secret1".into(),
    ///         accepted_terms: true,
    ///         marketing_opt_in: false,
    ///     }).await.unwrap();
    ///     let outcome = auth.login("ada@example.com", "secret1", false).await.unwrap();
    ///     assert!(matches!(outcome, LoginOutcome::VerificationRequired { .. }));
    /// });
    /// ```
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<LoginOutcome, AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;

        if user.status == AccountStatus::Blocked {
            return Err(AuthError::Forbidden("account is blocked, contact support".into()));
        }

        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Err(AuthError::Validation("password is required".into()));
        };
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        if !password::verify_password(password, stored_hash)? {
            return Err(AuthError::Unauthorized("password is incorrect".into()));
        }

        if !user.is_email_verified {
            let challenge = OtpChallenge::issue();
            self.store.set_otp_challenge(user.id, &challenge).await?;
            self.notifier
                .send(NotificationKind::Otp, &user.email, &template::otp_email(&challenge.code))
                .await?;
            info!(user_id = %user.id, "verification otp sent");
            return Ok(LoginOutcome::VerificationRequired {
                user: PublicProfile::from(&user),
            });
        }

        let pair = self.tokens.issue_pair(&user, remember_me)?;
        self.store.store_token_pair(user.id, &pair).await?;
        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome::LoggedIn { tokens: pair })
    }

    /// Consume an OTP challenge. Success flips the verification flag, clears
    /// the challenge, and issues the first token pair in one store update; a
    /// second call with the same code fails because the challenge is gone.
    #[instrument(skip(self, code), fields(email = %email))]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;

        let challenge = match &user.otp {
            Some(c) if c.code_matches(code) => c,
            _ => return Err(AuthError::Validation("invalid OTP".into())),
        };
        if challenge.is_expired(Utc::now()) {
            return Err(AuthError::Validation("OTP expired".into()));
        }

        let pair = self.tokens.issue_pair(&user, false)?;
        self.store.mark_verified(user.id, &pair).await?;
        info!(user_id = %user.id, "email verified");
        Ok(pair)
    }

    /// Mint a new access token against a presented refresh token. The token
    /// must verify cryptographically and equal the stored one; a refresh
    /// token invalidated by logout or a newer login fails the equality check
    /// even while unexpired.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .store
            .find_by_email(&claims.email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            debug!(user_id = %user.id, "presented refresh token does not match stored one");
            return Err(AuthError::Unauthorized("invalid token".into()));
        }

        let access = self.tokens.sign_access(&user, false)?;
        self.store.store_access_token(user.id, &access).await?;
        info!(user_id = %user.id, "access token refreshed");
        Ok(access)
    }

    /// Drop both stored tokens; outstanding bearer tokens then fail the
    /// refresh equality check regardless of their cryptographic expiry.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn logout(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;
        self.store.clear_tokens(user.id).await?;
        info!(user_id = %user.id, "logged out");
        Ok(())
    }

    /// Start a password reset: issue and persist a new OTP challenge and
    /// email it. Verification and token state stay untouched.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forget_password(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;
        let challenge = OtpChallenge::issue();
        self.store.set_otp_challenge(user.id, &challenge).await?;
        self.notifier
            .send(NotificationKind::Otp, &user.email, &template::otp_email(&challenge.code))
            .await?;
        info!(user_id = %user.id, "password reset otp sent");
        Ok(())
    }

    /// Store a new password hash and consume any outstanding challenge.
    /// Issues no tokens; the caller logs in afterwards. OTP possession is
    /// proven by the boundary layer gating this operation behind a prior
    /// `verify_otp`, not re-checked here.
    #[instrument(skip(self, new_password), fields(email = %email))]
    pub async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;
        let hash = password::hash_password(new_password)?;
        self.store.reset_password(user.id, &hash).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Redacted projection of the caller's own identity.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn my_profile(&self, email: &str) -> Result<Profile, AuthError> {
        if email.is_empty() {
            return Err(AuthError::Unauthorized("unauthorized".into()));
        }
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".into()))?;
        Ok(Profile::from(&user))
    }
}
