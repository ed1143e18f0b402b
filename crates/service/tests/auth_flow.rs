use std::sync::Arc;

use chrono::{Duration, Utc};
use common::pagination::Pagination;
use service::auth::domain::{
    AccountStatus, AuthProvider, LoginOutcome, RegisterInput, Role, SocialInput, TokenPair,
};
use service::auth::errors::AuthError;
use service::auth::otp::OtpChallenge;
use service::auth::repository::mock::MockCredentialStore;
use service::auth::repository::CredentialStore;
use service::auth::token::TokenSigner;
use service::auth::{AuthService, RegistrationService};
use service::notify::mock::{FailingMailer, RecordingMailer};

fn signer() -> TokenSigner {
    TokenSigner::new(&configs::JwtConfig {
        access_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        ..configs::JwtConfig::default()
    })
}

struct Harness {
    store: Arc<MockCredentialStore>,
    mailer: Arc<RecordingMailer>,
    auth: AuthService<MockCredentialStore>,
    reg: RegistrationService<MockCredentialStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MockCredentialStore::default());
    let mailer = Arc::new(RecordingMailer::default());
    Harness {
        auth: AuthService::new(store.clone(), signer(), mailer.clone()),
        reg: RegistrationService::new(store.clone(), signer(), mailer.clone()),
        store,
        mailer,
    }
}

fn ada() -> RegisterInput {
    RegisterInput {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        password: "secret1".into(),
        accepted_terms: true,
        marketing_opt_in: false,
    }
}

async fn stored_otp(h: &Harness, email: &str) -> OtpChallenge {
    h.store
        .find_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .otp
        .expect("otp challenge present")
}

async fn register_and_verify(h: &Harness, input: RegisterInput) -> TokenPair {
    let email = input.email.clone();
    h.reg.register_direct(input).await.unwrap();
    let code = stored_otp(h, &email).await.code;
    h.auth.verify_otp(&email, &code).await.unwrap()
}

#[tokio::test]
async fn register_returns_redacted_profile_and_stores_challenge() {
    let h = harness();
    let before = Utc::now();
    let profile = h.reg.register_direct(ada()).await.unwrap();

    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.role, Role::EndUser);

    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(!stored.is_email_verified);
    assert_eq!(stored.status, AccountStatus::Active);
    assert!(stored.access_token.is_none() && stored.refresh_token.is_none());

    // Hashed, never the plaintext
    let hash = stored.password_hash.expect("hash stored");
    assert_ne!(hash, "secret1");

    let challenge = stored.otp.expect("challenge stored");
    assert!(challenge.expires_at > before + Duration::minutes(4));
    assert!(challenge.expires_at <= Utc::now() + Duration::minutes(5));

    let body = h.mailer.last_body_to("ada@example.com").expect("otp email sent");
    assert!(body.contains(&challenge.code));
}

#[tokio::test]
async fn register_rejects_short_password_and_missing_consent() {
    let h = harness();

    let mut short = ada();
    short.password = "abc".into();
    assert!(matches!(
        h.reg.register_direct(short).await,
        Err(AuthError::Validation(_))
    ));

    let mut no_terms = ada();
    no_terms.accepted_terms = false;
    assert!(matches!(
        h.reg.register_direct(no_terms).await,
        Err(AuthError::Validation(_))
    ));

    assert_eq!(h.mailer.count(), 0);
    assert!(h.store.find_by_email("ada@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_leaves_first_untouched() {
    let h = harness();
    h.reg.register_direct(ada()).await.unwrap();
    let first = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();

    let mut second = ada();
    second.first_name = "Impostor".into();
    second.password = "different-pass".into();
    assert!(matches!(
        h.reg.register_direct(second).await,
        Err(AuthError::Conflict(_))
    ));

    let after = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(after, first);
}

#[tokio::test]
async fn login_unverified_sends_fresh_otp_and_returns_no_tokens() {
    let h = harness();
    h.reg.register_direct(ada()).await.unwrap();
    let registration_challenge = stored_otp(&h, "ada@example.com").await;

    let outcome = h.auth.login("ada@example.com", "secret1", false).await.unwrap();
    let LoginOutcome::VerificationRequired { user } = outcome else {
        panic!("expected verification to be required");
    };
    assert_eq!(user.email, "ada@example.com");

    // A new challenge was persisted and mailed; still no tokens
    assert_eq!(h.mailer.count(), 2);
    let login_challenge = stored_otp(&h, "ada@example.com").await;
    assert!(login_challenge.expires_at >= registration_challenge.expires_at);
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.access_token.is_none() && stored.refresh_token.is_none());
}

#[tokio::test]
async fn verify_otp_issues_pair_and_is_single_use() {
    let h = harness();
    h.reg.register_direct(ada()).await.unwrap();
    let code = stored_otp(&h, "ada@example.com").await.code;

    let pair = h.auth.verify_otp("ada@example.com", &code).await.unwrap();
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.is_email_verified);
    assert!(stored.otp.is_none());
    assert_eq!(stored.access_token.as_deref(), Some(pair.access_token.as_str()));
    assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));

    // The challenge was consumed; the same code never works twice
    assert!(matches!(
        h.auth.verify_otp("ada@example.com", &code).await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn verify_otp_rejects_wrong_and_expired_codes() {
    let h = harness();
    h.reg.register_direct(ada()).await.unwrap();

    assert!(matches!(
        h.auth.verify_otp("ada@example.com", "000000").await,
        Err(AuthError::Validation(_))
    ));

    // Force the stored challenge past its expiry; a matching code must still
    // be rejected
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    let expired = OtpChallenge {
        code: "123456".into(),
        expires_at: Utc::now() - Duration::seconds(1),
    };
    h.store.set_otp_challenge(stored.id, &expired).await.unwrap();
    let err = h.auth.verify_otp("ada@example.com", "123456").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    assert!(err.to_string().contains("expired"));

    assert!(matches!(
        h.auth.verify_otp("nobody@example.com", "123456").await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn login_verified_returns_pair_matching_store() {
    let h = harness();
    register_and_verify(&h, ada()).await;

    let outcome = h.auth.login("ada@example.com", "secret1", false).await.unwrap();
    let LoginOutcome::LoggedIn { tokens } = outcome else {
        panic!("expected tokens for a verified identity");
    };
    assert!(!tokens.access_token.is_empty() && !tokens.refresh_token.is_empty());

    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(stored.access_token.as_deref(), Some(tokens.access_token.as_str()));
    assert_eq!(stored.refresh_token.as_deref(), Some(tokens.refresh_token.as_str()));
}

#[tokio::test]
async fn login_wrong_password_is_unauthorized_and_mutates_nothing() {
    let h = harness();
    register_and_verify(&h, ada()).await;
    let before = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();

    assert!(matches!(
        h.auth.login("ada@example.com", "wrongpass", false).await,
        Err(AuthError::Unauthorized(_))
    ));

    let after = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn login_unknown_email_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.auth.login("ghost@example.com", "secret1", false).await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn blocked_account_cannot_login_even_with_correct_password() {
    let h = harness();
    register_and_verify(&h, ada()).await;
    let id = h.store.find_by_email("ada@example.com").await.unwrap().unwrap().id;
    h.reg.update_status(id, AccountStatus::Blocked).await.unwrap();

    assert!(matches!(
        h.auth.login("ada@example.com", "secret1", false).await,
        Err(AuthError::Forbidden(_))
    ));
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn refresh_rotates_access_token_only() {
    let h = harness();
    let pair = register_and_verify(&h, ada()).await;

    let access = h.auth.refresh(&pair.refresh_token).await.unwrap();
    let claims = signer().verify_access(&access).unwrap();
    assert_eq!(claims.email, "ada@example.com");

    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(stored.access_token.as_deref(), Some(access.as_str()));
    assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));
}

#[tokio::test]
async fn refresh_rejects_rotated_and_garbage_tokens() {
    let h = harness();
    let old_pair = register_and_verify(&h, ada()).await;

    // A later login rotates the stored pair; the old refresh token still
    // verifies cryptographically but fails the equality check
    let outcome = h.auth.login("ada@example.com", "secret1", true).await.unwrap();
    let LoginOutcome::LoggedIn { tokens: new_pair } = outcome else {
        panic!("expected tokens");
    };
    if new_pair.refresh_token != old_pair.refresh_token {
        assert!(matches!(
            h.auth.refresh(&old_pair.refresh_token).await,
            Err(AuthError::Unauthorized(_))
        ));
    }
    assert!(matches!(
        h.auth.refresh("not-even-a-jwt").await,
        Err(AuthError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn logout_clears_tokens_and_kills_refresh() {
    let h = harness();
    let pair = register_and_verify(&h, ada()).await;

    h.auth.logout("ada@example.com").await.unwrap();
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.access_token.is_none() && stored.refresh_token.is_none());

    assert!(matches!(
        h.auth.refresh(&pair.refresh_token).await,
        Err(AuthError::Unauthorized(_))
    ));
    assert!(matches!(
        h.auth.logout("ghost@example.com").await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn forget_then_reset_password_flow() {
    let h = harness();
    register_and_verify(&h, ada()).await;

    h.auth.forget_password("ada@example.com").await.unwrap();
    let challenge = stored_otp(&h, "ada@example.com").await;
    let body = h.mailer.last_body_to("ada@example.com").unwrap();
    assert!(body.contains(&challenge.code));

    h.auth.reset_password("ada@example.com", "brand-new-pass").await.unwrap();
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.otp.is_none(), "challenge consumed by the reset");
    // Reset issues no tokens; the caller logs in again
    assert!(matches!(
        h.auth.login("ada@example.com", "secret1", false).await,
        Err(AuthError::Unauthorized(_))
    ));
    let outcome = h.auth.login("ada@example.com", "brand-new-pass", false).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
}

#[tokio::test]
async fn social_signup_creates_verified_identity_without_password() {
    let h = harness();
    let session = h
        .reg
        .register_external(SocialInput {
            email: "grace@example.com".into(),
            name: "Grace Brewster Hopper".into(),
            image: Some("https://cdn.example.com/grace.png".into()),
            provider: AuthProvider::Google,
        })
        .await
        .unwrap();

    assert_eq!(session.user.first_name, "Grace");
    assert_eq!(session.user.last_name, "Brewster Hopper");

    let stored = h.store.find_by_email("grace@example.com").await.unwrap().unwrap();
    assert!(stored.is_email_verified, "provider already proved the address");
    assert!(stored.password_hash.is_none());
    assert!(stored.otp.is_none());
    assert_eq!(stored.auth_provider, Some(AuthProvider::Google));
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(session.tokens.refresh_token.as_str())
    );
    assert_eq!(h.mailer.count(), 0, "no otp email on the social path");
}

#[tokio::test]
async fn social_signin_on_existing_account_rotates_pair_or_refuses_blocked() {
    let h = harness();
    let old_pair = register_and_verify(&h, ada()).await;

    let social = SocialInput {
        email: "ada@example.com".into(),
        name: "Ada Lovelace".into(),
        image: None,
        provider: AuthProvider::Apple,
    };
    let session = h.reg.register_external(social.clone()).await.unwrap();
    let stored = h.store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(session.tokens.refresh_token.as_str())
    );
    if session.tokens.refresh_token != old_pair.refresh_token {
        assert!(matches!(
            h.auth.refresh(&old_pair.refresh_token).await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    h.reg.update_status(stored.id, AccountStatus::Blocked).await.unwrap();
    assert!(matches!(
        h.reg.register_external(social).await,
        Err(AuthError::Forbidden(_))
    ));
}

#[tokio::test]
async fn notification_failure_fails_the_request_but_otp_state_persists() {
    let store = Arc::new(MockCredentialStore::default());
    let reg = RegistrationService::new(store.clone(), signer(), Arc::new(FailingMailer));

    let err = reg.register_direct(ada()).await.unwrap_err();
    assert!(matches!(err, AuthError::Notification(_)));

    // The identity and its challenge were persisted before the send; a retry
    // through forget-password or login reissues a fresh code
    let stored = store.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(stored.otp.is_some());
}

#[tokio::test]
async fn my_profile_is_redacted_and_guarded() {
    let h = harness();
    register_and_verify(&h, ada()).await;

    let profile = h.auth.my_profile("ada@example.com").await.unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert!(profile.is_email_verified);
    assert_eq!(profile.status, AccountStatus::Active);

    assert!(matches!(
        h.auth.my_profile("").await,
        Err(AuthError::Unauthorized(_))
    ));
    assert!(matches!(
        h.auth.my_profile("ghost@example.com").await,
        Err(AuthError::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_excludes_blocked_and_paginates() {
    let h = harness();
    for (first, email) in [
        ("Ada", "ada@example.com"),
        ("Grace", "grace@example.com"),
        ("Edsger", "edsger@example.com"),
    ] {
        let mut input = ada();
        input.first_name = first.into();
        input.email = email.into();
        h.reg.register_direct(input).await.unwrap();
    }
    let blocked_id = h.store.find_by_email("edsger@example.com").await.unwrap().unwrap().id;
    h.reg.update_status(blocked_id, AccountStatus::Blocked).await.unwrap();

    let page = h.reg.list_users(None, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.users.iter().all(|u| u.email != "edsger@example.com"));

    let narrow = h
        .reg
        .list_users(Some("grace"), Pagination { page: 1, per_page: 1 })
        .await
        .unwrap();
    assert_eq!(narrow.total, 1);
    assert_eq!(narrow.users[0].email, "grace@example.com");
}
