//! Signing and verification of the access/refresh token pair.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{Identity, Role, TokenPair};
use super::errors::AuthError;

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer over `{id, email, role}` plus issued-at/expiry claims.
/// Access and refresh tokens use distinct secrets and lifetimes.
#[derive(Clone)]
pub struct TokenSigner {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    remember_me_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(cfg: &configs::JwtConfig) -> Self {
        Self {
            access_secret: cfg.access_secret.clone(),
            refresh_secret: cfg.refresh_secret.clone(),
            access_ttl: Duration::seconds(cfg.access_expiry_secs),
            remember_me_ttl: Duration::seconds(cfg.remember_me_expiry_secs),
            refresh_ttl: Duration::seconds(cfg.refresh_expiry_secs),
        }
    }

    /// Remember-me widens the access expiry to the long lifetime.
    pub fn sign_access(&self, user: &Identity, remember_me: bool) -> Result<String, AuthError> {
        let ttl = if remember_me { self.remember_me_ttl } else { self.access_ttl };
        self.sign(user, &self.access_secret, ttl)
    }

    pub fn sign_refresh(&self, user: &Identity) -> Result<String, AuthError> {
        self.sign(user, &self.refresh_secret, self.refresh_ttl)
    }

    pub fn issue_pair(&self, user: &Identity, remember_me: bool) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign_access(user, remember_me)?,
            refresh_token: self.sign_refresh(user)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        verify(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        verify(token, &self.refresh_secret)
    }

    fn sign(&self, user: &Identity, secret: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| AuthError::Token(e.to_string()))
    }
}

/// Fails closed: malformed, mis-signed, and expired tokens all come back as
/// `Unauthorized`.
fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::Unauthorized("invalid token".into()))
}
