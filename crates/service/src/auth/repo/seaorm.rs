//! SeaORM-backed credential store over the `models::user` table.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::pagination::Pagination;

use crate::auth::domain::{AccountStatus, AuthProvider, Identity, NewIdentity, Role, TokenPair};
use crate::auth::errors::AuthError;
use crate::auth::otp::OtpChallenge;
use crate::auth::repository::CredentialStore;

pub struct SeaOrmCredentialStore {
    pub db: DatabaseConnection,
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let row = models::user::find_by_email(&self.db, email).await?;
        row.map(to_identity).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let row = models::user::find_by_id(&self.db, id).await?;
        row.map(to_identity).transpose()
    }

    async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError> {
        let row = models::user::create(
            &self.db,
            models::user::NewUser {
                email: new.email,
                first_name: new.first_name,
                last_name: new.last_name,
                password_hash: new.password_hash,
                role: new.role.as_str().to_string(),
                is_email_verified: new.is_email_verified,
                auth_provider: new.auth_provider.map(|p| p.as_str().to_string()),
                image: new.image,
                otp: new.otp.map(|c| (c.code, c.expires_at.into())),
                accepted_terms: new.accepted_terms,
                marketing_opt_in: new.marketing_opt_in,
            },
        )
        .await?;
        to_identity(row)
    }

    async fn set_otp_challenge(&self, id: Uuid, challenge: &OtpChallenge) -> Result<(), AuthError> {
        models::user::set_otp_challenge(&self.db, id, &challenge.code, challenge.expires_at.into())
            .await?;
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError> {
        models::user::mark_verified(&self.db, id, &tokens.access_token, &tokens.refresh_token)
            .await?;
        Ok(())
    }

    async fn store_token_pair(&self, id: Uuid, tokens: &TokenPair) -> Result<(), AuthError> {
        models::user::store_token_pair(&self.db, id, &tokens.access_token, &tokens.refresh_token)
            .await?;
        Ok(())
    }

    async fn store_access_token(&self, id: Uuid, access_token: &str) -> Result<(), AuthError> {
        models::user::store_access_token(&self.db, id, access_token).await?;
        Ok(())
    }

    async fn clear_tokens(&self, id: Uuid) -> Result<(), AuthError> {
        models::user::clear_tokens(&self.db, id).await?;
        Ok(())
    }

    async fn reset_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        models::user::reset_password(&self.db, id, password_hash).await?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<Identity, AuthError> {
        let row = models::user::set_status(&self.db, id, status.as_str()).await?;
        to_identity(row)
    }

    async fn list_active(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Identity>, u64), AuthError> {
        let (page_idx, per_page) = page.normalize();
        let (rows, total) =
            models::user::list_active_paginated(&self.db, search, page_idx, per_page).await?;
        let identities = rows
            .into_iter()
            .map(to_identity)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((identities, total))
    }
}

fn to_identity(m: models::user::Model) -> Result<Identity, AuthError> {
    let role = Role::parse(&m.role)
        .ok_or_else(|| AuthError::Repository(format!("unknown role: {}", m.role)))?;
    let status = AccountStatus::parse(&m.status)
        .ok_or_else(|| AuthError::Repository(format!("unknown status: {}", m.status)))?;
    let auth_provider = m
        .auth_provider
        .as_deref()
        .map(|p| {
            AuthProvider::parse(p)
                .ok_or_else(|| AuthError::Repository(format!("unknown auth provider: {p}")))
        })
        .transpose()?;
    // The paired columns only form a challenge when both are present.
    let otp = match (m.otp, m.otp_expiry) {
        (Some(code), Some(expiry)) => Some(OtpChallenge {
            code,
            expires_at: expiry.with_timezone(&Utc),
        }),
        _ => None,
    };
    Ok(Identity {
        id: m.id,
        email: m.email,
        first_name: m.first_name,
        last_name: m.last_name,
        password_hash: m.password_hash,
        role,
        status,
        is_email_verified: m.is_email_verified,
        auth_provider,
        image: m.image,
        otp,
        access_token: m.access_token,
        refresh_token: m.refresh_token,
        accepted_terms: m.accepted_terms,
        marketing_opt_in: m.marketing_opt_in,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}
