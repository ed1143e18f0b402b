//! The `user` table: one row per registered identity.
//!
//! Mutation helpers are intent-named so paired columns stay consistent:
//! `otp`/`otp_expiry` are always written or cleared together, and token
//! columns only change through the issuance/revocation helpers.

use sea_orm::{entity::prelude::*, Condition, PaginatorTrait, QueryOrder, Set, DatabaseConnection, DbErr, SqlErr};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Absent for identities created through an external provider.
    pub password_hash: Option<String>,
    pub role: String,
    pub status: String,
    pub is_email_verified: bool,
    pub auth_provider: Option<String>,
    pub image: Option<String>,
    pub otp: Option<String>,
    pub otp_expiry: Option<DateTimeWithTimeZone>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub accepted_terms: bool,
    pub marketing_opt_in: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_BLOCKED: &str = "BLOCKED";

/// Creation payload. `otp` carries the code and its expiry as one value so
/// an unverified row can never be inserted with half a challenge.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
    pub auth_provider: Option<String>,
    pub image: Option<String>,
    pub otp: Option<(String, DateTimeWithTimeZone)>,
    pub accepted_terms: bool,
    pub marketing_opt_in: bool,
}

pub fn validate_new(new: &NewUser) -> Result<(), ModelError> {
    if !new.email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    if new.first_name.trim().is_empty() {
        return Err(ModelError::Validation("first name required".into()));
    }
    if new.role.trim().is_empty() {
        return Err(ModelError::Validation("role required".into()));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, new: NewUser) -> Result<Model, ModelError> {
    validate_new(&new)?;
    let now = Utc::now().into();
    let (otp, otp_expiry) = match new.otp {
        Some((code, expiry)) => (Some(code), Some(expiry)),
        None => (None, None),
    };
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(new.email),
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        password_hash: Set(new.password_hash),
        role: Set(new.role),
        status: Set(STATUS_ACTIVE.to_string()),
        is_email_verified: Set(new.is_email_verified),
        auth_provider: Set(new.auth_provider),
        image: Set(new.image),
        otp: Set(otp),
        otp_expiry: Set(otp_expiry),
        access_token: Set(None),
        refresh_token: Set(None),
        accepted_terms: Set(new.accepted_terms),
        marketing_opt_in: Set(new.marketing_opt_in),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(insert_err)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await
        .map_err(db_err)
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(db_err)
}

/// Store a fresh OTP challenge; the code and expiry are replaced as a pair.
pub async fn set_otp_challenge(
    db: &DatabaseConnection,
    id: Uuid,
    code: &str,
    expires_at: DateTimeWithTimeZone,
) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.otp = Set(Some(code.to_string()));
    am.otp_expiry = Set(Some(expires_at));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

/// Flip the verification flag, consume the OTP challenge, and store the
/// freshly issued token pair in a single update.
pub async fn mark_verified(
    db: &DatabaseConnection,
    id: Uuid,
    access_token: &str,
    refresh_token: &str,
) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.is_email_verified = Set(true);
    am.otp = Set(None);
    am.otp_expiry = Set(None);
    am.access_token = Set(Some(access_token.to_string()));
    am.refresh_token = Set(Some(refresh_token.to_string()));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

/// Overwrite both token columns; the previous refresh token is dead after
/// this returns.
pub async fn store_token_pair(
    db: &DatabaseConnection,
    id: Uuid,
    access_token: &str,
    refresh_token: &str,
) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.access_token = Set(Some(access_token.to_string()));
    am.refresh_token = Set(Some(refresh_token.to_string()));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

/// Rotate the access token only; the refresh token stays valid.
pub async fn store_access_token(
    db: &DatabaseConnection,
    id: Uuid,
    access_token: &str,
) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.access_token = Set(Some(access_token.to_string()));
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

pub async fn clear_tokens(db: &DatabaseConnection, id: Uuid) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.access_token = Set(None);
    am.refresh_token = Set(None);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

/// Store a new password hash and consume any outstanding OTP challenge.
pub async fn reset_password(
    db: &DatabaseConnection,
    id: Uuid,
    password_hash: &str,
) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.password_hash = Set(Some(password_hash.to_string()));
    am.otp = Set(None);
    am.otp_expiry = Set(None);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

pub async fn set_status(db: &DatabaseConnection, id: Uuid, status: &str) -> Result<Model, ModelError> {
    let mut am = load(db, id).await?;
    am.status = Set(status.to_string());
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(db_err)
}

/// Page through non-blocked identities, newest first, optionally filtered by
/// a name/email substring. Returns the page and the total under the same
/// filter.
pub async fn list_active_paginated(
    db: &DatabaseConnection,
    search: Option<&str>,
    page_idx: u64,
    per_page: u64,
) -> Result<(Vec<Model>, u64), ModelError> {
    let mut query = Entity::find()
        .filter(Column::Status.ne(STATUS_BLOCKED))
        .order_by_desc(Column::CreatedAt);
    if let Some(term) = search {
        query = query.filter(
            Condition::any()
                .add(Column::FirstName.contains(term))
                .add(Column::LastName.contains(term))
                .add(Column::Email.contains(term)),
        );
    }
    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await.map_err(db_err)?;
    let rows = paginator.fetch_page(page_idx).await.map_err(db_err)?;
    Ok((rows, total))
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<ActiveModel, ModelError> {
    let found = Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ModelError::NotFound("user not found".into()))?;
    Ok(found.into())
}

fn db_err(e: DbErr) -> ModelError {
    ModelError::Db(e.to_string())
}

fn insert_err(e: DbErr) -> ModelError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ModelError::Conflict("email already registered".into())
        }
        _ => ModelError::Db(e.to_string()),
    }
}
