use thiserror::Error;

/// Business errors for credential and session workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error("notification error: {0}")]
    Notification(String),
}

impl AuthError {
    /// Transport status code for the boundary layer's error mapping
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 400,
            AuthError::Unauthorized(_) => 401,
            AuthError::Forbidden(_) => 403,
            AuthError::NotFound(_) => 404,
            AuthError::Conflict(_) => 409,
            AuthError::Hash(_)
            | AuthError::Token(_)
            | AuthError::Repository(_)
            | AuthError::Notification(_) => 500,
        }
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError as M;
        match e {
            M::Validation(msg) => AuthError::Validation(msg),
            M::Conflict(msg) => AuthError::Conflict(msg),
            M::NotFound(msg) => AuthError::NotFound(msg),
            M::Db(msg) => AuthError::Repository(msg),
        }
    }
}
