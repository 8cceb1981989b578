use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::auth::JwtError;
use crate::db::DbError;
use crate::routes::Envelope;

/// Every way an authentication or recovery operation can be rejected.
///
/// `InvalidCredentials` is used for both unknown emails and wrong passwords.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account has been deactivated")]
    AccountDisabled,

    #[error("This organization's account has been deactivated")]
    TenantDisabled,

    #[error("This account is not associated with an organization")]
    TenantRequired,

    #[error("An account with this email already exists")]
    DuplicateAccount,

    #[error("You have a pending invitation for this email, please accept it before resetting your password")]
    PendingInvitation,

    #[error("This reset link has expired, please request a new one")]
    TokenExpired,

    #[error("This reset link is invalid")]
    TokenInvalid,

    #[error("The service is temporarily unavailable, please try again")]
    ServiceUnavailable(#[source] DbError),

    #[error("Missing or invalid session token")]
    Unauthorized(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    PasswordHashingFailed(argon2::password_hash::Error),

    #[error("Storage error: {0}")]
    Storage(#[source] DbError),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::TenantDisabled => "TENANT_DISABLED",
            Self::TenantRequired => "TENANT_REQUIRED",
            Self::DuplicateAccount => "DUPLICATE_ACCOUNT",
            Self::PendingInvitation => "PENDING_INVITATION",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::PasswordHashingFailed(_) | Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::PendingInvitation | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::TenantDisabled
            | Self::TenantRequired
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DuplicateAccount => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PasswordHashingFailed(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DbError> for AuthError {
    fn from(e: DbError) -> Self {
        if e.is_unavailable() {
            Self::ServiceUnavailable(e)
        } else {
            Self::Storage(e)
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::PasswordHashingFailed(e)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                error_type = %std::any::type_name::<Self>(),
                error_code = self.code(),
                error_message = %self,
                error_source = ?std::error::Error::source(&self).map(ToString::to_string));
        } else {
            tracing::warn!(
                error_type = %std::any::type_name::<Self>(),
                error_code = self.code(),
                error_message = %self);
        }

        // internal details stay in the logs
        let message = match &self {
            Self::PasswordHashingFailed(_) | Self::Storage(_) => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };

        Envelope::error(self.code(), message).with_status(status)
    }
}
