use std::fs;

use axum::extract::Request;
use axum::http;
use chrono::Utc;
use jsonwebtoken as jwt;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cfg;
use crate::db::Role;

type TryRngError = <rand::rngs::OsRng as rand::TryRngCore>::Error;

const MIN_SECRET_LEN: usize = 32;

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode session token")]
    EncodingFailed(jwt::errors::Error),

    #[error("Failed to decode session token")]
    DecodingFailed(jwt::errors::Error),

    #[error("File system operation failed")]
    FileSystemOperationFailed { #[from] source: std::io::Error },

    #[error("Random number generation operation failed")]
    RngOperationFailed { source: TryRngError },

    #[error("Session token has expired")]
    TokenExpired,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Invalid authorization header")]
    InvalidAuthorizationHeader,
}

/// Claims carried by the bearer credential handed out on login and registration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionClaims {
    pub sub: String,            // account id
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<i64>, // None only for super admins
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn account_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct JwtContext {
    pub encoding_key: jwt::EncodingKey,
    pub decoding_key: jwt::DecodingKey,
    pub validation: jwt::Validation,
    pub session_token_expiry: i64,
}

impl JwtContext {
    pub fn new(settings: &cfg::JwtSettings, secret: &str) -> Result<Self, JwtError> {
        let encoding_key = jwt::EncodingKey::from_secret(secret.as_ref());
        let decoding_key = jwt::DecodingKey::from_secret(secret.as_ref());
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            session_token_expiry: settings.session_token_expiry,
        })
    }
}

/// Signs a session token for the given account
pub fn generate_session_token(
    ctx: &JwtContext,
    account_id: i64,
    email: &str,
    role: Role,
    tenant_id: Option<i64>,
) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();
    let header = jwt::Header::new(jwt::Algorithm::HS256);
    let claims = SessionClaims {
        sub: account_id.to_string(),
        email: email.to_string(),
        role,
        tenant_id,
        exp: now + ctx.session_token_expiry,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    jwt::encode(&header, &claims, &ctx.encoding_key).map_err(JwtError::EncodingFailed)
}

pub fn decode_session_token_from_req(ctx: &JwtContext, req: &Request) -> Result<SessionClaims, JwtError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    decode_session_token(ctx, token)
}

/// Validates signature and expiry, returning the embedded claims
pub fn decode_session_token(ctx: &JwtContext, token: &str) -> Result<SessionClaims, JwtError> {
    let token_data = jwt::decode::<SessionClaims>(token, &ctx.decoding_key, &ctx.validation)?;
    Ok(token_data.claims)
}

/// Loads the signing secret from `APP_JWT_SECRET`, falling back to a persisted secret file
/// that is created on first use.
pub fn get_jwt_secret() -> Result<String, JwtError> {
    if let Ok(env_secret) = std::env::var("APP_JWT_SECRET") {
        let trimmed_secret = env_secret.trim();
        if trimmed_secret.len() >= MIN_SECRET_LEN {
            return Ok(trimmed_secret.to_string());
        }
        tracing::warn!("APP_JWT_SECRET is shorter than {MIN_SECRET_LEN} characters, ignoring it");
    }

    let secret_file_path = cfg::AppSettings::get_config_path().join(".jwt_secret");
    if let Ok(file_secret) = fs::read_to_string(&secret_file_path) {
        let trimmed_secret = file_secret.trim();
        if trimmed_secret.len() >= MIN_SECRET_LEN {
            return Ok(trimmed_secret.to_string());
        }
    }

    if let Some(parent) = &secret_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let new_secret = generate_secure_secret()?;
    fs::write(&secret_file_path, &new_secret)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&secret_file_path)?.permissions();
        perms.set_mode(0o600); // rw-------
        fs::set_permissions(&secret_file_path, perms)?;
    }

    tracing::info!("Generated new JWT secret in {}", secret_file_path.to_string_lossy());
    Ok(new_secret)
}

fn generate_secure_secret() -> Result<String, JwtError> {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| JwtError::RngOperationFailed { source: e })?;
    Ok(hex::encode(bytes))
}

#[allow(clippy::match_same_arms)]
impl From<jwt::errors::Error> for JwtError {
    fn from(e: jwt::errors::Error) -> Self {
        match e.kind() {
            jwt::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            jwt::errors::ErrorKind::InvalidToken => Self::InvalidToken,
            jwt::errors::ErrorKind::InvalidSignature => Self::InvalidToken,
            jwt::errors::ErrorKind::Json(_) => Self::InvalidToken,
            _ => Self::DecodingFailed(e),
        }
    }
}
