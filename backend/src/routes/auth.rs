use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;

use crate::auth::SessionClaims;
use crate::core;
use crate::routes::{Envelope, JsonBody};
use crate::services;
use crate::services::{AuthError, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest};

/// Tenant registration route
pub async fn register(
    State(context): State<core::ArcContext>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<Response, AuthError> {
    let registration = services::register(&context, request).await?;
    Ok(Envelope::ok("Registration successful", registration).with_status(StatusCode::CREATED))
}

/// Login route
pub async fn login(
    State(context): State<core::ArcContext>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let grant = services::login(&context, request).await?;
    Ok(Envelope::ok("Login successful", grant))
}

/// Starts password recovery; answers the same way for unknown emails
pub async fn forgot_password(
    State(context): State<core::ArcContext>,
    JsonBody(request): JsonBody<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let requested = services::request_reset(&context, request).await?;
    Ok(Envelope::ok(services::RESET_REQUESTED_MESSAGE, requested))
}

pub async fn reset_password(
    State(context): State<core::ArcContext>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    services::consume_reset(&context, request).await?;
    Ok(Envelope::message("Password has been reset, please log in with your new password"))
}

/// Current account of the bearer token, claims are put in place by the session middleware
pub async fn me(
    State(context): State<core::ArcContext>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<impl IntoResponse, AuthError> {
    let account = services::whoami(&context, &claims).await?;
    Ok(Envelope::ok("Authenticated", account))
}
