use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::core::Context;
use crate::db::DbError;
use crate::services::{AuthError, ResetEmail, spawn_best_effort};

/// Answer to every accepted reset request, whether or not the email is registered
pub const RESET_REQUESTED_MESSAGE: &str = "If this email exists, a reset link was sent";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequested {
    /// Whether the mail dispatch was confirmed before the response went out
    pub email_sent: bool,
}

/// Issues a fresh reset secret for the account and dispatches the recovery link.
///
/// An unknown email without a pending invitation yields the same answer as a known one.
/// The dispatch runs in the background; the answer only waits `mail.response_wait_ms`
/// for its outcome.
pub async fn request_reset(ctx: &Context, request: ForgotPasswordRequest) -> Result<ResetRequested, AuthError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthError::validation("Email is required"));
    }

    let Some(found) = ctx.store.find_account_by_email(&email).await? else {
        if ctx.store.find_pending_invitation(&email).await?.is_some() {
            tracing::info!("Reset requested for an email with a pending invitation");
            return Err(AuthError::PendingInvitation);
        }
        tracing::info!("Reset requested for unknown email");
        return Ok(ResetRequested { email_sent: true });
    };
    let account = found.account;

    let secret = auth::generate_reset_secret();
    let expires_at = Utc::now().timestamp() + ctx.settings.recovery.reset_token_expiry;
    ctx.store.store_reset_secret(account.id, &secret.digest, expires_at).await?;
    tracing::info!(account_id = account.id, expires_at, "Reset secret issued");

    let link = match build_reset_link(&ctx.settings.recovery.link_base_url, &secret.raw) {
        Ok(link) => link,
        Err(e) => {
            tracing::error!(error = %e, "Cannot build reset link, check recovery.link_base_url");
            return Ok(ResetRequested { email_sent: false });
        }
    };

    let message = ResetEmail {
        to_address: account.email.clone(),
        recipient_name: format!("{} {}", account.first_name, account.last_name),
        tenant_name: found.tenant.map(|t| t.name),
        link,
    };
    let notifier = ctx.notifier.clone();
    let dispatch = spawn_best_effort("send_reset_email", ctx.settings.mail.timeout(), async move {
        notifier.send_reset_email(&message).await
    });

    let email_sent = match tokio::time::timeout(ctx.settings.mail.response_wait(), dispatch).await {
        Ok(Ok(sent)) => sent,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Reset email task panicked");
            false
        }
        // still running, it finishes on its own
        Err(_) => false,
    };

    if !email_sent {
        tracing::warn!(account_id = account.id, "Reset link generated but email dispatch not confirmed");
    }
    Ok(ResetRequested { email_sent })
}

/// Replaces the password of the account holding `request.token`.
///
/// The secret is consumed by a single conditional write, so of two concurrent requests with
/// the same token exactly one succeeds and the other gets [`AuthError::TokenInvalid`]. A
/// secret that expires between the lookup and the write still reports
/// [`AuthError::TokenExpired`].
pub async fn consume_reset(ctx: &Context, request: ResetPasswordRequest) -> Result<(), AuthError> {
    let token = request.token.trim();
    if token.is_empty() || request.password.is_empty() {
        return Err(AuthError::validation("Token and new password are required"));
    }
    let min_length = ctx.settings.recovery.min_password_length;
    if request.password.chars().count() < min_length {
        return Err(AuthError::validation(format!("Password must be at least {min_length} characters")));
    }

    let digest = auth::digest_reset_secret(token);
    let now = Utc::now();

    let Some(account) = ctx.store.find_account_by_live_reset_secret(&digest, now.timestamp()).await? else {
        return match ctx.store.find_account_by_reset_secret(&digest).await? {
            Some(account) => {
                tracing::info!(account_id = account.id, "Reset rejected, secret expired");
                Err(AuthError::TokenExpired)
            }
            None => {
                tracing::info!("Reset rejected, unknown secret");
                Err(AuthError::TokenInvalid)
            }
        };
    };

    let password_hash = auth::hash_password(&request.password)?;
    match ctx
        .store
        .consume_reset_secret(account.id, &digest, &password_hash, now.naive_utc())
        .await
    {
        Ok(()) => {
            tracing::info!(account_id = account.id, "Password reset completed");
            Ok(())
        }
        Err(e @ (DbError::Conflict | DbError::TimedOut)) => {
            settle_consume(ctx, account.id, &digest, &password_hash, e).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Works out what a consume that matched no row, or timed out, actually did.
///
/// Our own hash in place means the write committed. Otherwise, on a conflict, a secret
/// still held by the account can only have failed the expiry check.
async fn settle_consume(
    ctx: &Context,
    account_id: i64,
    digest: &str,
    password_hash: &str,
    failure: DbError,
) -> Result<(), AuthError> {
    let current = ctx.store.find_account_by_id(account_id).await?.map(|found| found.account);
    if current.as_ref().is_some_and(|account| account.password_hash == password_hash) {
        tracing::info!(account_id, error = %failure, "Password reset completed despite failed reply");
        return Ok(());
    }
    if !matches!(failure, DbError::Conflict) {
        return Err(failure.into());
    }

    if current.is_some_and(|account| account.reset_secret_hash.as_deref() == Some(digest)) {
        tracing::info!(account_id, "Reset rejected, secret expired before it was consumed");
        Err(AuthError::TokenExpired)
    } else {
        tracing::warn!(account_id, "Reset secret consumed or replaced concurrently");
        Err(AuthError::TokenInvalid)
    }
}

fn build_reset_link(base: &str, raw_secret: &str) -> Result<String, url::ParseError> {
    let mut url = url::Url::parse(base)?;
    url.query_pairs_mut().append_pair("token", raw_secret);
    Ok(url.into())
}
