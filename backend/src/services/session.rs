use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::core::Context;
use crate::db::{Account, AccountWithTenant, Role, TenantSummary};
use crate::services::{AuthError, spawn_best_effort};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What callers get to see of an account: no password hash, no reset fields
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
    pub active: bool,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub tenant: Option<TenantSummary>,
}

impl AccountView {
    #[must_use]
    pub fn new(account: &Account, tenant: Option<TenantSummary>) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role: account.role,
            tenant_id: account.tenant_id,
            active: account.active,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
            tenant,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub account: AccountView,
    pub token: String,
    pub expires_in: i64,
}

/// Verifies credentials and issues a session token.
///
/// Storage health is confirmed before anything is looked up, and the account and tenant
/// state are checked before the password is compared.
pub async fn login(ctx: &Context, request: LoginRequest) -> Result<SessionGrant, AuthError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(AuthError::validation("Email and password are required"));
    }

    ctx.db().ensure_healthy().await.map_err(AuthError::ServiceUnavailable)?;

    let Some(found) = ctx.store.find_account_by_email(&email).await? else {
        auth::verify_dummy_password(&request.password);
        tracing::info!("Login attempt for unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    check_account_state(&found)?;

    if !auth::verify_password(&request.password, &found.account.password_hash)? {
        tracing::info!(account_id = found.account.id, "Login attempt with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let now = Utc::now().naive_utc();
    let grant = issue_session(ctx, &found.account, found.tenant.clone())?;

    let store = ctx.store.clone();
    let account_id = found.account.id;
    spawn_best_effort("record_login", ctx.settings.database.resilience.overall_deadline(), async move {
        store.record_login(account_id, now).await
    });

    tracing::info!(account_id, tenant_id = ?found.account.tenant_id, "Account logged in");
    Ok(SessionGrant {
        account: AccountView {
            last_login_at: Some(now),
            ..grant.account
        },
        ..grant
    })
}

/// Resolves the bearer of a session token to its current account, re-applying the same
/// account and tenant checks as [`login`].
pub async fn whoami(ctx: &Context, claims: &auth::SessionClaims) -> Result<AccountView, AuthError> {
    let account_id = claims.account_id()?;
    let found = ctx
        .store
        .find_account_by_id(account_id)
        .await?
        .ok_or(AuthError::Unauthorized(auth::JwtError::InvalidToken))?;

    check_account_state(&found)?;
    Ok(AccountView::new(&found.account, found.tenant))
}

/// Rejects inactive accounts and accounts whose tenant binding does not allow a session
pub fn check_account_state(found: &AccountWithTenant) -> Result<(), AuthError> {
    let account = &found.account;
    if !account.active {
        tracing::info!(account_id = account.id, "Login rejected, account disabled");
        return Err(AuthError::AccountDisabled);
    }

    match &found.tenant {
        None if account.role != Role::SuperAdmin => {
            tracing::warn!(account_id = account.id, role = ?account.role, "Login rejected, no tenant bound");
            Err(AuthError::TenantRequired)
        }
        Some(tenant) if !tenant.active => {
            tracing::info!(account_id = account.id, tenant_id = tenant.id, "Login rejected, tenant disabled");
            Err(AuthError::TenantDisabled)
        }
        _ => Ok(()),
    }
}

/// Mints the session token for an account that has already passed every check
pub fn issue_session(ctx: &Context, account: &Account, tenant: Option<TenantSummary>) -> Result<SessionGrant, AuthError> {
    let token = auth::generate_session_token(&ctx.jwt, account.id, &account.email, account.role, account.tenant_id)?;
    Ok(SessionGrant {
        account: AccountView::new(account, tenant),
        token,
        expires_in: ctx.jwt.session_token_expiry,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::Plan;

    fn account(role: Role, tenant_id: Option<i64>, active: bool) -> Account {
        let now = Utc::now().naive_utc();
        Account {
            id: 1,
            email: "a@acme.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            role,
            tenant_id,
            active,
            last_login_at: None,
            password_changed_at: None,
            reset_secret_hash: Some("digest".to_string()),
            reset_secret_expires_at: Some(0),
            created_at: now,
            updated_at: now,
        }
    }

    fn tenant(active: bool) -> TenantSummary {
        TenantSummary {
            id: 7,
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            plan: Plan::Free,
            active,
        }
    }

    #[test]
    fn test_active_account_with_active_tenant_passes() {
        let found = AccountWithTenant {
            account: account(Role::TenantAdmin, Some(7), true),
            tenant: Some(tenant(true)),
        };
        assert!(check_account_state(&found).is_ok());
    }

    #[test]
    fn test_inactive_account_is_rejected_first() {
        let found = AccountWithTenant {
            account: account(Role::Standard, Some(7), false),
            tenant: Some(tenant(false)),
        };
        assert!(matches!(check_account_state(&found), Err(AuthError::AccountDisabled)));
    }

    #[test]
    fn test_tenantless_non_super_admin_is_rejected() {
        for role in [Role::Standard, Role::TenantAdmin] {
            let found = AccountWithTenant {
                account: account(role, None, true),
                tenant: None,
            };
            assert!(matches!(check_account_state(&found), Err(AuthError::TenantRequired)));
        }
    }

    #[test]
    fn test_tenantless_super_admin_passes() {
        let found = AccountWithTenant {
            account: account(Role::SuperAdmin, None, true),
            tenant: None,
        };
        assert!(check_account_state(&found).is_ok());
    }

    #[test]
    fn test_disabled_tenant_is_rejected() {
        let found = AccountWithTenant {
            account: account(Role::Standard, Some(7), true),
            tenant: Some(tenant(false)),
        };
        assert!(matches!(check_account_state(&found), Err(AuthError::TenantDisabled)));
    }

    #[test]
    fn test_account_view_hides_secrets() {
        let view = AccountView::new(&account(Role::TenantAdmin, Some(7), true), Some(tenant(true)));
        let body = serde_json::to_value(&view).unwrap();
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("resetSecretHash").is_none());
        assert!(body.get("resetSecretExpiresAt").is_none());
        assert_eq!(body["firstName"], "Ada");
        assert_eq!(body["tenant"]["slug"], "acme");
        assert_eq!(body["role"], "TENANT_ADMIN");
    }
}
