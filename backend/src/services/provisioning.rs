use serde::{Deserialize, Serialize};

use crate::auth;
use crate::core::Context;
use crate::db::{NewAccount, NewTenant, Plan, Role, TenantSummary};
use crate::services::{AccountView, AuthError, issue_session, spawn_best_effort};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub tenant_name: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub account: AccountView,
    pub tenant: TenantSummary,
    pub token: String,
    pub expires_in: i64,
}

/// Creates a tenant together with its owning admin account and signs the owner in.
///
/// Tenant and account are written in one transaction. Tenant defaults are seeded in the
/// background once that transaction has committed; their failure never fails registration.
pub async fn register(ctx: &Context, request: RegisterRequest) -> Result<Registration, AuthError> {
    let email = request.email.trim().to_lowercase();
    let first_name = request.first_name.trim();
    let last_name = request.last_name.trim();
    let tenant_name = request.tenant_name.trim();

    if email.is_empty() || request.password.is_empty() || first_name.is_empty() || last_name.is_empty() || tenant_name.is_empty() {
        return Err(AuthError::validation(
            "Email, password, first name, last name and organization name are required",
        ));
    }
    if !email.contains('@') {
        return Err(AuthError::validation("Email address is invalid"));
    }
    let min_length = ctx.settings.recovery.min_password_length;
    if request.password.chars().count() < min_length {
        return Err(AuthError::validation(format!("Password must be at least {min_length} characters")));
    }

    if ctx.store.account_exists(&email).await? {
        tracing::info!("Registration rejected, email already registered");
        return Err(AuthError::DuplicateAccount);
    }

    let password_hash = auth::hash_password(&request.password)?;

    let new_tenant = NewTenant {
        name: tenant_name.to_string(),
        contact_email: email.clone(),
        phone: request.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        plan: Plan::default(),
        currency: ctx.settings.provisioning.default_currency.clone(),
        slug: slugify(tenant_name),
    };
    let owner = NewAccount {
        email,
        password_hash,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role: Role::TenantAdmin,
        tenant_id: None,
    };

    // a concurrent registration can still win the race for the email
    let (tenant, account) = ctx
        .store
        .create_tenant_with_owner(&new_tenant, &owner)
        .await
        .map_err(|e| if e.is_unique_violation() { AuthError::DuplicateAccount } else { e.into() })?;

    let defaults = ctx.tenant_defaults.clone();
    let tenant_id = tenant.id;
    spawn_best_effort(
        "initialize_tenant_defaults",
        ctx.settings.provisioning.defaults_timeout(),
        async move { defaults.initialize_defaults(tenant_id).await },
    );

    let summary = TenantSummary::from(&tenant);
    let grant = issue_session(ctx, &account, Some(summary.clone()))?;

    tracing::info!(account_id = account.id, tenant_id, slug = %tenant.slug, "Tenant registered");
    Ok(Registration {
        account: grant.account,
        tenant: summary,
        token: grant.token,
        expires_in: grant.expires_in,
    })
}

/// URL-safe slug from a display name: lower-case ASCII alphanumeric runs joined by `-`
#[must_use]
pub fn slugify(name: &str) -> String {
    let slug = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "tenant".to_string() } else { slug }
}
