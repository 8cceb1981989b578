use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::Rng;

use crate::db;
use crate::db::{Account, AccountWithTenant, Database, DbError, Invitation, NewAccount, NewTenant, Tenant};

/// Typed access to accounts, tenants and reset secrets.
///
/// Every call runs through the retry wrapper, so callers only ever see permanent errors,
/// [`DbError::Unavailable`], or [`DbError::TimedOut`] for a write whose outcome is unknown.
/// Writes that must not apply twice use [`Database::execute_write_with_retry`].
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    #[must_use]
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountWithTenant>, DbError> {
        self.db
            .execute_with_retry("find_account_by_email", |pool| async move {
                db::get_account_by_email(&pool, email).await
            })
            .await
    }

    pub async fn find_account_by_id(&self, id: i64) -> Result<Option<AccountWithTenant>, DbError> {
        self.db
            .execute_with_retry("find_account_by_id", |pool| async move { db::get_account_by_id(&pool, id).await })
            .await
    }

    pub async fn account_exists(&self, email: &str) -> Result<bool, DbError> {
        self.db
            .execute_with_retry("account_exists", |pool| async move {
                db::account_email_exists(&pool, email).await
            })
            .await
    }

    pub async fn create_account(&self, new_account: &NewAccount) -> Result<Account, DbError> {
        self.db
            .execute_write_with_retry("create_account", |pool| async move {
                db::create_account(&pool, new_account).await
            })
            .await
    }

    /// Creates the tenant and its owning account in one transaction.
    ///
    /// `owner.tenant_id` is ignored and bound to the new tenant. When `tenant.slug` is
    /// taken, a random suffix is appended.
    pub async fn create_tenant_with_owner(
        &self,
        tenant: &NewTenant,
        owner: &NewAccount,
    ) -> Result<(Tenant, Account), DbError> {
        self.db
            .execute_write_with_retry("create_tenant_with_owner", |pool| async move {
                let mut tx = pool.begin().await?;

                let mut new_tenant = tenant.clone();
                if db::tenant_slug_exists(&mut *tx, &new_tenant.slug).await? {
                    new_tenant.slug = format!("{}-{}", tenant.slug, random_slug_suffix());
                }
                let created_tenant = db::create_tenant(&mut *tx, &new_tenant).await?;

                let new_owner = NewAccount {
                    tenant_id: Some(created_tenant.id),
                    ..owner.clone()
                };
                let created_owner = db::create_account(&mut *tx, &new_owner).await?;

                tx.commit().await?;
                Ok::<_, DbError>((created_tenant, created_owner))
            })
            .await
    }

    pub async fn record_login(&self, account_id: i64, at: NaiveDateTime) -> Result<(), DbError> {
        self.db
            .execute_with_retry("record_login", |pool| async move {
                db::update_last_login(&pool, account_id, at).await
            })
            .await
    }

    pub async fn store_reset_secret(&self, account_id: i64, secret_hash: &str, expires_at: i64) -> Result<(), DbError> {
        self.db
            .execute_with_retry("store_reset_secret", |pool| async move {
                db::set_reset_secret(&pool, account_id, secret_hash, expires_at).await
            })
            .await
    }

    /// Account whose reset secret matches `secret_hash` and is still live at `now` (unix seconds)
    pub async fn find_account_by_live_reset_secret(&self, secret_hash: &str, now: i64) -> Result<Option<Account>, DbError> {
        self.db
            .execute_with_retry("find_account_by_live_reset_secret", |pool| async move {
                db::get_account_by_reset_secret(&pool, secret_hash, Some(now)).await
            })
            .await
    }

    /// Account whose reset secret matches `secret_hash`, expired or not
    pub async fn find_account_by_reset_secret(&self, secret_hash: &str) -> Result<Option<Account>, DbError> {
        self.db
            .execute_with_retry("find_account_by_reset_secret", |pool| async move {
                db::get_account_by_reset_secret(&pool, secret_hash, None).await
            })
            .await
    }

    pub async fn consume_reset_secret(
        &self,
        account_id: i64,
        secret_hash: &str,
        new_password_hash: &str,
        now: NaiveDateTime,
    ) -> Result<(), DbError> {
        self.db
            .execute_write_with_retry("consume_reset_secret", |pool| async move {
                db::consume_reset_secret(&pool, account_id, secret_hash, new_password_hash, now).await
            })
            .await
    }

    pub async fn find_pending_invitation(&self, email: &str) -> Result<Option<Invitation>, DbError> {
        self.db
            .execute_with_retry("find_pending_invitation", |pool| async move {
                db::find_pending_invitation(&pool, email).await
            })
            .await
    }

    pub async fn upsert_tenant_setting(&self, tenant_id: i64, key: &str, value: &str) -> Result<(), DbError> {
        self.db
            .execute_with_retry("upsert_tenant_setting", |pool| async move {
                db::upsert_tenant_setting(&pool, tenant_id, key, value).await
            })
            .await
    }
}

fn random_slug_suffix() -> String {
    let bytes: [u8; 3] = rand::rng().random();
    hex::encode(bytes)
}
