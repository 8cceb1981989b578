use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::sqlite::SqliteExecutor;

use crate::db::{DbError, DbPool, Plan, TenantSummary};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    TenantAdmin,
    Standard,
    SuperAdmin,
}

/// Stored account row. Holds secrets, so it is never serialized directly.
#[derive(Clone, Debug, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
    pub active: bool,
    pub last_login_at: Option<NaiveDateTime>,
    pub password_changed_at: Option<NaiveDateTime>,
    pub reset_secret_hash: Option<String>,
    pub reset_secret_expires_at: Option<i64>, // unix seconds
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
}

/// An account together with the summary of the tenant it belongs to
#[derive(Clone, Debug)]
pub struct AccountWithTenant {
    pub account: Account,
    pub tenant: Option<TenantSummary>,
}

#[derive(FromRow)]
struct AccountTenantRow {
    #[sqlx(flatten)]
    account: Account,
    tenant_name: Option<String>,
    tenant_slug: Option<String>,
    tenant_plan: Option<Plan>,
    tenant_active: Option<bool>,
}

impl From<AccountTenantRow> for AccountWithTenant {
    fn from(row: AccountTenantRow) -> Self {
        let tenant = match (row.account.tenant_id, row.tenant_name, row.tenant_slug, row.tenant_plan, row.tenant_active) {
            (Some(id), Some(name), Some(slug), Some(plan), Some(active)) => Some(TenantSummary { id, name, slug, plan, active }),
            _ => None,
        };
        Self { account: row.account, tenant }
    }
}

const ACCOUNT_COLUMNS: &str = r"
    id, email, password_hash, first_name, last_name, role, tenant_id, active,
    last_login_at, password_changed_at, reset_secret_hash, reset_secret_expires_at,
    created_at, updated_at";

const ACCOUNT_WITH_TENANT_SELECT: &str = r"
    SELECT
        a.id, a.email, a.password_hash, a.first_name, a.last_name, a.role, a.tenant_id, a.active,
        a.last_login_at, a.password_changed_at, a.reset_secret_hash, a.reset_secret_expires_at,
        a.created_at, a.updated_at,
        t.name AS tenant_name,
        t.slug AS tenant_slug,
        t.plan AS tenant_plan,
        t.active AS tenant_active
    FROM accounts a
    LEFT JOIN tenants t ON t.id = a.tenant_id";

pub async fn create_account<'e, E>(db: E, new_account: &NewAccount) -> Result<Account, DbError>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        r"
        INSERT INTO accounts (email, password_hash, first_name, last_name, role, tenant_id, active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING {ACCOUNT_COLUMNS}
        "
    );
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(&new_account.email)
        .bind(&new_account.password_hash)
        .bind(&new_account.first_name)
        .bind(&new_account.last_name)
        .bind(new_account.role)
        .bind(new_account.tenant_id)
        .fetch_one(db)
        .await?;
    Ok(account)
}

pub async fn get_account_by_email(db: &DbPool, email: &str) -> Result<Option<AccountWithTenant>, DbError> {
    let sql = format!("{ACCOUNT_WITH_TENANT_SELECT} WHERE a.email = ?");
    let row = sqlx::query_as::<_, AccountTenantRow>(&sql)
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn get_account_by_id(db: &DbPool, id: i64) -> Result<Option<AccountWithTenant>, DbError> {
    let sql = format!("{ACCOUNT_WITH_TENANT_SELECT} WHERE a.id = ?");
    let row = sqlx::query_as::<_, AccountTenantRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn account_email_exists(db: &DbPool, email: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?)")
        .bind(email)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

/// Finds the account holding `secret_hash`. With `live_at` set, only a secret that has not
/// expired at that unix time matches.
pub async fn get_account_by_reset_secret(
    db: &DbPool,
    secret_hash: &str,
    live_at: Option<i64>,
) -> Result<Option<Account>, DbError> {
    let sql = format!(
        r"
        SELECT {ACCOUNT_COLUMNS}
        FROM accounts
        WHERE reset_secret_hash = ?
          AND (? IS NULL OR reset_secret_expires_at > ?)
        "
    );
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(secret_hash)
        .bind(live_at)
        .bind(live_at)
        .fetch_optional(db)
        .await?;
    Ok(account)
}

pub async fn update_last_login(db: &DbPool, id: i64, at: NaiveDateTime) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE accounts SET last_login_at = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(at)
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stores a reset secret digest, replacing whatever secret the account held before
pub async fn set_reset_secret(db: &DbPool, id: i64, secret_hash: &str, expires_at: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        r"
        UPDATE accounts
        SET reset_secret_hash = ?, reset_secret_expires_at = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        ",
    )
    .bind(secret_hash)
    .bind(expires_at)
    .bind(id)
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Replaces the password and clears the reset secret in one conditional write.
///
/// The update only applies while the account still holds `secret_hash` and the secret is
/// live at `now`; otherwise another request consumed or replaced it first and
/// [`DbError::Conflict`] is returned.
pub async fn consume_reset_secret(
    db: &DbPool,
    id: i64,
    secret_hash: &str,
    new_password_hash: &str,
    now: NaiveDateTime,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r"
        UPDATE accounts
        SET password_hash = ?,
            reset_secret_hash = NULL,
            reset_secret_expires_at = NULL,
            password_changed_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND reset_secret_hash = ? AND reset_secret_expires_at > ?
        ",
    )
    .bind(new_password_hash)
    .bind(now)
    .bind(id)
    .bind(secret_hash)
    .bind(now.and_utc().timestamp())
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::Conflict);
    }
    Ok(())
}
