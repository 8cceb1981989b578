use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::sqlite::SqliteExecutor;

use crate::db::{DbError, DbPool};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub plan: Plan,
    pub active: bool,
    pub currency: String,
    pub slug: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewTenant {
    pub name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub plan: Plan,
    pub currency: String,
    pub slug: String,
}

/// The tenant fields loaded alongside an account
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    pub active: bool,
}

impl From<&Tenant> for TenantSummary {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            slug: tenant.slug.clone(),
            plan: tenant.plan,
            active: tenant.active,
        }
    }
}

pub async fn create_tenant<'e, E>(db: E, new_tenant: &NewTenant) -> Result<Tenant, DbError>
where
    E: SqliteExecutor<'e>,
{
    let tenant = sqlx::query_as::<_, Tenant>(
        r"
        INSERT INTO tenants (name, contact_email, phone, plan, active, currency, slug, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        RETURNING id, name, contact_email, phone, plan, active, currency, slug, created_at, updated_at
        ",
    )
    .bind(&new_tenant.name)
    .bind(&new_tenant.contact_email)
    .bind(&new_tenant.phone)
    .bind(new_tenant.plan)
    .bind(&new_tenant.currency)
    .bind(&new_tenant.slug)
    .fetch_one(db)
    .await?;
    Ok(tenant)
}

pub async fn tenant_slug_exists<'e, E>(db: E, slug: &str) -> Result<bool, DbError>
where
    E: SqliteExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = ?)")
        .bind(slug)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn upsert_tenant_setting(db: &DbPool, tenant_id: i64, key: &str, value: &str) -> Result<(), DbError> {
    sqlx::query(
        r"
        INSERT INTO tenant_settings (tenant_id, key, value)
        VALUES (?, ?, ?)
        ON CONFLICT (tenant_id, key) DO UPDATE SET value = excluded.value
        ",
    )
    .bind(tenant_id)
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_tenant_settings(db: &DbPool, tenant_id: i64) -> Result<Vec<(String, String)>, DbError> {
    let settings = sqlx::query_as::<_, (String, String)>(
        "SELECT key, value FROM tenant_settings WHERE tenant_id = ? ORDER BY key",
    )
    .bind(tenant_id)
    .fetch_all(db)
    .await?;
    Ok(settings)
}
