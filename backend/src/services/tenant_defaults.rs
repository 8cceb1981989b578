use async_trait::async_trait;

use crate::cfg;
use crate::db::DbError;
use crate::store::CredentialStore;

/// Seeds the resources a freshly provisioned tenant starts with
#[async_trait]
pub trait TenantDefaultsInitializer: Send + Sync {
    async fn initialize_defaults(&self, tenant_id: i64) -> Result<(), DbError>;
}

/// Writes the configured currency, timezone and locale into `tenant_settings`
pub struct SqlTenantDefaults {
    store: CredentialStore,
    settings: cfg::ProvisioningSettings,
}

impl SqlTenantDefaults {
    #[must_use]
    pub const fn new(store: CredentialStore, settings: cfg::ProvisioningSettings) -> Self {
        Self { store, settings }
    }
}

#[async_trait]
impl TenantDefaultsInitializer for SqlTenantDefaults {
    async fn initialize_defaults(&self, tenant_id: i64) -> Result<(), DbError> {
        let defaults = [
            ("currency", &self.settings.default_currency),
            ("timezone", &self.settings.default_timezone),
            ("locale", &self.settings.default_locale),
        ];
        for (key, value) in defaults {
            self.store.upsert_tenant_setting(tenant_id, key, value).await?;
        }
        tracing::info!(tenant_id, "Tenant defaults initialized");
        Ok(())
    }
}
