use std::sync::Arc;

use crate::auth;
use crate::cfg;
use crate::db::Database;
use crate::services::{EmailNotifier, SqlTenantDefaults, TenantDefaultsInitializer};
use crate::store::CredentialStore;

pub type ArcContext = Arc<Context>;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct Context {
    pub store: CredentialStore,
    pub jwt: auth::JwtContext,
    pub settings: cfg::AppSettings,
    pub notifier: Arc<dyn EmailNotifier>,
    pub tenant_defaults: Arc<dyn TenantDefaultsInitializer>,
}

impl Context {
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        jwt: auth::JwtContext,
        settings: cfg::AppSettings,
        notifier: Arc<dyn EmailNotifier>,
    ) -> ArcContext {
        let store = CredentialStore::new(db);
        let tenant_defaults = Arc::new(SqlTenantDefaults::new(store.clone(), settings.provisioning.clone()));
        Self {
            store,
            jwt,
            settings,
            notifier,
            tenant_defaults,
        }
        .into()
    }

    #[must_use]
    pub const fn db(&self) -> &Arc<Database> {
        self.store.database()
    }
}
