use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::{TestResponse, TestServer};
use serde_json::{Value, json};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;
use crate::services::{EmailNotifier, NotifierError, ResetEmail};

pub const JWT_SECRET: &str = "test__secret__key__for__session__tokens";
pub const ADMIN_EMAIL: &str = "a@acme.com";
pub const ADMIN_PASSWORD: &str = "secret1";

/// Keeps every reset email instead of delivering it
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ResetEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<ResetEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Raw secret carried by the most recent reset link
    pub fn last_token(&self) -> Option<String> {
        let last = self.sent.lock().unwrap().last().cloned()?;
        let url = url::Url::parse(&last.link).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_reset_email(&self, email: &ResetEmail) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Mail relay that always refuses the message
pub struct FailingNotifier;

#[async_trait]
impl EmailNotifier for FailingNotifier {
    async fn send_reset_email(&self, _email: &ResetEmail) -> Result<(), NotifierError> {
        Err(NotifierError::Rejected("503 Service Unavailable: relay down".to_string()))
    }
}

/// Mail relay that answers long after the reset response has gone out
pub struct SlowNotifier(pub Duration);

#[async_trait]
impl EmailNotifier for SlowNotifier {
    async fn send_reset_email(&self, _email: &ResetEmail) -> Result<(), NotifierError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

pub fn test_settings() -> cfg::AppSettings {
    let mut settings = cfg::AppSettings::default();
    // an in-memory database lives as long as its connections, so keep exactly one
    settings.database = cfg::DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        run_migrations_on_startup: true,
        resilience: cfg::ResilienceSettings {
            reinit_delay_ms: 10,
            ..Default::default()
        },
    };
    settings.mail.response_wait_ms = 1_000;
    settings
}

pub struct TestApp {
    pub server: TestServer,
    pub context: core::ArcContext,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_settings(), None).await
    }

    /// Builds the real router over a migrated in-memory database. `notifier` replaces the
    /// recording notifier when given.
    pub async fn spawn_with(settings: cfg::AppSettings, notifier: Option<Arc<dyn EmailNotifier>>) -> Self {
        let database = db::Database::open(&settings.database).await.unwrap();
        app::run_migrations(&database.pool().await).await.unwrap();

        let jwt = auth::JwtContext::new(&settings.jwt, JWT_SECRET).unwrap();
        let recording = Arc::new(RecordingNotifier::default());
        let notifier = notifier.unwrap_or_else(|| recording.clone() as Arc<dyn EmailNotifier>);

        let context = core::Context::new(Arc::new(database), jwt, settings, notifier);
        let server = TestServer::new(app::create_router(context.clone())).unwrap();

        Self {
            server,
            context,
            notifier: recording,
        }
    }

    pub async fn register(&self, email: &str, password: &str, tenant_name: &str) -> TestResponse {
        self.server
            .post("/auth/register")
            .json(&json!({
                "email": email,
                "password": password,
                "firstName": "Ada",
                "lastName": "Admin",
                "tenantName": tenant_name,
            }))
            .await
    }

    /// Registers the default "Acme" tenant and returns the response body
    pub async fn register_acme(&self) -> Value {
        let response = self.register(ADMIN_EMAIL, ADMIN_PASSWORD, "Acme").await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> TestResponse {
        self.server
            .post("/auth/password/forgot")
            .json(&json!({ "email": email }))
            .await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> TestResponse {
        self.server
            .post("/auth/password/reset")
            .json(&json!({ "token": token, "password": password }))
            .await
    }

    pub async fn pool(&self) -> db::DbPool {
        self.context.db().pool().await
    }

    pub async fn account(&self, email: &str) -> db::Account {
        self.context
            .store
            .find_account_by_email(email)
            .await
            .unwrap()
            .unwrap()
            .account
    }
}
