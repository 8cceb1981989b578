use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;
use crate::tests::common::{ADMIN_EMAIL, ADMIN_PASSWORD, JWT_SECRET, RecordingNotifier, TestApp};

/// Router over a database file that can never be opened
fn unreachable_server() -> TestServer {
    let mut settings = cfg::AppSettings::default();
    settings.database = cfg::DatabaseSettings {
        url: "sqlite:/nonexistent-dir-for-tests/auth.sqlite".to_string(),
        max_connections: 1,
        run_migrations_on_startup: false,
        resilience: cfg::ResilienceSettings {
            max_attempts: 2,
            attempt_timeout_ms: 200,
            overall_deadline_ms: 1_000,
            initial_backoff_ms: 5,
            max_backoff_ms: 20,
            reinit_delay_ms: 10,
        },
    };

    let database = db::Database::open_lazy(&settings.database).unwrap();
    let jwt = auth::JwtContext::new(&settings.jwt, JWT_SECRET).unwrap();
    let context = core::Context::new(Arc::new(database), jwt, settings, Arc::new(RecordingNotifier::default()));
    TestServer::new(app::create_router(context)).unwrap()
}

#[tokio::test]
async fn test_login_reports_unavailable_not_bad_credentials() {
    let server = unreachable_server();

    let response = server
        .post("/auth/login")
        .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_register_and_recovery_report_unavailable() {
    let server = unreachable_server();

    let register = server
        .post("/auth/register")
        .json(&serde_json::json!({
            "email": ADMIN_EMAIL,
            "password": ADMIN_PASSWORD,
            "firstName": "Ada",
            "lastName": "Admin",
            "tenantName": "Acme",
        }))
        .await;
    register.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let forgot = server
        .post("/auth/password/forgot")
        .json(&serde_json::json!({ "email": ADMIN_EMAIL }))
        .await;
    forgot.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(forgot.json::<Value>()["errorCode"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_validation_runs_before_storage_is_touched() {
    let server = unreachable_server();

    let response = server.post("/auth/login").json(&serde_json::json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_health_reports_unavailable_database() {
    let server = unreachable_server();

    let response = server.get("/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["errorCode"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_health_ok_on_working_database() {
    let app = TestApp::spawn().await;

    let response = app.server.get("/health").await;

    response.assert_status(StatusCode::OK);
    response.assert_text("OK");
}

#[tokio::test]
async fn test_health_recovers_closed_pool() {
    let app = TestApp::spawn().await;
    app.pool().await.close().await;

    let response = app.server.get("/health").await;

    response.assert_status(StatusCode::OK);
    assert!(!app.pool().await.is_closed());
}
