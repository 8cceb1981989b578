use std::time::Duration;

use axum::http::StatusCode;
use axum::http::header;
use serde_json::{Value, json};

use crate::auth;
use crate::db::Role;
use crate::tests::common::{ADMIN_EMAIL, ADMIN_PASSWORD, TestApp};

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::spawn().await;
    let registered = app.register_acme().await;

    let response = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["expiresIn"], 86_400);
    assert_eq!(body["data"]["account"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["account"]["tenant"]["name"], "Acme");
    assert!(body["data"]["account"].get("passwordHash").is_none());

    let token = body["data"]["token"].as_str().unwrap();
    let claims = auth::decode_session_token(&app.context.jwt, token).unwrap();
    assert_eq!(claims.sub, registered["data"]["account"]["id"].to_string());
    assert_eq!(claims.role, Role::TenantAdmin);
    assert_eq!(claims.tenant_id, registered["data"]["tenant"]["id"].as_i64());
    assert_eq!(claims.email, ADMIN_EMAIL);
}

#[tokio::test]
async fn test_login_normalizes_email_case() {
    let app = TestApp::spawn().await;
    app.register_acme().await;

    let response = app.login("  A@Acme.COM ", ADMIN_PASSWORD).await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_login_advances_last_login() {
    let app = TestApp::spawn().await;
    app.register_acme().await;
    assert!(app.account(ADMIN_EMAIL).await.last_login_at.is_none());

    app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.assert_status(StatusCode::OK);

    // the timestamp is written in the background
    let mut last_login = None;
    for _ in 0..50 {
        last_login = app.account(ADMIN_EMAIL).await.last_login_at;
        if last_login.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(last_login.is_some());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::spawn().await;
    app.register_acme().await;

    let wrong_password = app.login(ADMIN_EMAIL, "wrong").await;
    let unknown_email = app.login("nobody@acme.com", "wrong").await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.as_bytes(), unknown_email.as_bytes());

    let body: Value = wrong_password.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_missing_fields_is_validation_error() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/auth/login").json(&json!({ "email": ADMIN_EMAIL })).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_disabled_account_is_rejected_regardless_of_password() {
    let app = TestApp::spawn().await;
    app.register_acme().await;
    sqlx::query("UPDATE accounts SET active = 0 WHERE email = ?")
        .bind(ADMIN_EMAIL)
        .execute(&app.pool().await)
        .await
        .unwrap();

    for password in [ADMIN_PASSWORD, "wrong"] {
        let response = app.login(ADMIN_EMAIL, password).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["errorCode"], "ACCOUNT_DISABLED");
    }
}

#[tokio::test]
async fn test_disabled_tenant_blocks_login() {
    let app = TestApp::spawn().await;
    app.register_acme().await;
    sqlx::query("UPDATE tenants SET active = 0")
        .execute(&app.pool().await)
        .await
        .unwrap();

    let response = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], "TENANT_DISABLED");
}

#[tokio::test]
async fn test_tenantless_super_admin_can_login() {
    let app = TestApp::spawn().await;
    let password_hash = auth::hash_password("rootpass").unwrap();
    sqlx::query(
        "INSERT INTO accounts (email, password_hash, first_name, last_name, role, tenant_id, active) \
         VALUES ('root@example.com', ?, 'Root', 'Admin', 'SUPER_ADMIN', NULL, 1)",
    )
    .bind(password_hash)
    .execute(&app.pool().await)
    .await
    .unwrap();

    let response = app.login("root@example.com", "rootpass").await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["account"]["role"], "SUPER_ADMIN");
    assert!(body["data"]["account"]["tenantId"].is_null());
    let claims = auth::decode_session_token(&app.context.jwt, body["data"]["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.tenant_id, None);
}

#[tokio::test]
async fn test_whoami_returns_current_account() {
    let app = TestApp::spawn().await;
    let registered = app.register_acme().await;
    let token = registered["data"]["token"].as_str().unwrap();

    let response = app
        .server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, format!("Bearer {token}"))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["tenant"]["slug"], "acme");
}

#[tokio::test]
async fn test_whoami_rechecks_account_state() {
    let app = TestApp::spawn().await;
    let registered = app.register_acme().await;
    let token = registered["data"]["token"].as_str().unwrap();
    sqlx::query("UPDATE tenants SET active = 0")
        .execute(&app.pool().await)
        .await
        .unwrap();

    let response = app
        .server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, format!("Bearer {token}"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], "TENANT_DISABLED");
}

#[tokio::test]
async fn test_whoami_without_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let missing = app.server.get("/auth/me").await;
    missing.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = missing.json();
    assert_eq!(body["errorCode"], "UNAUTHORIZED");

    let invalid = app
        .server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, "Bearer invalid_token")
        .await;
    invalid.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unparseable_body_gets_error_envelope() {
    let app = TestApp::spawn().await;

    let malformed = app
        .server
        .post("/auth/login")
        .bytes("not json".into())
        .content_type("application/json")
        .await;
    let wrong_type = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": 5, "password": ADMIN_PASSWORD }))
        .await;
    let no_content_type = app.server.post("/auth/password/forgot").text("a@acme.com").await;

    for response in [malformed, wrong_type, no_content_type] {
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], "VALIDATION_ERROR");
        assert!(body["message"].is_string());
    }
}
