use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::core;
use crate::routes;
use crate::services::AuthError;

/// Back end server built from the public auth routes and the session-protected ones
pub fn create_router(context: core::ArcContext) -> Router {
    let session_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .layer(middleware::from_fn_with_state(context.clone(), session_middleware))
        .with_state(context.clone());

    let auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/password/forgot", post(routes::auth::forgot_password))
        .route("/auth/password/reset", post(routes::auth::reset_password))
        .with_state(context.clone());

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .with_state(context);

    Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
}

/// Decodes the bearer token and hands its claims to the handler
async fn session_middleware(
    State(context): State<core::ArcContext>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match auth::decode_session_token_from_req(&context.jwt, &req) {
        Ok(claims) => {
            tracing::debug!(
                account_id = %claims.sub,
                role = ?claims.role,
                tenant_id = ?claims.tenant_id,
                "Authenticated session"
            );
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => AuthError::from(e).into_response(),
    }
}
