use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::core;
use crate::routes::Envelope;

pub async fn health_check(State(context): State<core::ArcContext>) -> impl IntoResponse {
    match context.db().ensure_healthy().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed, database unavailable");
            Envelope::error("SERVICE_UNAVAILABLE", "The service is temporarily unavailable, please try again")
                .with_status(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
