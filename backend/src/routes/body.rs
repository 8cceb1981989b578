use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::services::AuthError;

/// JSON request body whose rejections are answered with the error envelope.
///
/// Malformed JSON, wrongly typed fields and a missing `Content-Type` all become
/// `400 VALIDATION_ERROR` instead of the framework's plain-text 400/415/422.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            AuthError::validation("Request body must be a JSON object with the expected fields")
        })?;
        Ok(Self(value))
    }
}
