use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The `{success, message, data?, errorCode?}` body every auth endpoint answers with
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error_code: None,
        }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            error_code: None,
        }
    }

    pub fn error(error_code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error_code: Some(error_code),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_envelope_omits_error_code() {
        let body = serde_json::to_value(Envelope::ok("Logged in", json!({"token": "t"}))).unwrap();
        assert_eq!(body, json!({"success": true, "message": "Logged in", "data": {"token": "t"}}));
    }

    #[test]
    fn test_error_envelope_uses_camel_case_code() {
        let body = serde_json::to_value(Envelope::error("TOKEN_EXPIRED", "expired")).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "message": "expired", "errorCode": "TOKEN_EXPIRED"})
        );
    }

    #[test]
    fn test_message_envelope_has_no_data() {
        let body = serde_json::to_value(Envelope::message("done")).unwrap();
        assert_eq!(body, json!({"success": true, "message": "done"}));
    }
}
