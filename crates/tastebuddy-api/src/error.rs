use std::sync::OnceLock;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Error half of the response envelope:
/// `{"success": false, "error": {"code", "message", "detail"?}}`.
///
/// Storage failures carry the underlying error string as `detail`, exposed
/// only outside production.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code("invalid_request", message)
    }

    /// 400 with a caller-chosen code, for checks that clients branch on
    /// (`username_taken`, `achievement_exists`).
    pub fn with_code(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized",
            message: "Authentication required".into(),
            detail: None,
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "forbidden",
            message: "You do not have access to this resource".into(),
            detail: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        error!("internal error: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: "Something went wrong".into(),
            detail: Some(format!("{err:#}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(detail) = self.detail {
            if expose_detail() {
                error["detail"] = json!(detail);
            }
        }

        (
            self.status,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response()
    }
}

/// Success half of the envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

pub async fn not_found_route() -> ApiError {
    ApiError::not_found("No such endpoint")
}

pub async fn method_not_allowed_route() -> ApiError {
    ApiError::bad_request("Method not allowed on this endpoint")
}

/// Internal error detail goes into the envelope only when TASTEBUDDY_ENV
/// is not "production". Checked once; the flag never changes at runtime.
fn expose_detail() -> bool {
    static EXPOSE: OnceLock<bool> = OnceLock::new();
    *EXPOSE.get_or_init(|| {
        std::env::var("TASTEBUDDY_ENV")
            .map(|env| env != "production")
            .unwrap_or(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let body = serde_json::to_value(&Success {
            success: true,
            data: json!({ "id": "u1" }),
        })
        .unwrap();
        assert_eq!(body, json!({ "success": true, "data": { "id": "u1" } }));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
