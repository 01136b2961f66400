//! JSON envelope shared by the prep and search endpoints.
//!
//! ```json
//! { "data": { ... }, "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 } }
//! { "error": { "code": "NOT_FOUND", "message": "..." }, "meta": { ... } }
//! ```
//!
//! A body carries either `data` or `error`, never both.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorDetail>,

    pub meta: ApiMeta,

    #[serde(skip)]
    status: StatusCode,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    pub request_id: String,
    /// RFC 3339.
    pub timestamp: String,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Stable machine-readable code, e.g. `TASK_TIMEOUT`.
    pub code: &'static str,
    pub message: String,
}

impl ApiMeta {
    fn new(request_id: String, response_time_ms: u64) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: Some(data),
            error: None,
            meta: ApiMeta::new(request_id, response_time_ms),
            status: StatusCode::OK,
        }
    }
}

impl ApiResponse<()> {
    /// `status` is sent on the wire; `code` goes in the body.
    pub fn error(status: StatusCode, code: &'static str, message: String, request_id: String) -> Self {
        Self {
            data: None,
            error: Some(ApiErrorDetail { code, message }),
            meta: ApiMeta::new(request_id, 0),
            status,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::to_string(&self).unwrap_or_else(|_| {
            r#"{"error":{"code":"SERIALIZATION_ERROR","message":"failed to serialize response"}}"#
                .to_string()
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let resp = ApiResponse::success(vec![1, 2], "req-1".to_string(), 7);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["request_id"], "req-1");
        assert_eq!(json["meta"]["response_time_ms"], 7);
        assert!(json.get("error").is_none());
        assert!(json.get("_links").is_none());
        assert!(json.get("status").is_none());
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_error_envelope_carries_status() {
        let resp = ApiResponse::error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "no such table".to_string(),
            "req-2".to_string(),
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "no such table");

        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }
}
