//! Success envelope returned by every handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_envelope() {
        let body = ApiResponse::ok(serde_json::json!({"a": 1}), "done");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["data"]["a"], 1);
        assert_eq!(value["message"], "done");
        assert_eq!(value["success"], true);
    }

    #[test]
    fn created_status_is_still_success() {
        let body = ApiResponse::new(StatusCode::CREATED, (), "made");
        assert!(body.success);
        assert_eq!(body.status_code, 201);
    }
}
