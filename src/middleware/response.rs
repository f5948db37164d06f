use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Wrapper for API responses that adds the `{success, message, data}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Failed to serialize response data",
                        "data": null
                    })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "message": self.message,
            "data": data_value
        });

        (StatusCode::OK, Json(envelope)).into_response()
    }
}

/// `data` of every listing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T: Serialize> {
    pub total: i64,
    pub rows: Vec<T>,
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
