// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::filter::error::FilterError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    PermissionDenied(String),

    // 404 Not Found
    NotFound(String),

    // 406 Not Acceptable (schema validation, names the offending field)
    Validation { field: String, message: String },

    // 406 Not Acceptable (cross-entity consistency / dependent usage)
    Unprocessable(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error (report could not be produced or sent)
    ReportDownload(String),

    // 500 Internal Server Error
    Internal(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized(_) => 401,
            ApiError::PermissionDenied(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Validation { .. } => 406,
            ApiError::Unprocessable(_) => 406,
            ApiError::Conflict(_) => 409,
            ApiError::ReportDownload(_) => 500,
            ApiError::Internal(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(msg) => msg,
            ApiError::PermissionDenied(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Validation { message, .. } => message,
            ApiError::Unprocessable(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::ReportDownload(msg) => msg,
            ApiError::Internal(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::PermissionDenied(_) => "PERMISSION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unprocessable(_) => "UNPROCESSABLE",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::ReportDownload(_) => "REPORT_DOWNLOAD_FAILED",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to the `{success, message, data}` response body
    pub fn to_json(&self) -> Value {
        let mut data = json!({ "code": self.error_code() });
        if let ApiError::Validation { field, .. } = self {
            data["field"] = json!(field);
        }
        json!({
            "success": false,
            "message": self.message(),
            "data": data
        })
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ApiError::PermissionDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        ApiError::Unprocessable(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn report_download(message: impl Into<String>) -> Self {
        ApiError::ReportDownload(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UniqueViolation(constraint) => {
                tracing::warn!("Unique constraint rejected write: {}", constraint);
                ApiError::conflict(conflict_message(&constraint))
            }
            DatabaseError::ConnectionError(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal("Database error occurred")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::ConfigMissing(key) => {
                tracing::error!("Missing database configuration: {}", key);
                ApiError::service_unavailable("Database is not configured")
            }
            DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Invalid DATABASE_URL");
                ApiError::service_unavailable("Database is not configured")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidLimit(msg) => ApiError::validation("limit", msg),
            FilterError::InvalidOffset(msg) => ApiError::validation("offset", msg),
            FilterError::InvalidColumn(msg) => ApiError::validation("sort_by", msg),
            FilterError::InvalidValue { column, message } => ApiError::validation(column, message),
            other => {
                tracing::error!("Filter construction error: {}", other);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

/// Map the partial unique indexes onto the messages the pre-checks use
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "roles_natural_key" => "Role already exists",
        "slot_times_ground_slot" => "Slot already exists",
        "venue_expenses_period" => "Expense already exists for this month",
        _ => "Record already exists",
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
