//! Application error type and its mapping onto JSON HTTP responses.
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// The errors that may occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The expense does not exist or belongs to another user.
    ///
    /// Both cases produce the same error so that callers cannot test for
    /// other users' expense ids.
    #[error("expense not found")]
    ExpenseNotFound,

    /// A category id referenced by a request does not exist.
    #[error("category not found")]
    CategoryNotFound,

    #[error("category already exists")]
    CategoryAlreadyExists,

    /// A month outside of 1..=12 was requested.
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(i64),

    /// The requested sort field is not one of the sortable expense columns.
    #[error("invalid sort field \"{0}\"")]
    InvalidSortField(String),

    /// The operation requires at least one matching expense and found none.
    #[error("no expenses found")]
    NoDataFound,

    #[error("user already exists")]
    UserAlreadyExists,

    /// Login failed. Unknown email and wrong password are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bearer token is missing, malformed, expired or of the wrong kind.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Input rejected before reaching the core.
    #[error("invalid request: {message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    /// The persistence layer failed. Details are logged, never sent to clients.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other unexpected failure. Details are logged, never sent to clients.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ExpenseNotFound | AppError::NoDataFound => StatusCode::NOT_FOUND,
            AppError::CategoryNotFound | AppError::InvalidMonth(_) => StatusCode::BAD_REQUEST,
            AppError::CategoryAlreadyExists | AppError::UserAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidSortField(_) | AppError::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorItem {
        let (message, field) = match self {
            AppError::ExpenseNotFound => ("Expense not found".to_owned(), None),
            AppError::CategoryNotFound => ("Category not found".to_owned(), None),
            AppError::CategoryAlreadyExists => ("Category already exists".to_owned(), None),
            AppError::InvalidMonth(_) => ("Month must be between 1 and 12".to_owned(), None),
            AppError::InvalidSortField(name) => {
                (format!("Invalid sort field \"{name}\""), Some("sort_by"))
            }
            AppError::NoDataFound => ("No expenses found".to_owned(), None),
            AppError::UserAlreadyExists => ("User already exists".to_owned(), None),
            AppError::InvalidCredentials => ("Invalid credentials".to_owned(), None),
            AppError::Unauthorized(reason) => ((*reason).to_owned(), None),
            AppError::Validation { field, message } => (message.clone(), *field),
            AppError::Database(_) => ("Database error".to_owned(), None),
            AppError::Internal(_) => ("Internal server error".to_owned(), None),
        };
        ErrorItem { message, field }
    }
}

#[derive(Debug, Serialize)]
struct ErrorItem {
    message: String,
    field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    errors: Vec<ErrorItem>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            errors: vec![self.body()],
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation {
            field: None,
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            field: None,
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation {
            field: None,
            message: rejection.body_text(),
        }
    }
}

/// Returns true when `err` is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn not_found_kinds_map_to_404() {
        let (status, body) = body_json(AppError::ExpenseNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["message"], "Expense not found");

        let (status, body) = body_json(AppError::NoDataFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["message"], "No expenses found");
    }

    #[tokio::test]
    async fn validation_error_names_the_field() {
        let (status, body) = body_json(AppError::invalid("limit", "must be at most 100")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "limit");
        assert_eq!(body["errors"][0]["message"], "must be at most 100");
    }

    #[tokio::test]
    async fn invalid_sort_field_points_at_sort_by() {
        let (status, body) = body_json(AppError::InvalidSortField("colour".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "sort_by");
    }

    #[tokio::test]
    async fn database_errors_are_opaque() {
        let (status, body) = body_json(AppError::Database(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errors"][0]["message"], "Database error");
        assert!(body["errors"][0]["field"].is_null());
    }

    #[test]
    fn conflict_and_auth_statuses() {
        assert_eq!(AppError::UserAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::CategoryAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidMonth(13).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CategoryNotFound.status_code(), StatusCode::BAD_REQUEST);
    }
}
