use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog_api_types::ErrorBody;

use crate::application::error::ErrorReport;
use crate::application::items::ItemServiceError;
use crate::application::pagination::PaginationError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INVALID_PAGINATION: &str = "invalid_pagination";
    pub const NOT_FOUND: &str = "not_found";
    pub const STATS_UNAVAILABLE: &str = "stats_unavailable";
    pub const STORAGE_TIMEOUT: &str = "storage_timeout";
    pub const STORAGE: &str = "storage_error";
    pub const INTERNAL: &str = "internal_error";
}

pub const ITEM_NOT_FOUND: &str = "Item not found";
pub const STATS_NOT_READY: &str = "Stats not available yet.";

/// Error returned by API handlers.
///
/// `message` is what the client sees; `detail` only reaches the log.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, None)
    }

    pub fn stats_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STATS_UNAVAILABLE,
            STATS_NOT_READY,
            None,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.detail.as_deref().unwrap_or(&self.message);
        let report = ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {detail}", self.code),
        );

        let mut response = (self.status, Json(ErrorBody::new(self.message))).into_response();
        report.attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Timeout { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::STORAGE_TIMEOUT,
                "Storage timed out",
                Some(err.to_string()),
            ),
            RepoError::Persistence(_) | RepoError::Malformed { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::STORAGE,
                "Internal server error",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<ItemServiceError> for ApiError {
    fn from(err: ItemServiceError) -> Self {
        match err {
            ItemServiceError::Domain(err @ DomainError::Validation { .. }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                err.to_string(),
                None,
            ),
            ItemServiceError::Domain(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "Internal server error",
                Some(err.to_string()),
            ),
            ItemServiceError::NotFound(id) => ApiError::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                ITEM_NOT_FOUND,
                Some(format!("item {id} not found")),
            ),
            ItemServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_PAGINATION,
            err.to_string(),
            None,
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`".to_string()
            }
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON body".to_string(),
            _ => "Invalid request body".to_string(),
        };
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            message,
            Some(rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            "Invalid query string",
            Some(rejection.body_text()),
        )
    }
}
