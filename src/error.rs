use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

/// Error taxonomy shared by every handler. Each variant maps to one status
/// code and is rendered through the common `{success:false, message}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input field.
    #[error("{0}")]
    Validation(String),
    /// No credential, or an invalid/expired one.
    #[error("{0}")]
    Authentication(String),
    /// Valid credential, insufficient permission.
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    /// Unique-field collision.
    #[error("{0}")]
    Conflict(String),
    /// Dangling or mistyped foreign reference, named by field.
    #[error("Invalid reference in `{field}`: {message}")]
    Integrity { field: String, message: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Integrity { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Unexpected(err) => {
                error!(error = %err, "unexpected error");
                // Detail is only surfaced in development mode.
                let dev = std::env::var("APP_ENV")
                    .map(|v| v == "development")
                    .unwrap_or(false);
                if dev {
                    err.to_string()
                } else {
                    "Internal Server Error".to_string()
                }
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                Self::Conflict(format!("A record with this {field} already exists."))
            }
            StoreError::Backend(msg) => Self::Unexpected(anyhow::anyhow!(msg)),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Authentication("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Authorization("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Integrity {
                field: "productId".into(),
                message: "missing".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn duplicate_store_error_becomes_conflict() {
        let err: ApiError = StoreError::Duplicate { field: "shopName" }.into();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(err.to_string().contains("shopName"));
    }

    #[test]
    fn integrity_error_names_the_field() {
        let err = ApiError::Integrity {
            field: "productId".into(),
            message: "Product not found.".into(),
        };
        assert!(err.to_string().contains("productId"));
    }
}
