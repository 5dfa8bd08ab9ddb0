//! Unified error handling for the server.
//!
//! Every failure carries an `action` telling the client whether to retry
//! later, resync its local state, or give up.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use syncline_engine::{Error as SyncError, Recovery, VersionKind};

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Well-formed JSON that does not match the protocol's request body.
    #[error("Unsupported {kind} request: {detail}")]
    UnsupportedShape { kind: VersionKind, detail: String },

    #[error("Unauthorized")]
    Unauthorized,
}

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_type: Option<&'static str>,
}

impl AppError {
    /// HTTP status and stable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Sync(err) => match err {
                SyncError::ProtocolVersion { .. } => {
                    (StatusCode::BAD_REQUEST, "VersionNotSupported")
                }
                SyncError::UnknownClientGroup(_) => (StatusCode::NOT_FOUND, "ClientStateNotFound"),
                SyncError::ClientGroupMismatch { .. } => {
                    (StatusCode::BAD_REQUEST, "ClientGroupMismatch")
                }
                SyncError::AuthMismatch { .. } => (StatusCode::FORBIDDEN, "AuthMismatch"),
                SyncError::MutationOrderGap { .. } => (StatusCode::CONFLICT, "MutationOrderGap"),
                SyncError::Handler(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HandlerError"),
                SyncError::TransactionConflict => {
                    (StatusCode::SERVICE_UNAVAILABLE, "TransactionConflict")
                }
                SyncError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Timeout"),
                SyncError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "StorageUnavailable"),
            },
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            AppError::UnsupportedShape { .. } => (StatusCode::BAD_REQUEST, "VersionNotSupported"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        }
    }

    /// What the client should do next.
    pub fn recovery(&self) -> Recovery {
        match self {
            AppError::Sync(err) => err.recovery(),
            AppError::BadRequest(_) | AppError::UnsupportedShape { .. } | AppError::Unauthorized => {
                Recovery::Fatal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let recovery = self.recovery();

        let message = match &self {
            AppError::Sync(SyncError::Storage(detail)) => {
                tracing::error!("Storage error: {}", detail);
                "storage unavailable".to_string()
            }
            AppError::Sync(SyncError::Handler(detail)) => {
                tracing::warn!("Handler error: {}", detail);
                self.to_string()
            }
            other => {
                tracing::debug!(code, "request failed: {}", other);
                other.to_string()
            }
        };

        let version_type = match &self {
            AppError::Sync(SyncError::ProtocolVersion { kind, .. })
            | AppError::UnsupportedShape { kind, .. } => Some(match kind {
                VersionKind::Push => "push",
                VersionKind::Pull => "pull",
            }),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: code,
            message,
            action: recovery.as_str(),
            version_type,
        });

        let mut response = (status, body).into_response();
        if recovery == Recovery::Retry {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> (StatusCode, Option<HeaderValue>) {
        let response = err.into_response();
        (response.status(), response.headers().get(RETRY_AFTER).cloned())
    }

    #[test]
    fn retryable_errors_are_503_with_retry_after() {
        for err in [
            SyncError::TransactionConflict,
            SyncError::Timeout,
            SyncError::Storage("connection reset".into()),
        ] {
            let (status, retry_after) = status_of(err.into());
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(retry_after, Some(HeaderValue::from_static("1")));
        }
    }

    #[test]
    fn order_gap_is_distinguishable_from_fatal_errors() {
        let gap = AppError::from(SyncError::MutationOrderGap {
            client_id: "c1".into(),
            expected: 2,
            actual: 4,
        });
        assert_eq!(gap.recovery(), Recovery::Resync);
        assert_eq!(status_of(gap).0, StatusCode::CONFLICT);

        let unknown = AppError::from(SyncError::UnknownClientGroup("g".into()));
        assert_eq!(unknown.recovery(), Recovery::Fatal);
        assert_eq!(status_of(unknown).0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn identity_and_version_errors_map_to_client_errors() {
        let cases = [
            (
                AppError::from(SyncError::ProtocolVersion {
                    kind: VersionKind::Push,
                    version: 0,
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(SyncError::AuthMismatch {
                    client_group_id: "g".into(),
                    profile_id: "p".into(),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::from(SyncError::ClientGroupMismatch {
                    client_id: "c".into(),
                    expected: "g1".into(),
                    actual: "g2".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::UnsupportedShape {
                    kind: VersionKind::Pull,
                    detail: "missing field `cookie`".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(SyncError::handler("nope")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, retry_after) = status_of(err);
            assert_eq!(status, expected);
            assert!(retry_after.is_none());
        }
    }
}
