//! Sync endpoint routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use syncline_engine::{Handler, PullResponse, Store, VersionKind};

use crate::auth::AuthToken;
use crate::error::{AppError, Result};
use crate::handlers::{handle_pull, handle_push, PullRequest, PushRequest};
use crate::AppState;

/// Create sync routes.
pub fn routes<S, H>() -> Router<AppState<S, H>>
where
    S: Store + 'static,
    H: Handler<S::Tx> + 'static,
{
    Router::new()
        .route("/push", post(push_handler::<S, H>))
        .route("/pull", post(pull_handler::<S, H>))
}

/// Unwrap a JSON body. Valid JSON of the wrong shape is a protocol mismatch,
/// anything else is a malformed request.
fn parse_body<T>(
    kind: VersionKind,
    body: std::result::Result<Json<T>, JsonRejection>,
) -> Result<T> {
    body.map(|Json(request)| request)
        .map_err(|rejection| match rejection {
            JsonRejection::JsonDataError(err) => AppError::UnsupportedShape {
                kind,
                detail: err.body_text(),
            },
            other => AppError::BadRequest(other.body_text()),
        })
}

/// POST /push - Apply a batch of mutations.
async fn push_handler<S, H>(
    State(state): State<AppState<S, H>>,
    auth: AuthToken,
    body: std::result::Result<Json<PushRequest>, JsonRejection>,
) -> Result<StatusCode>
where
    S: Store + 'static,
    H: Handler<S::Tx> + 'static,
{
    let request = parse_body(VersionKind::Push, body)?;
    handle_push(&state.syncer, auth.as_str(), request).await?;
    Ok(StatusCode::OK)
}

/// POST /pull - Fetch changes since a cookie.
async fn pull_handler<S, H>(
    State(state): State<AppState<S, H>>,
    auth: AuthToken,
    body: std::result::Result<Json<PullRequest>, JsonRejection>,
) -> Result<Json<PullResponse>>
where
    S: Store + 'static,
    H: Handler<S::Tx> + 'static,
{
    let request = parse_body(VersionKind::Pull, body)?;
    let response = handle_pull(&state.syncer, auth.as_str(), request).await?;
    Ok(Json(response))
}
