//! HTTP route definitions.

mod health;
mod sync;

use crate::AppState;
use axum::Router;
use syncline_engine::{Handler, Store};

/// Create all application routes.
pub fn create_routes<S, H>() -> Router<AppState<S, H>>
where
    S: Store + 'static,
    H: Handler<S::Tx> + 'static,
{
    Router::new()
        .merge(health::routes::<AppState<S, H>>())
        .merge(sync::routes::<S, H>())
}
