//! Authorization header extraction.
//!
//! The header value is opaque to the server. It is forwarded to the mutators
//! as `ClientInfo::auth`, which decide what it grants.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Raw `Authorization` header value, empty when absent and not required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthToken(pub String);

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S, H> FromRequestParts<AppState<S, H>> for AuthToken
where
    S: Send + Sync,
    H: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, H>,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(AUTHORIZATION) {
            Some(value) => {
                let token = value.to_str().map_err(|_| {
                    AppError::BadRequest("Authorization header is not valid ASCII".to_string())
                })?;
                if token.trim().is_empty() && state.config.require_auth {
                    return Err(AppError::Unauthorized);
                }
                Ok(AuthToken(token.to_string()))
            }
            None if state.config.require_auth => Err(AppError::Unauthorized),
            None => Ok(AuthToken::default()),
        }
    }
}
