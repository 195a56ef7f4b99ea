//! Authentication extractor
//!
//! Resolves the bearer token on HTTP requests through the same
//! `Authenticator` the WebSocket connect path uses.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use relay_common::AppError;
use relay_core::{ConnectContext, UserId};

use super::response::HttpError;
use super::GatewayState;

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    GatewayState: FromRef<S>,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::MissingAuth)?;

        let state = GatewayState::from_ref(state);
        let context = ConnectContext::with_token(bearer.token());

        match state.authenticator().resolve(&context).await {
            Ok(Some(user_id)) => Ok(Self { user_id }),
            Ok(None) => Err(AppError::MissingAuth.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid access token");
                Err(e.into())
            }
        }
    }
}
