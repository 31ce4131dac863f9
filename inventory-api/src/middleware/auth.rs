//! Axum middleware for authentication.
//!
//! Takes the token from `Authorization: Bearer` or the `id_token` cookie,
//! verifies it and injects an [`AuthContext`] into request extensions.
//! Requests without a valid token get 401.

use crate::auth::{extract_token, AuthContext, JwtVerifier};
use crate::constants::ID_TOKEN_COOKIE;
use crate::error::ApiError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Shared state for the authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub verifier: Arc<JwtVerifier>,
}

impl AuthMiddlewareState {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }
}

/// Reject unauthenticated requests and attach the caller's identity.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let cookies = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok());

    let token = extract_token(authorization, cookies, ID_TOKEN_COOKIE)
        .ok_or_else(|| AuthMiddlewareError(ApiError::unauthorized("No token provided")))?
        .to_string();

    let claims = state.verifier.verify(&token).await.map_err(|e| {
        tracing::debug!(error = %e.message, "Token rejected");
        AuthMiddlewareError(e)
    })?;

    request.extensions_mut().insert(AuthContext::from(claims));
    Ok(next.run(request).await)
}

/// Error wrapper so middleware failures render as JSON API errors.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Typed extractor for the authenticated caller.
///
/// `auth_middleware` must run on the route, otherwise extraction fails with 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
