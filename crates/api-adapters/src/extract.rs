use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{AppError, Identity};
use tracing::debug;

use crate::error::ApiError;
use crate::router::AppState;

/// The caller, if the request carries valid Basic credentials.
///
/// No `Authorization` header means an anonymous caller; a header that does
/// not check out is refused with 401 so the browser asks again.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

impl CurrentUser {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    pub fn name(&self) -> Option<String> {
        self.0.as_ref().map(|who| who.name().to_string())
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };
        let header = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("unreadable Authorization header".into()))?;
        match state.authenticator.authenticate_header(header) {
            Ok(identity) => Ok(Self(Some(identity))),
            Err(e) => {
                debug!(error = %e, "credentials refused");
                Err(AppError::Unauthorized(e.to_string()).into())
            }
        }
    }
}
