use askama::Template;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use domains::AppError;
use tracing::{error, warn};

use crate::views::ErrorTemplate;

pub const BASIC_CHALLENGE: &str = "Basic realm=\"advert-board\", charset=\"UTF-8\"";

/// An [`AppError`] on its way to becoming an HTML error page.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub signed_in: Option<String>,
}

impl ApiError {
    pub fn new(error: AppError) -> Self {
        Self {
            error,
            signed_in: None,
        }
    }

    pub fn for_user(error: AppError, signed_in: Option<String>) -> Self {
        Self { error, signed_in }
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            AppError::NotFound(..) | AppError::InvalidPage(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match &self.error {
            AppError::NotFound(kind, _) if kind == "Page" => "This page does not exist.".into(),
            AppError::InvalidPage(page) => format!("Page \"{page}\" does not exist."),
            AppError::NotFound(kind, id) => format!("{kind} with id {id} does not exist."),
            AppError::Validation(errors) => errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            AppError::InvalidRequest(message) => message.clone(),
            AppError::Unauthorized(_) => "Please sign in to continue.".into(),
            AppError::Forbidden(_) => "You are not allowed to do this.".into(),
            AppError::Conflict(message) => message.clone(),
            AppError::Internal(_) => "Something went wrong on our side.".into(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self::new(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.error {
            AppError::Internal(detail) => error!(error = %detail, "request failed"),
            AppError::Conflict(detail) => warn!(error = %detail, "request conflicted"),
            _ => {}
        }

        let page = ErrorTemplate {
            status: status.as_u16(),
            heading: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.public_message(),
            signed_in: self.signed_in.clone(),
        };
        let mut response = match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "error page failed to render");
                (status, status.to_string()).into_response()
            }
        };
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (AppError::InvalidPage(0), StatusCode::NOT_FOUND),
            (AppError::not_found("Advert", 3), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Internal("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::new(error).status(), status);
        }
    }

    #[test]
    fn unauthorized_carries_basic_challenge() {
        let response = ApiError::new(AppError::Unauthorized("no credentials".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_CHALLENGE
        );
    }

    #[test]
    fn internal_details_stay_private() {
        let api = ApiError::new(AppError::Internal("password=hunter2".into()));
        assert!(!api.public_message().contains("hunter2"));
    }
}
