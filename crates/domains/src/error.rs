//! # AppError
//!
//! Centralized error handling for the advert board.
//! Maps domain-specific failures to actionable error types; inbound adapters
//! turn them into HTTP statuses.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A form field an error (or an editable input) is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Title,
    Author,
    Content,
    Published,
    Image,
    Categories,
}

impl Field {
    /// The name used for this field in submitted forms.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Title => "title",
            Field::Author => "author",
            Field::Content => "content",
            Field::Published => "published",
            Field::Image => "image",
            Field::Categories => "categories",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation failure scoped to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Advert, Application, page past the end)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Page numbers start at 1.
    #[error("page {0} does not exist")]
    InvalidPage(i64),

    /// One or more fields failed validation; the form is re-presented.
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Malformed request that is not attributable to a form field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No (or invalid) credentials supplied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but lacking the required capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A storage constraint rejected the change.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl fmt::Display) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    /// Field errors carried by a validation failure, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// `InvalidPage` is reported to users exactly like a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(..) | AppError::InvalidPage(_))
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A specialized Result type for advert board logic.
pub type Result<T> = std::result::Result<T, AppError>;
