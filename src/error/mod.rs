use chrono::NaiveDate;
use thiserror::Error;

pub mod codes;
pub mod validation;

pub use codes::{describe_error_code, ErrorCode};
pub use validation::ValidationErrors;

use crate::store::StoreError;
use crate::unit::Pound;

pub type PricingResult<T> = Result<T, PricingError>;

/// Errors raised by selection, pricing and lifecycle operations
#[derive(Error, Debug)]
pub enum PricingError {
    /// A lookup came back empty. Often an expected business outcome, e.g. no
    /// eligible carrier yet.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid transition: cannot {action} from status {from}")]
    InvalidTransition { from: String, action: String },

    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The tariff tables have nothing for this combination. Never priced as zero.
    #[error("no applicable rate for {code} at {weight} on {date}{}", .miles.map(|m| format!(" over {m} mi")).unwrap_or_default())]
    NoApplicableRate {
        code: String,
        weight: Pound,
        date: NaiveDate,
        miles: Option<u32>,
    },

    #[error("distance unavailable: {0}")]
    DistanceUnavailable(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Request-level classification that callers map onto their responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unprocessable,
    Conflict,
    Internal,
}

impl PricingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(from: impl ToString, action: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            action: action.into(),
        }
    }

    pub fn write_conflict(message: impl Into<String>) -> Self {
        Self::WriteConflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// A single-field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => ErrorCode::NOT_FOUND,
            Self::InvalidTransition { .. } => ErrorCode::INVALID_TRANSITION,
            Self::WriteConflict(_) => ErrorCode::WRITE_CONFLICT,
            Self::Forbidden(_) => ErrorCode::FORBIDDEN,
            Self::Validation(_) => ErrorCode::VALIDATION_FAILED,
            Self::NoApplicableRate { .. } => ErrorCode::NO_APPLICABLE_RATE,
            Self::DistanceUnavailable(_) => ErrorCode::DISTANCE_UNAVAILABLE,
            Self::Arithmetic(_) => ErrorCode::ARITHMETIC,
            Self::Store(err) => err.code(),
            Self::Config(_) => ErrorCode::CONFIG_INVALID,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Validation(_) | Self::NoApplicableRate { .. } => ErrorKind::Unprocessable,
            Self::WriteConflict(_) | Self::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            Self::DistanceUnavailable(_) | Self::Arithmetic(_) | Self::Config(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Aggregated field errors, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
