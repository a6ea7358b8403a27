//! Error types for the record store

use std::fmt;
use thiserror::Error;

use crate::error::ErrorCode;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Record missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn conflict<E: fmt::Display>(msg: E) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => ErrorCode::STORAGE_NOT_FOUND,
            Self::Conflict(_) => ErrorCode::STORAGE_ALREADY_EXISTS,
        }
    }
}
