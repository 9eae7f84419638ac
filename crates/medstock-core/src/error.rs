//! Domain error types.
//!
//! Every failure leaves persisted state unchanged: multi-row writes run in a
//! transaction that is rolled back when an error propagates.

use thiserror::Error;

use crate::access::{Action, Resource};
use crate::db::DbError;
use crate::models::Role;

/// Errors from the ledger, catalog and clinical services.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("insufficient stock in lot {lot_id}: requested {requested}, available {available}")]
    InsufficientStock {
        lot_id: String,
        requested: i64,
        available: i64,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(DbError),
}

impl InventoryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        InventoryError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<DbError> for InventoryError {
    fn from(e: DbError) -> Self {
        if e.is_unavailable() {
            return InventoryError::StorageUnavailable(e.to_string());
        }
        match e {
            DbError::NotFound(what) => InventoryError::NotFound(what),
            other => InventoryError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for InventoryError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors from consumption estimation and depletion forecasting.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("forecast undefined for consumption rate {rate}")]
    UndefinedForecast { rate: f64 },

    #[error("no consumption recorded for medication {0} in the analysis window")]
    NoConsumption(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for AnalysisError {
    fn from(e: DbError) -> Self {
        if e.is_unavailable() {
            return AnalysisError::StorageUnavailable(e.to_string());
        }
        match e {
            DbError::NotFound(what) => AnalysisError::NotFound(what),
            other => AnalysisError::Storage(other),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors from login and permission checks.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("permission denied: {role:?} cannot {action:?} {resource:?}")]
    PermissionDenied {
        role: Role,
        resource: Resource,
        action: Action,
    },

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

pub type AccessResult<T> = Result<T, AccessError>;
