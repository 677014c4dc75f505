//! Unified error handling for ParkApp
//!
//! Every failure a session operation can produce is returned as an
//! `AppError` value. Callers branch on it and show the user an informative
//! message together with the recovery action given by [`AppError::recovery`].

use std::fmt;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    // ==================== Session Errors ====================
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Session already finalized: {0}")]
    AlreadyFinalized(String),

    // ==================== Resource Errors ====================
    #[error("Conflict: {0}")]
    Conflict(String),

    // ==================== Storage Errors ====================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// What the presentation layer should offer the user after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-prompt for corrected input and try again
    Retry,
    /// Offer a balance top-up
    TopUp,
    /// Abandon the action, nothing left to do on this session
    Cancel,
    /// Not recoverable by the user; surface the message and log it
    Report,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryAction::Retry => write!(f, "retry"),
            RecoveryAction::TopUp => write!(f, "top_up"),
            RecoveryAction::Cancel => write!(f, "cancel"),
            RecoveryAction::Report => write!(f, "report"),
        }
    }
}

impl AppError {
    /// Returns the recovery action offered to the user for this error
    pub fn recovery(&self) -> RecoveryAction {
        match self {
            AppError::InvalidParameter(_) => RecoveryAction::Retry,

            AppError::InsufficientBalance { .. } => RecoveryAction::TopUp,

            AppError::AlreadyFinalized(_) | AppError::Conflict(_) => RecoveryAction::Cancel,

            // Transient storage failures are worth another attempt
            AppError::StorageConnection(_) => RecoveryAction::Retry,

            _ => RecoveryAction::Report,
        }
    }

    /// Returns a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidParameter(_) => "invalid_parameter",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::AlreadyFinalized(_) => "already_finalized",
            AppError::Conflict(_) => "conflict",
            AppError::Storage(_) => "storage_error",
            AppError::StorageConnection(_) => "storage_connection_error",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether this error is a usage error on a terminal session
    pub fn is_already_finalized(&self) -> bool {
        matches!(self, AppError::AlreadyFinalized(_))
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidParameter(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recovery_actions() {
        assert_eq!(
            AppError::InvalidParameter("hours".to_string()).recovery(),
            RecoveryAction::Retry
        );
        assert_eq!(
            AppError::InsufficientBalance {
                required: "150".to_string(),
                available: "100".to_string()
            }
            .recovery(),
            RecoveryAction::TopUp
        );
        assert_eq!(
            AppError::AlreadyFinalized("abc".to_string()).recovery(),
            RecoveryAction::Cancel
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).recovery(),
            RecoveryAction::Report
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::AlreadyFinalized("abc".to_string()).error_code(),
            "already_finalized"
        );
        assert_eq!(
            AppError::InsufficientBalance {
                required: "1".to_string(),
                available: "0".to_string()
            }
            .error_code(),
            "insufficient_balance"
        );
    }

    #[test]
    fn test_validation_errors_are_invalid_parameters() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("vehicle_plate", validator::ValidationError::new("length"));

        let err = AppError::from(errors);
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert_eq!(err.recovery(), RecoveryAction::Retry);
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = AppError::InsufficientBalance {
            required: "150".to_string(),
            available: "100".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: required 150, available 100"
        );
    }
}
