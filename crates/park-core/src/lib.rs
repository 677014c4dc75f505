//! ParkApp Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the ParkApp parking system. It includes:
//!
//! - Domain models (ParkingSession, DerivedState, receipts, users, etc.)
//! - Collaborator traits (storage adapter, notification dispatcher)
//! - A clock abstraction so billing can be driven by a fake time source
//! - Unified error handling with user-facing recovery actions
//! - Application configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{AppError, RecoveryAction};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
