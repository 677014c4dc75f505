//! Domain models for ParkApp
//!
//! This module contains all the core domain models used throughout the application.

pub mod occupancy;
pub mod receipt;
pub mod session;
pub mod transaction;
pub mod user;

pub use occupancy::OccupancySnapshot;
pub use receipt::FinalizationReceipt;
pub use session::{
    format_hours_minutes, hours_to_ms, DerivedState, NewSession, ParkingSession, SessionEvent,
    SessionStatus,
};
pub use transaction::{BalanceTransaction, TransactionKind};
pub use user::{Role, User};
