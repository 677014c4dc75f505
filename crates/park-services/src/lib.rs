//! Session billing services for ParkApp
//!
//! This crate contains the services that own the lifecycle of a parking
//! session: the pure billing clock, the session manager that mediates every
//! mutation, and the monitor that re-evaluates active sessions periodically.
//!
//! # Architecture
//!
//! - Sessions are explicit values; manager operations take them as arguments
//! - Shared sessions are guarded by a mutex so a tick never observes a
//!   half-applied extension
//! - Periodic ticks run as cancelable tokio tasks
//! - All operations are instrumented with tracing
//!
//! # Services
//!
//! - `BillingClock` - Elapsed/remaining time, accrued cost and status
//! - `SessionManager` - Create, extend, finalize and top up sessions
//! - `SessionMonitor` - Cancelable periodic recomputation and notifications
//! - `AuthService` - Login, logout and identity restore
//! - `TracingNotifier` - Notification dispatcher that logs

pub mod auth;
pub mod billing_clock;
pub mod notifier;
pub mod session_manager;
pub mod session_monitor;

pub use auth::AuthService;
pub use billing_clock::{BillingClock, BillingPolicy};
pub use notifier::TracingNotifier;
pub use session_manager::{
    ExtensionPreset, ExtensionResult, SessionManager, TickOutcome, TopUpPreset,
};
pub use session_monitor::{SessionMonitor, SharedSession};

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Remaining minutes at or below which a session is in warning
    pub const WARNING_THRESHOLD_MINUTES: i64 = 15;

    /// Largest extension accepted in one call, in hours
    pub const MAX_EXTENSION_HOURS: Decimal = dec!(5);

    /// Top-up amounts offered on the balance screen
    pub const TOP_UP_PRESETS: [Decimal; 3] = [dec!(500), dec!(1000), dec!(2000)];

    pub const MS_PER_MINUTE: i64 = 60_000;
}
