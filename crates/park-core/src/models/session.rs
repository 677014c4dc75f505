//! Parking session model
//!
//! A session is one continuous parking occupancy by a vehicle, bounded by
//! its start time and a time limit that can only grow through paid
//! extensions.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Session status
///
/// Ordered by progression: `Active < Warning < Expired < Finalized`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// More than the warning threshold remains
    #[default]
    Active,
    /// Time is running low
    Warning,
    /// The paid time limit has lapsed
    Expired,
    /// Closed; no further ticks or mutations
    Finalized,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Warning => write!(f, "warning"),
            SessionStatus::Expired => write!(f, "expired"),
            SessionStatus::Finalized => write!(f, "finalized"),
        }
    }
}

impl SessionStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(SessionStatus::Active),
            "warning" => Some(SessionStatus::Warning),
            "expired" => Some(SessionStatus::Expired),
            "finalized" => Some(SessionStatus::Finalized),
            _ => None,
        }
    }

    /// Check if the session is closed
    pub fn is_final(&self) -> bool {
        matches!(self, SessionStatus::Finalized)
    }
}

/// Input for opening a session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSession {
    /// Vehicle plate as entered by the user
    #[validate(length(min = 1, max = 16))]
    pub vehicle_plate: String,

    /// Parking spot or zone identifier
    #[validate(length(min = 1, max = 128))]
    pub location_id: String,

    /// Price per hour
    pub hourly_rate: Decimal,

    /// Initial time limit in hours
    pub time_limit_hours: Decimal,

    /// Balance available to the user when parking starts
    pub user_balance: Decimal,
}

/// Active parking occupancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSession {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Vehicle plate, normalized to uppercase
    pub vehicle_plate: String,

    /// Parking spot or zone identifier
    pub location_id: String,

    /// When parking started; never changes
    pub start_time: DateTime<Utc>,

    /// Price per hour
    pub hourly_rate: Decimal,

    /// Paid time limit in hours
    pub time_limit_hours: Decimal,

    /// User balance, owned by the user account
    pub user_balance: Decimal,

    /// Current status
    pub status: SessionStatus,

    /// Number of successful extensions
    pub extensions: u32,

    /// When the session was finalized
    pub finalized_at: Option<DateTime<Utc>>,
}

impl ParkingSession {
    /// Build an active session starting at `start_time`
    ///
    /// Parameters are not checked here; use the session manager to open
    /// sessions from user input.
    pub fn new(
        vehicle_plate: String,
        location_id: String,
        start_time: DateTime<Utc>,
        hourly_rate: Decimal,
        time_limit_hours: Decimal,
        user_balance: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_plate,
            location_id,
            start_time,
            hourly_rate,
            time_limit_hours,
            user_balance,
            status: SessionStatus::Active,
            extensions: 0,
            finalized_at: None,
        }
    }

    /// Time limit expressed in milliseconds, `None` if it does not fit a `Decimal`
    #[inline]
    pub fn limit_ms(&self) -> Option<Decimal> {
        hours_to_ms(self.time_limit_hours)
    }

    /// Instant at which the paid time runs out
    ///
    /// Sub-millisecond fractions of the limit are truncated.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ms = self
            .limit_ms()
            .and_then(|ms| ms.trunc().to_i64())
            .unwrap_or(i64::MAX);
        Duration::try_milliseconds(ms)
            .and_then(|limit| self.start_time.checked_add_signed(limit))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Cost of extending by `hours` at the session rate, `None` on overflow
    #[inline]
    pub fn extension_cost(&self, hours: Decimal) -> Option<Decimal> {
        hours.checked_mul(self.hourly_rate)
    }

    /// Check if the session is closed
    pub fn is_finalized(&self) -> bool {
        self.status.is_final()
    }
}

/// Convert hours to milliseconds, `None` on overflow
pub fn hours_to_ms(hours: Decimal) -> Option<Decimal> {
    hours.checked_mul(Decimal::from(3_600_000))
}

/// Values derived from a session at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedState {
    /// Whole minutes since start, never negative
    pub elapsed_minutes: i64,

    /// Whole minutes left, clamped at zero for display
    pub remaining_minutes: i64,

    /// Whole minutes left before clamping; zero or below means expired
    pub raw_remaining_minutes: i64,

    /// Amount owed so far, rounded up to a whole currency unit
    pub accrued_cost: Decimal,

    /// Status implied by the remaining time
    pub status: SessionStatus,

    /// When the paid time runs out
    pub expires_at: DateTime<Utc>,
}

impl DerivedState {
    /// Remaining time as `HH:MM:00`, matching the countdown display
    pub fn remaining_display(&self) -> String {
        format!(
            "{:02}:{:02}:00",
            self.remaining_minutes / 60,
            self.remaining_minutes % 60
        )
    }

    /// Elapsed time as `{h}h {m}m`
    pub fn elapsed_display(&self) -> String {
        format_hours_minutes(self.elapsed_minutes)
    }
}

/// Logical events produced by a status change during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session entered the warning window
    TimeLow,
    /// The paid time lapsed
    Expired,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::TimeLow => write!(f, "time_low"),
            SessionEvent::Expired => write!(f, "expired"),
        }
    }
}

/// Format whole minutes as `{h}h {m}m`
pub fn format_hours_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
