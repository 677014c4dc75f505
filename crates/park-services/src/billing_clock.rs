//! Billing clock
//!
//! Derives elapsed time, remaining time, accrued cost and status for one
//! session at a given instant. Pure: the same inputs always give the same
//! output and the session is never mutated here.

use chrono::{DateTime, Utc};
use park_core::config::BillingConfig;
use park_core::models::{DerivedState, ParkingSession, SessionStatus};
use park_core::{AppError, AppResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::constants::{MAX_EXTENSION_HOURS, MS_PER_MINUTE, WARNING_THRESHOLD_MINUTES};

/// Billing policy knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingPolicy {
    /// Remaining minutes at or below which a session is in warning
    pub warning_threshold_minutes: i64,

    /// Largest extension accepted in one call, in hours
    pub max_extension_hours: Decimal,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            warning_threshold_minutes: WARNING_THRESHOLD_MINUTES,
            max_extension_hours: MAX_EXTENSION_HOURS,
        }
    }
}

impl BillingPolicy {
    /// Build the policy from configuration
    pub fn from_config(config: &BillingConfig) -> AppResult<Self> {
        if config.warning_threshold_minutes < 0 {
            return Err(AppError::Config(format!(
                "billing.warning_threshold_minutes must not be negative, got {}",
                config.warning_threshold_minutes
            )));
        }

        let max_extension_hours = Decimal::from_f64(config.max_extension_hours)
            .filter(|hours| *hours > Decimal::ZERO)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "billing.max_extension_hours must be positive, got {}",
                    config.max_extension_hours
                ))
            })?;

        Ok(Self {
            warning_threshold_minutes: config.warning_threshold_minutes,
            max_extension_hours,
        })
    }
}

/// Computes the derived state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingClock {
    warning_threshold_minutes: i64,
}

impl Default for BillingClock {
    fn default() -> Self {
        Self::new(WARNING_THRESHOLD_MINUTES)
    }
}

impl BillingClock {
    pub fn new(warning_threshold_minutes: i64) -> Self {
        Self {
            warning_threshold_minutes,
        }
    }

    pub fn warning_threshold_minutes(&self) -> i64 {
        self.warning_threshold_minutes
    }

    /// Derive the session state at `now`
    ///
    /// A start time in the future counts as zero elapsed minutes. The
    /// remaining time is floored toward negative infinity, so any part of a
    /// minute past the limit already counts as expired.
    pub fn tick(&self, now: DateTime<Utc>, session: &ParkingSession) -> DerivedState {
        let elapsed_ms = (now - session.start_time).num_milliseconds();
        let elapsed_minutes = elapsed_ms.div_euclid(MS_PER_MINUTE).max(0);

        // A limit too large for a Decimal never runs out
        let raw_remaining_minutes = session
            .limit_ms()
            .and_then(|limit_ms| limit_ms.checked_sub(Decimal::from(elapsed_ms)))
            .map(|remaining_ms| {
                (remaining_ms / Decimal::from(MS_PER_MINUTE))
                    .floor()
                    .to_i64()
                    .unwrap_or(if remaining_ms.is_sign_negative() {
                        i64::MIN
                    } else {
                        i64::MAX
                    })
            })
            .unwrap_or(i64::MAX);

        DerivedState {
            elapsed_minutes,
            remaining_minutes: raw_remaining_minutes.max(0),
            raw_remaining_minutes,
            accrued_cost: Self::accrued_cost(elapsed_minutes, session.hourly_rate),
            status: self.status_for(raw_remaining_minutes),
            expires_at: session.expires_at(),
        }
    }

    /// Cost of `elapsed_minutes` at `hourly_rate`, rounded up to a whole unit
    ///
    /// Saturates at `Decimal::MAX`.
    pub fn accrued_cost(elapsed_minutes: i64, hourly_rate: Decimal) -> Decimal {
        let minutes = Decimal::from(elapsed_minutes.max(0));
        minutes
            .checked_mul(hourly_rate)
            .map(|cost| (cost / Decimal::from(60)).ceil())
            .unwrap_or(Decimal::MAX)
    }

    /// Status implied by the unclamped remaining minutes
    pub fn status_for(&self, raw_remaining_minutes: i64) -> SessionStatus {
        if raw_remaining_minutes <= 0 {
            SessionStatus::Expired
        } else if raw_remaining_minutes <= self.warning_threshold_minutes {
            SessionStatus::Warning
        } else {
            SessionStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn session_at(start: DateTime<Utc>) -> ParkingSession {
        ParkingSession::new(
            "ABC123".to_string(),
            "zone-a-001".to_string(),
            start,
            dec!(50),
            dec!(2),
            dec!(1250),
        )
    }

    #[test]
    fn test_ninety_minutes_in() {
        let start = Utc::now();
        let state =
            BillingClock::default().tick(start + Duration::minutes(90), &session_at(start));

        assert_eq!(state.elapsed_minutes, 90);
        assert_eq!(state.accrued_cost, dec!(75));
        assert_eq!(state.remaining_minutes, 30);
        assert_eq!(state.status, SessionStatus::Active);
    }

    #[test]
    fn test_ten_minutes_left_is_warning() {
        let start = Utc::now();
        let state =
            BillingClock::default().tick(start + Duration::minutes(110), &session_at(start));

        assert_eq!(state.remaining_minutes, 10);
        assert_eq!(state.status, SessionStatus::Warning);
    }

    #[test]
    fn test_past_limit_is_clamped_and_expired() {
        let start = Utc::now();
        let state =
            BillingClock::default().tick(start + Duration::minutes(125), &session_at(start));

        assert_eq!(state.raw_remaining_minutes, -5);
        assert_eq!(state.remaining_minutes, 0);
        assert_eq!(state.status, SessionStatus::Expired);
        assert_eq!(state.remaining_display(), "00:00:00");
    }

    #[test]
    fn test_boundaries() {
        let start = Utc::now();
        let session = session_at(start);
        let clock = BillingClock::default();

        // Exactly 16 minutes left
        let state = clock.tick(start + Duration::minutes(104), &session);
        assert_eq!(state.raw_remaining_minutes, 16);
        assert_eq!(state.status, SessionStatus::Active);

        // Exactly 15 minutes left is already a warning
        let state = clock.tick(start + Duration::minutes(105), &session);
        assert_eq!(state.raw_remaining_minutes, 15);
        assert_eq!(state.status, SessionStatus::Warning);

        // Exactly at the limit is expired
        let state = clock.tick(start + Duration::minutes(120), &session);
        assert_eq!(state.raw_remaining_minutes, 0);
        assert_eq!(state.status, SessionStatus::Expired);

        // Thirty seconds left floors to zero minutes
        let state = clock.tick(start + Duration::seconds(120 * 60 - 30), &session);
        assert_eq!(state.raw_remaining_minutes, 0);
        assert_eq!(state.status, SessionStatus::Expired);

        // Thirty seconds past the limit floors to minus one
        let state = clock.tick(start + Duration::seconds(120 * 60 + 30), &session);
        assert_eq!(state.raw_remaining_minutes, -1);
    }

    #[test]
    fn test_future_start_counts_as_zero_elapsed() {
        let now = Utc::now();
        let session = session_at(now + Duration::minutes(10));
        let state = BillingClock::default().tick(now, &session);

        assert_eq!(state.elapsed_minutes, 0);
        assert_eq!(state.accrued_cost, Decimal::ZERO);
        assert_eq!(state.raw_remaining_minutes, 130);
        assert_eq!(state.status, SessionStatus::Active);
    }

    #[test]
    fn test_cost_rounds_up() {
        // 1 minute at 50/h is 0.8333..., billed as 1
        assert_eq!(BillingClock::accrued_cost(1, dec!(50)), dec!(1));
        assert_eq!(BillingClock::accrued_cost(0, dec!(50)), dec!(0));
        assert_eq!(BillingClock::accrued_cost(61, dec!(50)), dec!(51));
        assert_eq!(BillingClock::accrued_cost(30, dec!(12.5)), dec!(7));
    }

    #[test]
    fn test_extreme_rate_and_limit_saturate() {
        assert_eq!(BillingClock::accrued_cost(2, Decimal::MAX), Decimal::MAX);

        let start = Utc::now();
        let session = ParkingSession {
            time_limit_hours: Decimal::MAX,
            hourly_rate: Decimal::MAX,
            ..session_at(start)
        };
        let state = BillingClock::default().tick(start + Duration::minutes(5), &session);

        assert_eq!(state.status, SessionStatus::Active);
        assert_eq!(state.raw_remaining_minutes, i64::MAX);
        assert_eq!(state.accrued_cost, Decimal::MAX);
    }

    #[test]
    fn test_tick_is_idempotent() {
        let start = Utc::now();
        let session = session_at(start);
        let clock = BillingClock::default();
        let now = start + Duration::seconds(4321);

        assert_eq!(clock.tick(now, &session), clock.tick(now, &session));
    }

    #[test]
    fn test_custom_warning_threshold() {
        let clock = BillingClock::new(5);
        assert_eq!(clock.status_for(10), SessionStatus::Active);
        assert_eq!(clock.status_for(5), SessionStatus::Warning);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = BillingPolicy::from_config(&BillingConfig::default()).unwrap();
        assert_eq!(policy, BillingPolicy::default());

        let bad = BillingConfig {
            max_extension_hours: 0.0,
            ..BillingConfig::default()
        };
        assert!(matches!(
            BillingPolicy::from_config(&bad),
            Err(AppError::Config(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_cost_is_non_negative_and_monotonic(
            rate_cents in 1i64..100_000,
            minutes in 0i64..100_000,
        ) {
            let rate = Decimal::new(rate_cents, 2);
            let cost = BillingClock::accrued_cost(minutes, rate);
            let next = BillingClock::accrued_cost(minutes + 1, rate);

            prop_assert!(cost >= Decimal::ZERO);
            prop_assert!(next >= cost);
        }

        #[test]
        fn prop_status_matches_remaining(
            elapsed_secs in -3_600i64..40_000,
            limit_quarters in 1i64..40,
        ) {
            let start = Utc::now();
            let session = ParkingSession {
                time_limit_hours: Decimal::new(limit_quarters * 25, 2),
                ..session_at(start)
            };
            let now = start + Duration::seconds(elapsed_secs);
            let state = BillingClock::default().tick(now, &session);

            let expected = if state.raw_remaining_minutes <= 0 {
                SessionStatus::Expired
            } else if state.raw_remaining_minutes <= 15 {
                SessionStatus::Warning
            } else {
                SessionStatus::Active
            };
            prop_assert_eq!(state.status, expected);
            prop_assert!(state.remaining_minutes >= 0);
            prop_assert!(state.elapsed_minutes >= 0);
        }
    }
}
