//! Session manager service
//!
//! Mediates every mutating operation on a parking session:
//! - Open sessions from validated user input
//! - Extend the time limit, paid from the user balance
//! - Apply clock ticks to the stored status
//! - Finalize sessions into a receipt
//! - Top up the user balance
//!
//! Money and time arithmetic is checked: inputs whose products do not fit a
//! `Decimal` are rejected as invalid parameters.
//!
//! Operations take the session as an explicit argument. A failed operation
//! leaves the session exactly as it was.

use chrono::{DateTime, Utc};
use park_core::{
    models::{
        hours_to_ms, BalanceTransaction, DerivedState, FinalizationReceipt, NewSession,
        ParkingSession, SessionEvent, SessionStatus, TransactionKind,
    },
    AppError, AppResult, Clock, SystemClock,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::billing_clock::{BillingClock, BillingPolicy};
use crate::constants::TOP_UP_PRESETS;

/// Quick extensions offered by the countdown view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPreset {
    /// +30 minutes
    HalfHour,
    /// +1 hour
    OneHour,
}

impl ExtensionPreset {
    pub fn hours(&self) -> Decimal {
        match self {
            ExtensionPreset::HalfHour => dec!(0.5),
            ExtensionPreset::OneHour => dec!(1),
        }
    }
}

/// Top-up amounts offered on the balance screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopUpPreset {
    Small,
    Medium,
    Large,
}

impl TopUpPreset {
    pub fn amount(&self) -> Decimal {
        match self {
            TopUpPreset::Small => TOP_UP_PRESETS[0],
            TopUpPreset::Medium => TOP_UP_PRESETS[1],
            TopUpPreset::Large => TOP_UP_PRESETS[2],
        }
    }
}

/// Outcome of a successful extension
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionResult {
    pub additional_hours: Decimal,
    pub cost: Decimal,
    pub new_time_limit_hours: Decimal,
    pub new_balance: Decimal,
    /// State recomputed right after the extension
    pub state: DerivedState,
    pub transaction: BalanceTransaction,
}

/// Outcome of applying one clock tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Derived values, with the status as stored on the session
    pub state: DerivedState,
    /// Set when this tick moved the session into a new status
    pub event: Option<SessionEvent>,
}

/// Session manager
///
/// Owns the billing policy and the clock used to stamp new sessions and
/// re-run ticks after extensions.
pub struct SessionManager<C: Clock = SystemClock> {
    clock: C,
    billing: BillingClock,
    max_extension_hours: Decimal,
}

impl Default for SessionManager<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock, BillingPolicy::default())
    }
}

impl<C: Clock> SessionManager<C> {
    /// Create a new session manager
    pub fn new(clock: C, policy: BillingPolicy) -> Self {
        Self {
            clock,
            billing: BillingClock::new(policy.warning_threshold_minutes),
            max_extension_hours: policy.max_extension_hours,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn billing_clock(&self) -> &BillingClock {
        &self.billing
    }

    /// Open a new active session starting now
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if the rate or limit is not
    /// positive, the limit is too large to count in milliseconds, the
    /// balance is negative, or the plate or location is malformed.
    #[instrument(skip(self, request), fields(plate = %request.vehicle_plate))]
    pub fn create_session(&self, request: NewSession) -> AppResult<ParkingSession> {
        request.validate()?;

        if request.hourly_rate <= Decimal::ZERO {
            return Err(AppError::InvalidParameter(format!(
                "hourly rate must be positive, got {}",
                request.hourly_rate
            )));
        }
        if request.time_limit_hours <= Decimal::ZERO {
            return Err(AppError::InvalidParameter(format!(
                "time limit must be positive, got {}",
                request.time_limit_hours
            )));
        }
        if hours_to_ms(request.time_limit_hours).is_none() {
            return Err(AppError::InvalidParameter(format!(
                "time limit is too large, got {}",
                request.time_limit_hours
            )));
        }
        if request.user_balance < Decimal::ZERO {
            return Err(AppError::InvalidParameter(format!(
                "balance must not be negative, got {}",
                request.user_balance
            )));
        }

        let plate = normalize_plate(&request.vehicle_plate)?;
        let location = request.location_id.trim();
        if location.is_empty() {
            return Err(AppError::InvalidParameter(
                "location must not be blank".to_string(),
            ));
        }

        let session = ParkingSession::new(
            plate,
            location.to_string(),
            self.clock.now(),
            request.hourly_rate,
            request.time_limit_hours,
            request.user_balance,
        );

        info!(
            "Created session {} for plate {} at {}: rate={}/h, limit={}h",
            session.id,
            session.vehicle_plate,
            session.location_id,
            session.hourly_rate,
            session.time_limit_hours
        );

        Ok(session)
    }

    /// Derived state at `now` without touching the session
    pub fn current_state(
        &self,
        session: &ParkingSession,
        now: DateTime<Utc>,
    ) -> AppResult<DerivedState> {
        ensure_open(session)?;
        Ok(self.billing.tick(now, session))
    }

    /// Apply a clock tick to the stored status
    ///
    /// Status only moves forward here; a clock that steps backwards never
    /// turns a warning back into active. Returns the event for the status
    /// the session just entered, if any.
    pub fn refresh(
        &self,
        session: &mut ParkingSession,
        now: DateTime<Utc>,
    ) -> AppResult<TickOutcome> {
        ensure_open(session)?;

        let mut state = self.billing.tick(now, session);
        let mut event = None;

        if state.status > session.status {
            event = match state.status {
                SessionStatus::Warning => Some(SessionEvent::TimeLow),
                SessionStatus::Expired => Some(SessionEvent::Expired),
                _ => None,
            };
            debug!(
                "Session {} moved {} -> {}",
                session.id, session.status, state.status
            );
            session.status = state.status;
        }

        state.status = session.status;
        Ok(TickOutcome { state, event })
    }

    /// Extend the time limit, paying from the user balance
    ///
    /// # Errors
    ///
    /// - `AlreadyFinalized` if the session is closed
    /// - `InvalidParameter` unless `0 < additional_hours <= max_extension_hours`,
    ///   or if the cost or the new limit overflows
    /// - `InsufficientBalance` if the balance does not cover the cost
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn extend(
        &self,
        session: &mut ParkingSession,
        additional_hours: Decimal,
    ) -> AppResult<ExtensionResult> {
        ensure_open(session)?;

        if additional_hours <= Decimal::ZERO || additional_hours > self.max_extension_hours {
            return Err(AppError::InvalidParameter(format!(
                "extension must be more than 0 and at most {} hours, got {}",
                self.max_extension_hours, additional_hours
            )));
        }

        let cost = session.extension_cost(additional_hours).ok_or_else(|| {
            AppError::InvalidParameter(format!(
                "extension cost overflows at rate {}",
                session.hourly_rate
            ))
        })?;
        let new_limit = session
            .time_limit_hours
            .checked_add(additional_hours)
            .filter(|hours| hours_to_ms(*hours).is_some())
            .ok_or_else(|| {
                AppError::InvalidParameter(format!(
                    "time limit {}h cannot grow by {}h",
                    session.time_limit_hours, additional_hours
                ))
            })?;

        if session.user_balance < cost {
            warn!(
                "Insufficient balance to extend session {}: required {}, available {}",
                session.id, cost, session.user_balance
            );
            return Err(AppError::InsufficientBalance {
                required: cost.to_string(),
                available: session.user_balance.to_string(),
            });
        }

        let now = self.clock.now();
        let transaction = BalanceTransaction::new(
            Some(session.id),
            -cost,
            session.user_balance,
            TransactionKind::Extension,
            format!("Parking extension {}h - {}", additional_hours, session.location_id),
            now,
        );

        // Limit and balance change together
        session.time_limit_hours = new_limit;
        session.user_balance = transaction.new_balance;
        session.extensions = session.extensions.saturating_add(1);

        let state = self.billing.tick(now, session);
        session.status = state.status;

        info!(
            "Extended session {} by {}h for {}: limit={}h, balance={}, status={}",
            session.id,
            additional_hours,
            cost,
            session.time_limit_hours,
            session.user_balance,
            session.status
        );

        Ok(ExtensionResult {
            additional_hours,
            cost,
            new_time_limit_hours: session.time_limit_hours,
            new_balance: session.user_balance,
            state,
            transaction,
        })
    }

    /// Extend by one of the quick presets
    pub fn extend_preset(
        &self,
        session: &mut ParkingSession,
        preset: ExtensionPreset,
    ) -> AppResult<ExtensionResult> {
        self.extend(session, preset.hours())
    }

    /// Close the session and produce its receipt
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFinalized` if the session was closed before.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn finalize(
        &self,
        session: &mut ParkingSession,
        now: DateTime<Utc>,
    ) -> AppResult<FinalizationReceipt> {
        ensure_open(session)?;

        let state = self.billing.tick(now, session);
        session.status = SessionStatus::Finalized;
        session.finalized_at = Some(now);

        let receipt = FinalizationReceipt {
            session_id: session.id,
            vehicle_plate: session.vehicle_plate.clone(),
            location_id: session.location_id.clone(),
            started_at: session.start_time,
            finalized_at: now,
            total_elapsed_minutes: state.elapsed_minutes,
            total_cost: state.accrued_cost,
            remaining_balance: session.user_balance,
            extensions: session.extensions,
        };

        info!(
            "Finalized session {}: elapsed={}, cost={}",
            session.id,
            receipt.elapsed_display(),
            receipt.total_cost
        );

        Ok(receipt)
    }

    /// Add credit to the user balance
    ///
    /// # Errors
    ///
    /// - `AlreadyFinalized` if the session is closed
    /// - `InvalidParameter` if `amount` is not positive or the new balance
    ///   overflows
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn top_up(
        &self,
        session: &mut ParkingSession,
        amount: Decimal,
    ) -> AppResult<BalanceTransaction> {
        ensure_open(session)?;

        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidParameter(format!(
                "top-up amount must be positive, got {}",
                amount
            )));
        }
        if session.user_balance.checked_add(amount).is_none() {
            return Err(AppError::InvalidParameter(format!(
                "top-up of {} overflows balance {}",
                amount, session.user_balance
            )));
        }

        let transaction = BalanceTransaction::new(
            Some(session.id),
            amount,
            session.user_balance,
            TransactionKind::TopUp,
            "Balance top-up",
            self.clock.now(),
        );
        session.user_balance = transaction.new_balance;

        info!(
            "Topped up {} on session {}: balance={}",
            amount, session.id, session.user_balance
        );

        Ok(transaction)
    }

    /// Top up by one of the balance screen presets
    pub fn top_up_preset(
        &self,
        session: &mut ParkingSession,
        preset: TopUpPreset,
    ) -> AppResult<BalanceTransaction> {
        self.top_up(session, preset.amount())
    }
}

fn ensure_open(session: &ParkingSession) -> AppResult<()> {
    if session.is_finalized() {
        warn!("Rejected operation on finalized session {}", session.id);
        return Err(AppError::AlreadyFinalized(session.id.to_string()));
    }
    Ok(())
}

/// Uppercase the plate and check it is made of letters, digits, spaces and dashes
fn normalize_plate(plate: &str) -> AppResult<String> {
    let plate = plate.trim().to_uppercase();

    let has_alnum = plate.chars().any(|c| c.is_ascii_alphanumeric());
    let well_formed = plate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');

    if !has_alnum || !well_formed {
        return Err(AppError::InvalidParameter(format!(
            "vehicle plate must be alphanumeric, got {:?}",
            plate
        )));
    }

    Ok(plate)
}
