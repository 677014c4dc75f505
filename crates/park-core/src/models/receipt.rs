//! Finalization receipt
//!
//! Produced once when a session is closed and used for confirmation
//! messaging.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::format_hours_minutes;

/// Billing summary of a finalized session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizationReceipt {
    pub session_id: Uuid,
    pub vehicle_plate: String,
    pub location_id: String,
    pub started_at: DateTime<Utc>,
    pub finalized_at: DateTime<Utc>,

    /// Whole minutes parked
    pub total_elapsed_minutes: i64,

    /// Accrued cost at finalization
    pub total_cost: Decimal,

    /// Balance left after all extensions
    pub remaining_balance: Decimal,

    /// Number of paid extensions
    pub extensions: u32,
}

impl FinalizationReceipt {
    /// Time parked as `{h}h {m}m`
    pub fn elapsed_display(&self) -> String {
        format_hours_minutes(self.total_elapsed_minutes)
    }

    /// One-line confirmation summary
    pub fn summary(&self) -> String {
        format!(
            "Plate: {} | Time: {} | Cost: ${}",
            self.vehicle_plate,
            self.elapsed_display(),
            self.total_cost
        )
    }
}
