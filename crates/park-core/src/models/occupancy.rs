//! Occupancy snapshot for the administrator dashboard

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Occupied and free spaces at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OccupancySnapshot {
    pub occupied: u32,
    pub free: u32,
}

impl OccupancySnapshot {
    /// Snapshot for a lot of `capacity` spaces with `occupied` in use
    pub fn from_capacity(capacity: u32, occupied: u32) -> Self {
        let occupied = occupied.min(capacity);
        Self {
            occupied,
            free: capacity - occupied,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.occupied + self.free
    }

    /// Percentage of occupied spaces, one decimal place, half away from zero
    pub fn occupancy_percent(&self) -> Decimal {
        let capacity = self.capacity();
        if capacity == 0 {
            return Decimal::ZERO.round_dp(1);
        }
        (Decimal::from(self.occupied) * Decimal::from(100) / Decimal::from(capacity))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl fmt::Display for OccupancySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}% occupancy", self.occupancy_percent())
    }
}
