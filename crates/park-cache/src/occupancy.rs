//! Lot occupancy ledger
//!
//! Records which sessions currently hold a space, as a JSON array of ids
//! under the `lot:occupied` key. With the Redis backend every process
//! sharing the namespace sees the same ledger.

use park_core::models::OccupancySnapshot;
use park_core::traits::StorageAdapter;
use park_core::AppResult;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::keys::OCCUPIED_KEY;

/// Occupied-spaces ledger on top of a storage adapter
#[derive(Clone)]
pub struct OccupancyLedger {
    storage: Arc<dyn StorageAdapter>,
}

impl OccupancyLedger {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Sessions currently holding a space
    pub async fn occupied(&self) -> AppResult<Vec<Uuid>> {
        match self.storage.get(OCCUPIED_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Mark a session as holding a space; `false` if it already did
    pub async fn occupy(&self, session_id: Uuid) -> AppResult<bool> {
        let mut occupied = self.occupied().await?;
        if occupied.contains(&session_id) {
            return Ok(false);
        }
        occupied.push(session_id);
        self.save(&occupied).await?;
        debug!("Session {} occupies a space ({} total)", session_id, occupied.len());
        Ok(true)
    }

    /// Free the space held by a session; `false` if it held none
    pub async fn release(&self, session_id: Uuid) -> AppResult<bool> {
        let mut occupied = self.occupied().await?;
        let before = occupied.len();
        occupied.retain(|id| *id != session_id);
        if occupied.len() == before {
            return Ok(false);
        }
        self.save(&occupied).await?;
        debug!("Session {} released its space ({} left)", session_id, occupied.len());
        Ok(true)
    }

    /// Occupancy of a lot with `capacity` spaces
    pub async fn snapshot(&self, capacity: u32) -> AppResult<OccupancySnapshot> {
        let occupied = self.occupied().await?.len();
        Ok(OccupancySnapshot::from_capacity(
            capacity,
            u32::try_from(occupied).unwrap_or(u32::MAX),
        ))
    }

    async fn save(&self, occupied: &[Uuid]) -> AppResult<()> {
        if occupied.is_empty() {
            self.storage.delete(OCCUPIED_KEY).await?;
        } else {
            let json = serde_json::to_string(occupied)?;
            self.storage.set(OCCUPIED_KEY, &json).await?;
        }
        Ok(())
    }
}
