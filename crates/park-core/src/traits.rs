//! Collaborator traits
//!
//! Abstractions over the key-value device storage and the notification
//! channel. The session core depends only on these contracts.

use crate::error::AppError;
use crate::models::{DerivedState, SessionEvent};
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// Key-value storage used to persist the logged-in identity
///
/// Implementations prefix every key with the application namespace.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Get a value, `None` if the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Delete a value; `Ok(true)` if something was removed
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
}

/// Notification raised when a session changes status during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionNotification {
    pub session_id: Uuid,
    pub vehicle_plate: String,
    pub event: SessionEvent,
    pub state: DerivedState,
}

impl SessionNotification {
    /// User-facing title
    pub fn title(&self) -> &'static str {
        match self.event {
            SessionEvent::TimeLow => "Parking time running out",
            SessionEvent::Expired => "Parking time expired",
        }
    }

    /// User-facing message body
    pub fn body(&self) -> String {
        match self.event {
            SessionEvent::TimeLow => format!(
                "Your parking expires in {} minutes. Plate: {}",
                self.state.remaining_minutes, self.vehicle_plate
            ),
            SessionEvent::Expired => format!(
                "Parking time for plate {} has expired. Extend or finalize the session.",
                self.vehicle_plate
            ),
        }
    }
}

/// Delivery channel for session notifications (push, banner, log, ...)
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, notification: &SessionNotification) -> Result<(), AppError>;
}
