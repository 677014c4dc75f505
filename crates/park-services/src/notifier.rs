//! Notification dispatchers

use async_trait::async_trait;
use park_core::models::SessionEvent;
use park_core::traits::{NotificationDispatcher, SessionNotification};
use park_core::AppResult;
use tracing::{info, warn};

/// Dispatcher that writes notifications to the log
///
/// Used by the binary when no push channel is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationDispatcher for TracingNotifier {
    async fn notify(&self, notification: &SessionNotification) -> AppResult<()> {
        match notification.event {
            SessionEvent::TimeLow => warn!(
                session_id = %notification.session_id,
                remaining_minutes = notification.state.remaining_minutes,
                "{}: {}",
                notification.title(),
                notification.body()
            ),
            SessionEvent::Expired => info!(
                session_id = %notification.session_id,
                "{}: {}",
                notification.title(),
                notification.body()
            ),
        }
        Ok(())
    }
}
