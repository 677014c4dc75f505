//! Session monitor
//!
//! Re-evaluates monitored sessions once per tick interval on a background
//! task, publishes the derived state on a watch channel and dispatches
//! time-low and expiry notifications. Each monitor is cancelable and is
//! stopped when its session is finalized.
//!
//! States are published while the session lock is held, so subscribers see
//! them in the same order the session changed.

use park_core::models::{
    BalanceTransaction, DerivedState, FinalizationReceipt, ParkingSession, SessionEvent,
    SessionStatus,
};
use park_core::traits::{NotificationDispatcher, SessionNotification};
use park_core::{AppError, AppResult, Clock, SystemClock};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::session_manager::{ExtensionResult, SessionManager};

/// A session shared between the caller and its monitor task
pub type SharedSession = Arc<Mutex<ParkingSession>>;

struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    state_tx: Arc<watch::Sender<DerivedState>>,
}

/// Periodic session monitor
pub struct SessionMonitor<C: Clock + 'static = SystemClock> {
    manager: Arc<SessionManager<C>>,
    notifier: Arc<dyn NotificationDispatcher>,
    tick_interval: Duration,
    active_monitors: Arc<RwLock<HashMap<Uuid, MonitorHandle>>>,
}

impl<C: Clock + 'static> SessionMonitor<C> {
    pub fn new(
        manager: Arc<SessionManager<C>>,
        notifier: Arc<dyn NotificationDispatcher>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            manager,
            notifier,
            tick_interval,
            active_monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager<C>> {
        &self.manager
    }

    /// Start monitoring a session
    ///
    /// The session is refreshed once immediately, then once per tick
    /// interval. The returned receiver always holds the latest state.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the session is already monitored
    /// - `AlreadyFinalized` if the session is closed
    pub async fn start(&self, session: SharedSession) -> AppResult<watch::Receiver<DerivedState>> {
        let mut monitors = self.active_monitors.write().await;

        let (session_id, plate, outcome) = {
            let mut guard = session.lock();
            let session_id = guard.id;
            if monitors.contains_key(&session_id) {
                return Err(AppError::Conflict(format!(
                    "session {} is already monitored",
                    session_id
                )));
            }
            let outcome = self.manager.refresh(&mut guard, self.manager.clock().now())?;
            (session_id, guard.vehicle_plate.clone(), outcome)
        };

        let (state_tx, state_rx) = watch::channel(outcome.state);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(
            Self::run(
                self.manager.clone(),
                self.notifier.clone(),
                session,
                state_tx.clone(),
                cancel.clone(),
                self.tick_interval,
                self.active_monitors.clone(),
            )
            .instrument(info_span!("session_monitor", session_id = %session_id)),
        );

        monitors.insert(
            session_id,
            MonitorHandle {
                cancel,
                task,
                state_tx,
            },
        );
        drop(monitors);

        info!(
            "Started monitoring session {} every {:?}",
            session_id, self.tick_interval
        );

        if let Some(event) = outcome.event {
            dispatch(self.notifier.as_ref(), session_id, plate, event, outcome.state).await;
        }

        Ok(state_rx)
    }

    /// Stop monitoring a session; `false` if it was not monitored
    pub async fn stop(&self, session_id: Uuid) -> bool {
        let handle = self.active_monitors.write().await.remove(&session_id);

        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                handle.task.abort();
                info!("Stopped monitoring session {}", session_id);
                true
            }
            None => false,
        }
    }

    /// Latest-state receiver for a monitored session
    pub async fn subscribe(&self, session_id: Uuid) -> Option<watch::Receiver<DerivedState>> {
        self.active_monitors
            .read()
            .await
            .get(&session_id)
            .map(|handle| handle.state_tx.subscribe())
    }

    pub async fn is_monitoring(&self, session_id: Uuid) -> bool {
        self.active_monitors.read().await.contains_key(&session_id)
    }

    /// Number of monitored sessions
    pub async fn active_count(&self) -> usize {
        self.active_monitors.read().await.len()
    }

    /// Extend a shared session and publish the new state
    ///
    /// Every successful extension re-arms the time-low alert, so one that
    /// still leaves the session in the warning window notifies again.
    pub async fn extend(
        &self,
        session: &SharedSession,
        additional_hours: Decimal,
    ) -> AppResult<ExtensionResult> {
        let session_id = session.lock().id;
        let state_tx = self
            .active_monitors
            .read()
            .await
            .get(&session_id)
            .map(|handle| handle.state_tx.clone());

        let (plate, result) = {
            let mut guard = session.lock();
            let result = self.manager.extend(&mut guard, additional_hours)?;
            if let Some(state_tx) = &state_tx {
                state_tx.send_replace(result.state);
            }
            (guard.vehicle_plate.clone(), result)
        };

        if result.state.status == SessionStatus::Warning {
            dispatch(
                self.notifier.as_ref(),
                session_id,
                plate,
                SessionEvent::TimeLow,
                result.state,
            )
            .await;
        }

        Ok(result)
    }

    /// Top up a shared session's balance
    pub async fn top_up(
        &self,
        session: &SharedSession,
        amount: Decimal,
    ) -> AppResult<BalanceTransaction> {
        let mut guard = session.lock();
        self.manager.top_up(&mut guard, amount)
    }

    /// Stop the monitor and finalize the session
    pub async fn finalize(&self, session: &SharedSession) -> AppResult<FinalizationReceipt> {
        let session_id = session.lock().id;
        self.stop(session_id).await;

        let mut guard = session.lock();
        let now = self.manager.clock().now();
        self.manager.finalize(&mut guard, now)
    }

    async fn run(
        manager: Arc<SessionManager<C>>,
        notifier: Arc<dyn NotificationDispatcher>,
        session: SharedSession,
        state_tx: Arc<watch::Sender<DerivedState>>,
        cancel: CancellationToken,
        period: Duration,
        monitors: Arc<RwLock<HashMap<Uuid, MonitorHandle>>>,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Monitor cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let tick = {
                let mut guard = session.lock();
                let now = manager.clock().now();
                manager.refresh(&mut guard, now).map(|outcome| {
                    state_tx.send_replace(outcome.state);
                    (guard.id, guard.vehicle_plate.clone(), outcome)
                })
            };

            match tick {
                Ok((session_id, plate, outcome)) => {
                    if let Some(event) = outcome.event {
                        dispatch(notifier.as_ref(), session_id, plate, event, outcome.state).await;
                    }
                }
                Err(AppError::AlreadyFinalized(id)) => {
                    info!("Session {} finalized, stopping monitor", id);
                    if let Ok(session_id) = Uuid::parse_str(&id) {
                        monitors.write().await.remove(&session_id);
                    }
                    return;
                }
                Err(e) => {
                    error!("Monitor tick failed: {}", e);
                    return;
                }
            }
        }
    }
}

async fn dispatch(
    notifier: &dyn NotificationDispatcher,
    session_id: Uuid,
    vehicle_plate: String,
    event: SessionEvent,
    state: DerivedState,
) {
    let notification = SessionNotification {
        session_id,
        vehicle_plate,
        event,
        state,
    };

    if let Err(e) = notifier.notify(&notification).await {
        warn!(
            "Failed to deliver {} notification for session {}: {}",
            event, session_id, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing_clock::BillingPolicy;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use park_core::models::NewSession;
    use park_core::ManualClock;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<SessionEvent>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<SessionEvent> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingNotifier {
        async fn notify(&self, notification: &SessionNotification) -> AppResult<()> {
            self.sent.lock().push(notification.event);
            Ok(())
        }
    }

    const TICK: Duration = Duration::from_millis(1000);

    fn setup() -> (
        SessionMonitor<ManualClock>,
        Arc<RecordingNotifier>,
        ManualClock,
        SharedSession,
    ) {
        let clock = ManualClock::default();
        let manager = Arc::new(SessionManager::new(clock.clone(), BillingPolicy::default()));
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = SessionMonitor::new(manager.clone(), notifier.clone(), TICK);

        let session = manager
            .create_session(NewSession {
                vehicle_plate: "ABC123".to_string(),
                location_id: "zone-a-001".to_string(),
                hourly_rate: dec!(50),
                time_limit_hours: dec!(2),
                user_balance: dec!(1250),
            })
            .unwrap();

        (monitor, notifier, clock, Arc::new(Mutex::new(session)))
    }

    async fn run_one_tick() {
        tokio::time::sleep(TICK + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_state_each_tick() {
        let (monitor, _, clock, session) = setup();
        let rx = monitor.start(session.clone()).await.unwrap();
        assert_eq!(rx.borrow().elapsed_minutes, 0);

        clock.advance(ChronoDuration::minutes(90));
        run_one_tick().await;

        let state = *rx.borrow();
        assert_eq!(state.elapsed_minutes, 90);
        assert_eq!(state.accrued_cost, dec!(75));
        assert_eq!(state.remaining_minutes, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_low_fires_once_per_warning_entry() {
        let (monitor, notifier, clock, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        clock.advance(ChronoDuration::minutes(106));
        run_one_tick().await;
        clock.advance(ChronoDuration::minutes(2));
        run_one_tick().await;
        assert_eq!(notifier.events(), vec![SessionEvent::TimeLow]);

        // Extension resets to active, the next entry fires again
        monitor.extend(&session, dec!(1)).await.unwrap();
        assert_eq!(session.lock().status, SessionStatus::Active);

        clock.advance(ChronoDuration::minutes(60));
        run_one_tick().await;
        assert_eq!(
            notifier.events(),
            vec![SessionEvent::TimeLow, SessionEvent::TimeLow]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_notification() {
        let (monitor, notifier, clock, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        clock.advance(ChronoDuration::minutes(125));
        run_one_tick().await;

        assert_eq!(notifier.events(), vec![SessionEvent::Expired]);
        assert_eq!(session.lock().status, SessionStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_conflict() {
        let (monitor, _, _, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        let err = monitor.start(session.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(monitor.active_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_publication() {
        let (monitor, _, clock, session) = setup();
        let rx = monitor.start(session.clone()).await.unwrap();
        let id = session.lock().id;

        assert!(monitor.stop(id).await);
        assert!(!monitor.stop(id).await);
        assert_eq!(monitor.active_count().await, 0);

        clock.advance(ChronoDuration::minutes(30));
        run_one_tick().await;
        assert_eq!(rx.borrow().elapsed_minutes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_stops_monitor() {
        let (monitor, _, clock, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        clock.advance(ChronoDuration::minutes(45));
        let receipt = monitor.finalize(&session).await.unwrap();

        assert_eq!(receipt.total_elapsed_minutes, 45);
        assert_eq!(monitor.active_count().await, 0);
        assert!(monitor.finalize(&session).await.unwrap_err().is_already_finalized());
    }

    #[tokio::test(start_paused = true)]
    async fn test_externally_finalized_session_unregisters() {
        let (monitor, _, clock, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        {
            let mut guard = session.lock();
            monitor.manager().finalize(&mut guard, clock.now()).unwrap();
        }
        run_one_tick().await;

        assert_eq!(monitor.active_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extension_that_stays_in_warning_notifies_again() {
        let (monitor, notifier, clock, session) = setup();
        monitor.start(session.clone()).await.unwrap();

        clock.advance(ChronoDuration::minutes(115));
        run_one_tick().await;
        assert_eq!(notifier.events(), vec![SessionEvent::TimeLow]);

        let result = monitor.extend(&session, dec!(0.1)).await.unwrap();
        assert_eq!(result.state.remaining_minutes, 11);
        assert_eq!(session.lock().status, SessionStatus::Warning);

        run_one_tick().await;
        assert_eq!(
            notifier.events(),
            vec![SessionEvent::TimeLow, SessionEvent::TimeLow]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_extension_state_is_not_overwritten_by_stale_tick() {
        let (monitor, _, clock, session) = setup();
        let rx = monitor.start(session.clone()).await.unwrap();

        clock.advance(ChronoDuration::minutes(110));
        run_one_tick().await;
        assert_eq!(rx.borrow().status, SessionStatus::Warning);

        monitor.extend(&session, dec!(1)).await.unwrap();
        assert_eq!(rx.borrow().status, SessionStatus::Active);
        assert_eq!(rx.borrow().remaining_minutes, 70);

        run_one_tick().await;
        let latest = *rx.borrow();
        let expected = monitor
            .manager()
            .current_state(&session.lock(), clock.now())
            .unwrap();
        assert_eq!(latest, expected);
        assert_eq!(latest.status, SessionStatus::Active);
    }
}
