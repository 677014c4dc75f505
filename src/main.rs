//! ParkApp
//!
//! Restores the logged-in identity and dispatches on its role: drivers get a
//! monitored parking session that runs until Ctrl-C, operators get an
//! occupancy report read from the shared occupancy ledger.

use anyhow::{Context, Result};
use park_cache::{IdentityStore, OccupancyLedger};
use park_core::config::LoggingConfig;
use park_core::models::{NewSession, OccupancySnapshot, Role, User};
use park_core::{AppConfig, SystemClock};
use park_services::{AuthService, BillingPolicy, SessionManager, SessionMonitor, TracingNotifier};
use parking_lot::Mutex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_PLATE: &str = "PARK-001";

/// Initialize tracing/logging
fn init_tracing(config: &LoggingConfig) {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| config.level.clone());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "parkapp={},park_core={},park_cache={},park_services={}",
            log_level, log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.json.then(|| fmt::layer().json().with_target(true)))
        .with((!config.json).then(|| fmt::layer().with_target(true).with_line_number(true)))
        .init();
}

fn decimal(value: f64, name: &str) -> Result<Decimal> {
    Decimal::from_f64(value).with_context(|| format!("{} is not a valid amount: {}", name, value))
}

/// Role for a first login, from `PARKAPP_LOGIN_ROLE`
fn login_role() -> Role {
    env::var("PARKAPP_LOGIN_ROLE")
        .ok()
        .and_then(|role| Role::from_str(&role))
        .unwrap_or_default()
}

/// Identity used when nothing is stored yet
fn default_user(config: &AppConfig, role: Role) -> User {
    let mut user = match role {
        Role::Admin => User::new("operator@parkapp.local", "Operator", role),
        Role::User => User::new("driver@parkapp.local", "Driver", role),
    };
    user.vehicle_plate = config.session.vehicle_plate.clone();
    user
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting ParkApp v{}", env!("CARGO_PKG_VERSION"));

    let storage = park_cache::connect(&config.storage)
        .await
        .context("Failed to open storage")?;
    let auth = AuthService::new(IdentityStore::new(storage.clone()));
    let ledger = OccupancyLedger::new(storage);

    let user = match auth.restore().await? {
        Some(user) => user,
        None => {
            let user = default_user(&config, login_role());
            auth.login(user.clone()).await?;
            user
        }
    };

    let policy = BillingPolicy::from_config(&config.billing)?;
    let manager = Arc::new(SessionManager::new(SystemClock, policy));
    let monitor = SessionMonitor::new(
        manager.clone(),
        Arc::new(TracingNotifier),
        Duration::from_millis(config.billing.tick_interval_ms),
    );

    match user.role {
        Role::Admin => report_occupancy(&config, &ledger).await.map(|_| ()),
        Role::User => run_driver(&config, &user, &manager, &monitor, &ledger).await,
    }
}

/// Log the occupancy of the lot as recorded by parked drivers
async fn report_occupancy(
    config: &AppConfig,
    ledger: &OccupancyLedger,
) -> Result<OccupancySnapshot> {
    let snapshot = ledger
        .snapshot(config.lot.capacity)
        .await
        .context("Failed to read occupancy ledger")?;

    info!(
        "Lot capacity {}: {} occupied, {} free ({})",
        snapshot.capacity(),
        snapshot.occupied,
        snapshot.free,
        snapshot
    );
    Ok(snapshot)
}

async fn run_driver(
    config: &AppConfig,
    user: &User,
    manager: &SessionManager<SystemClock>,
    monitor: &SessionMonitor<SystemClock>,
    ledger: &OccupancyLedger,
) -> Result<()> {
    let plate = user
        .vehicle_plate
        .clone()
        .unwrap_or_else(|| DEFAULT_PLATE.to_string());

    let session = manager.create_session(NewSession {
        vehicle_plate: plate,
        location_id: config.session.location_id.clone(),
        hourly_rate: decimal(config.session.hourly_rate, "session.hourly_rate")?,
        time_limit_hours: decimal(config.session.time_limit_hours, "session.time_limit_hours")?,
        user_balance: decimal(config.session.initial_balance, "session.initial_balance")?,
    })?;
    info!(
        "Parking {} at {} until {}",
        session.vehicle_plate,
        session.location_id,
        session.expires_at()
    );

    let session_id = session.id;
    let session = Arc::new(Mutex::new(session));
    let mut state_rx = monitor.start(session.clone()).await?;
    ledger.occupy(session_id).await?;
    let mut last_minute = None;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    warn!("Session monitor stopped unexpectedly");
                    break;
                }
                let state = *state_rx.borrow_and_update();
                if last_minute != Some(state.remaining_minutes) {
                    last_minute = Some(state.remaining_minutes);
                    info!(
                        "{} remaining | {} elapsed | ${} | {}",
                        state.remaining_display(),
                        state.elapsed_display(),
                        state.accrued_cost,
                        state.status
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, finalizing session");
                break;
            }
        }
    }

    let receipt = monitor.finalize(&session).await?;
    ledger.release(session_id).await?;
    info!("Parking finalized. {}", receipt.summary());

    Ok(())
}
