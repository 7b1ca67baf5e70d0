//! Invitation Expiry Sweeper
//!
//! Periodically moves pending invitations past their deadline to `EXPIRED`.
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies pending migrations
//! - Runs `cleanup_expired_invitations` every `SWEEP_INTERVAL_SECS`
//! - Exits after one sweep when `SWEEP_RUN_ONCE=true` (for cron)
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/carpool cargo run -p carpool-invitations --features postgres --bin invitation-sweeper
//! ```

use anyhow::Context;
use carpool_core::environment::SystemClock;
use carpool_invitations::providers::ConsoleNotifier;
use carpool_invitations::stores::PostgresInvitationStore;
use carpool_invitations::{InvitationConfig, InvitationService, SweeperConfig};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpool_invitations=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SweeperConfig::from_env().context("Invalid sweeper configuration")?;
    tracing::info!(
        interval_secs = config.interval_secs,
        run_once = config.run_once,
        "Starting invitation sweeper"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PostgresInvitationStore::from_pool(pool);
    store.migrate().await.context("Failed to run migrations")?;

    // The sweeper never sends email; the notifier is only there to satisfy
    // the service's type parameters.
    let service = InvitationService::new(
        store,
        ConsoleNotifier::new(),
        SystemClock,
        InvitationConfig::default(),
    );

    if config.run_once {
        let report = service.cleanup_expired_invitations().await?;
        tracing::info!(expired = report.total(), "Sweep complete");
        return Ok(());
    }

    let mut ticker = tokio::time::interval(config.interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match service.cleanup_expired_invitations().await {
                    Ok(report) => tracing::debug!(expired = report.total(), "Sweep complete"),
                    Err(e) => tracing::error!(error = %e, "Sweep failed, retrying next tick"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down sweeper");
                return Ok(());
            }
        }
    }
}
