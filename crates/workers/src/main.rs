mod jobs;

use clinic_bus::{EventBus, RedisBus, BOOKING_CHANNEL};
use clinic_core::store::{PgBookingStore, PgQuotaStore, PgStateStore, StateStore};
use clinic_core::{shutdown_channel, Components, PgCatalog, Settings};
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_workers=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting clinic booking workers...");

    // Initialize database pool
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");
    let pool = clinic_db::create_pool(&database_url).await?;
    clinic_db::run_migrations(&pool).await?;

    tracing::info!("✓ Database connection established");

    // Connect to the event bus
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let bus: Arc<dyn EventBus> = Arc::new(RedisBus::connect(&redis_url, BOOKING_CHANNEL).await?);

    tracing::info!("✓ Connected to Redis event bus");

    let settings = Settings::from_env();
    let state_store: Arc<dyn StateStore> = Arc::new(PgStateStore::new(pool.clone()));

    // Spawn the four booking components
    let components = Components::new(
        Arc::new(PgCatalog::new(pool.clone())),
        Arc::new(PgQuotaStore::new(pool.clone())),
        state_store.clone(),
        Arc::new(PgBookingStore::new(pool)),
        settings,
    );

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    components.spawn(bus.clone(), shutdown_rx).await?;

    tracing::info!("✓ Booking components running");

    let watchdog_timeout = Duration::from_secs(
        std::env::var("WATCHDOG_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
    );

    // Run the watchdog once and exit if --run-watchdog is present
    let args: Vec<String> = std::env::args().collect();
    if args.contains(&"--run-watchdog".to_string()) {
        tracing::info!("Running stale-transaction watchdog immediately...");
        if let Err(e) = jobs::fail_stale_transactions(&state_store, &bus, watchdog_timeout).await {
            tracing::error!("Watchdog failed: {}", e);
        } else {
            tracing::info!("✓ Watchdog completed");
        }
        shutdown_tx.send(true).ok();
        return Ok(());
    }

    // Initialize job scheduler
    let scheduler = JobScheduler::new().await?;

    // Job: fail stale transactions (every 1 minute)
    let state_clone = state_store.clone();
    let bus_clone = bus.clone();
    let watchdog_job = Job::new_async("0 * * * * *", move |_uuid, _l| {
        let state = state_clone.clone();
        let bus = bus_clone.clone();
        Box::pin(async move {
            tracing::debug!("Running fail_stale_transactions job");
            if let Err(e) = jobs::fail_stale_transactions(&state, &bus, watchdog_timeout).await {
                tracing::error!("fail_stale_transactions job failed: {}", e);
            }
        })
    })?;

    scheduler.add(watchdog_job).await?;

    tracing::info!("✓ Registered job: fail_stale_transactions (every 1 minute)");

    // Start scheduler
    scheduler.start().await?;

    tracing::info!("✓ Job scheduler started");
    tracing::info!("📡 Workers running");

    // Keep the process running
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
    }
}
