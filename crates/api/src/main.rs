mod response;
mod routes;
mod state;

use axum::{
    routing::{get, post},
    Json, Router,
};
use clinic_bus::{EventBus, InMemoryBus, RedisBus, BOOKING_CHANNEL};
use clinic_core::store::{
    BookingStore, MemoryBookingStore, MemoryQuotaStore, MemoryStateStore, PgBookingStore,
    PgQuotaStore, PgStateStore, QuotaStore, StateStore,
};
use clinic_core::{shutdown_channel, Catalog, Components, PgCatalog, Settings, StaticCatalog};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Booking API",
        description = "Event-driven medical-clinic appointment booking"
    ),
    components(schemas(
        clinic_types::api::CreateBookingRequest,
        clinic_types::api::BookingAcceptedResponse,
        clinic_types::api::TransactionStatusResponse,
        clinic_types::api::ServiceResponse,
        clinic_types::api::ServicesResponse,
        clinic_types::events::BookingEvent,
        clinic_types::events::BookingData,
        clinic_types::enums::EventType,
        clinic_types::enums::Gender,
        clinic_types::enums::ServiceAudience,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting clinic booking API gateway...");

    // Get configuration from environment
    let port = std::env::var("API_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;

    let frontend_url = std::env::var("FRONTEND_URL")
        .unwrap_or_else(|_| "http://localhost:5173".to_string());

    let storage = std::env::var("STORAGE").unwrap_or_else(|_| "memory".to_string());
    let bus_kind = std::env::var("EVENT_BUS").unwrap_or_else(|_| "memory".to_string());
    let settings = Settings::from_env();

    // Storage capabilities
    let catalog: Arc<dyn Catalog>;
    let state_store: Arc<dyn StateStore>;
    let booking_store: Arc<dyn BookingStore>;
    let quota_store: Arc<dyn QuotaStore>;

    if storage == "postgres" {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when STORAGE=postgres");
        let pool = clinic_db::create_pool(&database_url).await?;
        clinic_db::run_migrations(&pool).await?;

        tracing::info!("✓ Database connection established");

        catalog = Arc::new(PgCatalog::new(pool.clone()));
        state_store = Arc::new(PgStateStore::new(pool.clone()));
        booking_store = Arc::new(PgBookingStore::new(pool.clone()));
        quota_store = Arc::new(PgQuotaStore::new(pool));
    } else {
        catalog = Arc::new(StaticCatalog::clinic_defaults());
        state_store = Arc::new(MemoryStateStore::new());
        booking_store = Arc::new(MemoryBookingStore::new());
        quota_store = Arc::new(MemoryQuotaStore::new());
    }

    // Event bus
    let bus: Arc<dyn EventBus> = if bus_kind == "redis" {
        let redis_url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let redis_bus = RedisBus::connect(&redis_url, BOOKING_CHANNEL).await?;

        tracing::info!("✓ Connected to Redis event bus");

        if storage != "postgres" {
            tracing::warn!(
                "EVENT_BUS=redis with STORAGE=memory: the workers cannot share \
                 this process's stores, so the status endpoint will see nothing"
            );
        }

        Arc::new(redis_bus)
    } else {
        Arc::new(InMemoryBus::new())
    };

    // Single-binary mode: with the in-memory bus the four booking
    // components run inside this process. On Redis they live in
    // clinic-workers instead.
    let mut _components_guard: Option<watch::Sender<bool>> = None;
    if bus_kind != "redis" {
        let components = Components::new(
            catalog.clone(),
            quota_store,
            state_store.clone(),
            booking_store,
            settings,
        );

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        components.spawn(bus.clone(), shutdown_rx).await?;
        _components_guard = Some(shutdown_tx);

        tracing::info!("✓ Booking components running in-process");
    }

    // Create app state
    let app_state = AppState {
        bus,
        state_store,
        catalog,
    };

    // Build application router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/bookings", post(routes::bookings::create_booking))
        .route(
            "/api/v1/bookings/:transaction_id/status",
            get(routes::bookings::get_status),
        )
        .route("/api/v1/services", get(routes::services::list_services))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_url.parse::<axum::http::HeaderValue>()?)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("✓ Server listening on {}", addr);
    tracing::info!("📡 API ready at http://{}:{}/api/v1", addr.ip(), port);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
