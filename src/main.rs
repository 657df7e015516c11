use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use nearby_match::auth::JwtVerifier;
use nearby_match::config::{LoggingSettings, Settings, StoreBackend};
use nearby_match::core::ProximityService;
use nearby_match::routes::{self, nearby::AppState};
use nearby_match::services::{
    LocationStore, MatchDirectory, PostgresClient, PrivacyDirectory, SeedData,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

type Stores = (
    Arc<dyn LocationStore>,
    Arc<dyn PrivacyDirectory>,
    Arc<dyn MatchDirectory>,
);

async fn build_stores(settings: &Settings) -> std::io::Result<Stores> {
    match settings.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store; locations are not persisted");
            let seed = match &settings.store.seed_file {
                Some(path) => SeedData::load(path).map_err(|e| {
                    error!("Failed to read seed file {}: {}", path, e);
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
                })?,
                None => {
                    warn!("No store.seed_file configured; starting with no users");
                    SeedData::default()
                }
            };

            let (store, directory) = seed.into_stores().map_err(|e| {
                error!("Invalid seed data: {}", e);
                std::io::Error::new(std::io::ErrorKind::InvalidData, e)
            })?;
            let directory = Arc::new(directory);
            Ok((Arc::new(store), directory.clone(), directory))
        }
        StoreBackend::Postgres => {
            let database = settings.database.as_ref().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "store.backend = \"postgres\" requires a [database] section",
                )
            })?;

            let postgres = PostgresClient::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e)
            })?;

            info!(
                "PostgreSQL client initialized (max: {} connections)",
                database.max_connections.unwrap_or(10)
            );

            let postgres = Arc::new(postgres);
            Ok((postgres.clone(), postgres.clone(), postgres))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    init_tracing(&settings.logging);

    info!("Starting Nearby Match service...");

    let (store, privacy, matches) = build_stores(&settings).await?;

    let service = ProximityService::new(store, privacy, matches)
        .with_result_cap(settings.proximity.result_cap)
        .with_store_timeout(settings.proximity.store_timeout());

    info!(
        "Proximity service initialized (cap: {}, store timeout: {}ms, default radius: {}km)",
        settings.proximity.result_cap,
        settings.proximity.store_timeout_ms,
        settings.proximity.default_max_distance_km
    );

    let app_state = AppState {
        service,
        default_max_distance_km: settings.proximity.default_max_distance_km,
    };
    let verifier = web::Data::new(JwtVerifier::new(&settings.auth.jwt_secret));

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(verifier.clone())
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
