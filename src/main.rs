use std::sync::Arc;

use poem::listener::TcpListener;
use poem::EndpointExt;
use poem_openapi::OpenApiService;

use space_broker::api::{BookingsApi, HealthApi, InquiriesApi, OffersApi};
use space_broker::business::OfferWorkflowCoordinator;
use space_broker::clock::SystemClock;
use space_broker::config::{Config, LogFormat};
use space_broker::logging;
use space_broker::observability::{init_structured_logging, RequestTracingMiddleware};
use space_broker::storage::{LogNotifier, MemoryStore, StaticCatalog};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    match config.log_format {
        LogFormat::Json => init_structured_logging(),
        LogFormat::Pretty => logging::init(),
    }

    // Initialize catalog
    let catalog = match config.catalog_path {
        Some(ref path) => StaticCatalog::from_json_file(path)?,
        None => {
            tracing::warn!("CATALOG_PATH not set, starting with an empty catalog");
            StaticCatalog::default()
        }
    };
    tracing::info!(
        spaces = catalog.space_count(),
        services = catalog.service_count(),
        "Catalog loaded"
    );

    // Initialize workflow coordinator
    let coordinator = Arc::new(
        OfferWorkflowCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(catalog),
            Arc::new(LogNotifier),
            Arc::new(SystemClock),
        )
        .with_defaults(config.offer_defaults()),
    );

    // Initialize APIs
    let health_api = HealthApi;
    let inquiries_api = InquiriesApi::new(coordinator.clone());
    let offers_api = OffersApi::new(coordinator.clone());
    let bookings_api = BookingsApi::new(coordinator);

    let api_service = OpenApiService::new(
        (health_api, inquiries_api, offers_api, bookings_api),
        "Space Broker API",
        "1.0",
    )
    .server(format!("http://localhost:{}", config.port));

    let ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint();

    let app = poem::Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .nest("/spec", spec)
        .with(RequestTracingMiddleware);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting Space Broker server on {}", addr);

    poem::Server::new(TcpListener::bind(&addr))
        .run(app)
        .await?;

    Ok(())
}
