use axum::{routing::get, Router};
use event_bus::{EventBus, InMemoryBus, NatsBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use notifications_rs::{
    config::Config,
    db::init_pool,
    health::health,
    notifier::{LogChannel, NotificationChannel, WebhookChannel},
    routes::history::{get_count_by_type, get_document_history, get_notified, get_recipient_history},
    start_document_events_consumer,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting notifications service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}, notify_channel={}",
        config.host,
        config.port,
        config.bus_type,
        config.notify_channel
    );

    tracing::info!("Connecting to database...");
    let pool = init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(client))
        }
        _ => panic!(
            "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
            config.bus_type
        ),
    };

    let channel: Arc<dyn NotificationChannel> = match config.notify_channel.as_str() {
        "log" => Arc::new(LogChannel),
        "webhook" => {
            let url = config
                .webhook_url
                .clone()
                .expect("WEBHOOK_URL checked at config load");
            tracing::info!("Using webhook channel: {}", url);
            Arc::new(WebhookChannel::new(url))
        }
        other => panic!("Invalid NOTIFY_CHANNEL: {}. Must be 'log' or 'webhook'", other),
    };

    // Start the document events consumer
    start_document_events_consumer(bus.clone(), pool.clone(), channel).await;

    let app = Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/notifications/documents/{aggregate_id}/history",
            get(get_document_history),
        )
        .route(
            "/api/notifications/recipients/{recipient}/history",
            get(get_recipient_history),
        )
        .route("/api/notifications/events/{event_id}", get(get_notified))
        .route("/api/notifications/counts/{event_type}", get(get_count_by_type))
        .with_state(Arc::new(pool.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Notifications service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
