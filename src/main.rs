use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podium::{
    build_router, user::TokenConfig, AppState, Config, EventBus, EventDispatcher,
    ScoreAggregationHandler, Stores,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting race prediction server");

    let config = Config::from_env()?;

    let stores = match &config.database_url {
        Some(database_url) => {
            let stores = Stores::connect(database_url).await?;
            info!("Connected to PostgreSQL");
            stores
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory stores");
            Stores::in_memory()
        }
    };

    let event_bus = EventBus::new(config.event_bus_capacity);

    // Result writes re-score their race in the background
    let mut dispatcher = EventDispatcher::new(event_bus.clone())
        .with_handler_timeout(config.handler_timeout)
        .with_max_retries(config.max_retries);
    dispatcher.add_handler(Arc::new(ScoreAggregationHandler::new(Arc::new(
        stores.aggregation_job(),
    ))));
    dispatcher.start_listening().await;

    let token_config = TokenConfig::new(config.jwt_secret.clone(), config.token_expiration_days);
    let app_state = AppState::new(stores, token_config, event_bus);

    let app = build_router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Server running on http://{}:{}", config.host, config.port);
    axum::serve(listener, app).await?;

    Ok(())
}
