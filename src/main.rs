use payment_highway_gateway::api::{self, AppState};
use payment_highway_gateway::config::Config;
use payment_highway_gateway::database::repository::{CardTokenRepository, OrderRepository};
use payment_highway_gateway::payments::{
    CallbackDispatcher, PaymentHighwayClient, PaymentHighwayGateway,
};

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Payment Highway gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Payment Highway: {}", config.payment_highway.service_url());
    tracing::info!("Storefront: {}", config.storefront.base_url);

    let client = PaymentHighwayClient::new(config.payment_highway.clone())?;
    let (orders, tokens, pool) = build_repositories(&config).await?;

    let gateway = PaymentHighwayGateway::new(
        config.payment_highway.clone(),
        config.storefront.clone(),
        Arc::new(client),
        orders,
        tokens,
    );

    let state = AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        dispatcher: Arc::new(CallbackDispatcher::new()),
        #[cfg(feature = "database")]
        pool,
    };
    #[cfg(not(feature = "database"))]
    let _ = pool;

    let app = api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

type Repositories = (
    Arc<dyn OrderRepository>,
    Arc<dyn CardTokenRepository>,
    Option<Pool>,
);

#[cfg(feature = "database")]
type Pool = sqlx::PgPool;
#[cfg(not(feature = "database"))]
type Pool = ();

#[cfg(feature = "database")]
async fn build_repositories(config: &Config) -> Result<Repositories, Box<dyn std::error::Error>> {
    use payment_highway_gateway::database::{
        card_token_repository::PgCardTokenRepository, init_pool,
        order_repository::PgOrderRepository, PoolConfig,
    };

    let Some(database) = &config.database else {
        tracing::warn!("DATABASE_URL not set, orders and cards are kept in memory");
        return Ok(in_memory());
    };

    let pool = init_pool(
        &database.url,
        Some(PoolConfig {
            max_connections: database.max_connections,
            min_connections: database.max_connections.min(5),
            ..Default::default()
        }),
    )
    .await?;

    Ok((
        Arc::new(PgOrderRepository::new(pool.clone())),
        Arc::new(PgCardTokenRepository::new(pool.clone())),
        Some(pool),
    ))
}

#[cfg(not(feature = "database"))]
async fn build_repositories(config: &Config) -> Result<Repositories, Box<dyn std::error::Error>> {
    if config.database.is_some() {
        tracing::warn!("Built without the database feature, ignoring DATABASE_URL");
    }
    Ok(in_memory())
}

fn in_memory() -> Repositories {
    use payment_highway_gateway::database::memory::{
        InMemoryCardTokenRepository, InMemoryOrderRepository,
    };

    (
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(InMemoryCardTokenRepository::new()),
        None,
    )
}
