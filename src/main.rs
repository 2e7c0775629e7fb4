use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use malowanko::ai::OpenRouterClient;
use malowanko::auth::jwt::JwtService;
use malowanko::cache::ImageCache;
use malowanko::config::AppConfig;
use malowanko::db;
use malowanko::routes::create_router;
use malowanko::state::AppState;

const IMAGE_CACHE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        openrouter_base_url = %config.openrouter_base_url,
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let gateway = Arc::new(OpenRouterClient::new(
        config.openrouter_base_url.clone(),
        config.openrouter_api_key.clone(),
        config.app_url.clone(),
    ));
    let jwt = JwtService::from_config(&config)?;
    let image_cache = Arc::new(ImageCache::new(IMAGE_CACHE_CAPACITY));

    let listen_addr: SocketAddr =
        format!("{}:{}", config.server_host, config.server_port).parse()?;

    let state = AppState::new(pool, config, gateway, jwt, image_cache);
    let router = create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "server listening");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
