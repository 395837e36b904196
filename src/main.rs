use football_proxy::api::football_data::FootballDataApi;
use football_proxy::services::sweeper::spawn_sweeper;
use football_proxy::utils::clock::SystemClock;
use football_proxy::{build_router, AppState, Config, ProxyService, ResponseCache};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("football_proxy=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Refusing to start: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Loaded {:?}", config);

    info!("Starting football-data proxy for {}", config.upstream_base_url);

    let api = FootballDataApi::new(
        &config.upstream_base_url,
        &config.api_key,
        config.upstream_timeout,
    )?;
    let cache = Arc::new(ResponseCache::new(Arc::new(SystemClock)));
    let proxy = Arc::new(ProxyService::new(
        Arc::new(api),
        cache.clone(),
        config.status_policy,
    ));

    let sweeper = spawn_sweeper(cache, config.sweep_interval);
    let router = build_router(AppState { proxy });

    let addr = SocketAddr::new(config.host, config.port);
    let served = football_proxy::server::serve(addr, router).await;
    sweeper.abort();
    served?;

    info!("Shutting down");
    Ok(())
}
