use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use redis_clone::server::{RedisServer, ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid command line arguments");
            std::process::exit(2);
        }
    };

    let server = Arc::new(RedisServer::new(config));
    server.load_rdb().await;

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!(port = server.config.port, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(
        port = server.config.port,
        role = server.config.role.as_str(),
        "listening"
    );

    server.serve(listener).await;
}
