use std::sync::Arc;

use checkout_engine::application::checkout_service::CheckoutService;
use checkout_engine::application::provider_registry::ProviderRegistry;
use checkout_engine::application::providers::FlatRateTax;
use checkout_engine::config::Config;
use checkout_engine::inbound::http::{HttpServer, HttpServerConfig};
use checkout_store::{build_store, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let store: Store = build_store(config.database_url.as_deref()).await?;
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let tax = Arc::new(FlatRateTax::new(config.tax_rate_bps));
    let service = CheckoutService::new(
        store,
        registry,
        tax,
        config.quote_ttl(),
        config.settle_timeout(),
    );

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(service, server_cfg).await?;
    http.run().await
}
