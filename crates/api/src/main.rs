use std::sync::Arc;

use anyhow::Context;

use aeroclub_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aeroclub_observability::init();

    let config = AppConfig::from_env()?;
    let services = Arc::new(aeroclub_api::app::services::build_services(&config)?);
    let app = aeroclub_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
