use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;

use carhub_api::app::{self, services};
use carhub_api::config::{self, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    carhub_observability::init(config::log_format_from_env());

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting car rental server");

    let services = Arc::new(
        services::build_services(&config.store)
            .await
            .context("failed to connect to the document store")?,
    );
    let verifier = services::build_verifier(&config.auth);

    let app = app::build_app(services.clone(), verifier);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    let served = app::serve(listener, app).await;
    services.shutdown().await;
    served.context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}
