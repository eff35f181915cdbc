use anyhow::Context;

use docket_infra::DocketConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DocketConfig::load().context("failed to load configuration")?;
    docket_observability::init(&config.log_filter);

    let app = docket_api::app::build_app(&config)
        .await
        .context("failed to initialise document store")?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
