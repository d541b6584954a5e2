use anyhow::Context;
use gateway::{AppState, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load().context("failed to load configuration")?;
    server::init_tracing(&config.observability);

    let mut builder = AppState::builder(config.clone());
    if config.observability.metrics_enabled {
        builder = builder.prometheus(server::install_prometheus()?);
    }

    let state = builder.build().context("startup checks failed")?;
    server::serve(state).await
}
