use anyhow::Context;
use flight_origins::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config)?;

    let state = AppState::new(config.clone()).context("failed to assemble lookup pipeline")?;

    Server::new(config).serve(state).await?;

    Ok(())
}
