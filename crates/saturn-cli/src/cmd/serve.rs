use anyhow::Context;
use saturn_server::AppState;
use std::path::Path;

pub fn run(data_dir: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config(data_dir)?;
    let port = port.unwrap_or(config.port);
    let state = AppState::open(config).context("failed to open database")?;

    tracing::info!(data_dir = %data_dir.display(), "starting Saturn");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(saturn_server::serve(state, port))
}
