use tracing_subscriber::{fmt, EnvFilter};

use puddle_market::api;
use puddle_market::config::Config;
use puddle_market::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load()?;
    let state = AppState::initialize(config).await?;

    api::serve(state).await
}
