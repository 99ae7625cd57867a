mod config;
mod main_lib;
mod scheduler;

use std::sync::Arc;

use config::Config;
use main_lib::{build_orchestrator, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let orchestrator = Arc::new(build_orchestrator(&config)?);

    let connection = orchestrator.test_connection().await;
    tracing::info!("Provider status: {}", serde_json::to_string(&connection)?);

    tokio::select! {
        _ = scheduler::run_scheduler(orchestrator, Arc::new(config)) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown requested, stopping poller");
        }
    }
    Ok(())
}
