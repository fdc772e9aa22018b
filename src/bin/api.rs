use research_report_orchestrator::{agent::Orchestrator, api::start_server, config::AppConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    if config.report_api_base_url.is_none() {
        warn!("REPORT_API_BASE_URL not set - every source will fail until it is configured");
    }

    info!("🚀 Research Report Orchestrator - API Server");
    info!("📍 Port: {}", config.port);

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, config.port).await?;

    Ok(())
}
