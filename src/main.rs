use anyhow::Context;
use project_migrate::config::Config;
use project_migrate::services::Migrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "project_migrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting legacy project migration...");
    tracing::info!("Source table: {}", config.source_table);

    let summary = match Migrator::new(config).run().await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Migration failed: {}", e);
            return Err(e).context("Migration aborted");
        }
    };

    if summary.skipped > 0 {
        tracing::warn!("{} projects were skipped", summary.skipped);
    }
    tracing::info!("Done");

    Ok(())
}
