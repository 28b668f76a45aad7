//! Bankcore service binary.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankcore_server::{Bank, BankConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BankConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting bankd");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let bank = Bank::with_postgres(&config, pool.clone())?;

    info!(
        token_maker = %config.token.maker,
        max_connections = config.max_connections,
        max_retries = config.transfer.max_retries,
        "Bank running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    bank.stop();
    pool.close().await;

    info!("bankd shutdown complete");
    Ok(())
}
