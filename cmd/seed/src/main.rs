//! Loads the starting categories into the configured Postgres database.

use std::sync::Arc;

use anyhow::Context;
use configs::AppConfig;
use secrecy::ExposeSecret;
use services::CategorySeeder;
use storage_adapters::PgStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    configs::init_tracing(&config.logging);

    let url = config
        .database
        .url
        .as_ref()
        .context("database.url is required to seed")?;
    let store = Arc::new(PgStore::connect(url.expose_secret(), config.database.max_connections).await?);
    store.migrate().await?;

    let ids = CategorySeeder::new(store).seed().await?;
    info!(count = ids.len(), "seeding finished");
    Ok(())
}
