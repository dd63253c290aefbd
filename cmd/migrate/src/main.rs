//! Applies or reverts the schema migrations shipped with the store.

use anyhow::Context;
use clap::{Parser, Subcommand};
use configs::AppConfig;
use secrecy::ExposeSecret;
use storage_adapters::migrations::{latest_version, previous_version, SCRIPTS};
use storage_adapters::PgStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "migrate", version, about = "Advert board schema migrations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every pending migration.
    Up,
    /// Revert migrations newer than `--to`; by default only the latest one.
    Down {
        #[arg(long)]
        to: Option<i64>,
    },
    /// List the known migrations.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    configs::init_tracing(&config.logging);

    if let Command::List = cli.command {
        let latest = latest_version();
        for script in SCRIPTS {
            let marker = if script.version == latest { " (latest)" } else { "" };
            println!("{} {}{marker}", script.version, script.description);
        }
        return Ok(());
    }

    let url = config
        .database
        .url
        .as_ref()
        .context("database.url is required to migrate")?;
    let store = PgStore::connect(url.expose_secret(), config.database.max_connections).await?;

    match cli.command {
        Command::Up => {
            store.migrate().await?;
            info!("schema up to date");
        }
        Command::Down { to } => {
            let target = to.unwrap_or_else(previous_version);
            store.revert_to(target).await?;
            info!(target, "schema reverted");
        }
        Command::List => {}
    }
    Ok(())
}

