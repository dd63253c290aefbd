//! # advert-board
//!
//! Assembles the board from configuration and serves it. With
//! `database.url` set the Postgres store is used; otherwise everything lives
//! in memory and the starting categories are seeded on boot.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{build_router, AppState, BoardMetrics, ListingSettings};
use auth_adapters::{hash_password, BasicAuthenticator, RoleAccessControl, UserAccount};
use clap::{Parser, Subcommand};
use configs::{AppConfig, AuthConfig};
use domains::validation::Antiflood;
use domains::{
    AdvertRepository, ApplicationRepository, CategoryRepository, Role, SystemClock, UnitOfWork,
};
use services::{
    AdvertService, ApplicationMailer, ApplicationService, CategorySeeder, MailSettings, Ports,
};
use storage_adapters::{DashMapSubmissionLog, InMemoryStore, TracingMailTransport};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "advert-board", version, about = "Job advertisement board")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default).
    Serve,
    /// Print an Argon2 hash to paste into `auth.users[].password_hash`.
    HashPassword { password: String },
}

/// The four storage ports, backed by one store.
struct Stores {
    adverts: Arc<dyn AdvertRepository>,
    applications: Arc<dyn ApplicationRepository>,
    categories: Arc<dyn CategoryRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl Stores {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AdvertRepository + ApplicationRepository + CategoryRepository + UnitOfWork + 'static,
    {
        Self {
            adverts: store.clone(),
            applications: store.clone(),
            categories: store.clone(),
            unit_of_work: store,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
        Command::Serve => serve().await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    configs::init_tracing(&config.logging);

    let stores = open_stores(&config).await?;
    let antiflood = Antiflood::from_secs(config.antiflood.cooldown_secs);
    let ports = Ports {
        adverts: stores.adverts,
        applications: stores.applications,
        categories: stores.categories,
        unit_of_work: stores.unit_of_work,
        submissions: Arc::new(DashMapSubmissionLog::with_retention(antiflood.cooldown())),
        access: Arc::new(RoleAccessControl),
        clock: Arc::new(SystemClock),
    };

    let mailer = ApplicationMailer::new(
        Arc::new(TracingMailTransport),
        MailSettings {
            sender: config.mailer.sender.clone(),
            recipient: config.mailer.recipient.clone(),
        },
    );

    let authenticator = BasicAuthenticator::new(accounts(&config.auth)?);
    if authenticator.user_count() == 0 {
        warn!("no users configured, author pages will refuse every login");
    }

    let state = AppState {
        adverts: AdvertService::new(ports.clone(), antiflood),
        applications: ApplicationService::new(ports, mailer, antiflood),
        authenticator: Arc::new(authenticator),
        metrics: Arc::new(BoardMetrics::new()),
        listing: ListingSettings {
            per_page: config.listing.per_page,
            menu_limit: config.listing.menu_limit,
        },
    };

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "advert board listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("advert board stopped");
    Ok(())
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    #[cfg(feature = "db-postgres")]
    {
        use secrecy::ExposeSecret;

        if let Some(url) = &config.database.url {
            let store = storage_adapters::PgStore::connect(
                url.expose_secret(),
                config.database.max_connections,
            )
            .await?;
            if config.database.run_migrations {
                store.migrate().await?;
                info!("migrations applied");
            }
            return Ok(Stores::from_store(Arc::new(store)));
        }
    }

    #[cfg(not(feature = "db-postgres"))]
    {
        if config.database.url.is_some() {
            warn!("database.url ignored, built without db-postgres");
        }
    }

    let store = Arc::new(InMemoryStore::new());
    CategorySeeder::new(store.clone()).seed().await?;
    info!("using the in-memory store, data is lost on exit");
    Ok(Stores::from_store(store))
}

fn accounts(config: &AuthConfig) -> anyhow::Result<Vec<UserAccount>> {
    config
        .users
        .iter()
        .map(|user| {
            let roles = user
                .roles
                .iter()
                .map(|role| role.parse::<Role>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("roles of user {}", user.name))?;
            Ok(UserAccount {
                name: user.name.clone(),
                password_hash: user.password_hash.clone(),
                roles,
            })
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
