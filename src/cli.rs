use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use finpano::datatypes::FundType;
use finpano::memory_handler::InMemoryDB;
use finpano::providers::evds::EvdsSeries;
use finpano::postgres::PostgresDB;
use finpano::providers::yahoo::Yahoo;
use finpano::providers::{build_http_client, MarketQuoteProvider};
use finpano::scheduler::Scheduler;
use finpano::server::{self, AppState};
use finpano::sync::SyncJobs;
use finpano::{Config, DataHandler};

#[derive(Parser)]
#[command(name = "finpano")]
#[command(about = "Turkish and global financial data service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and the background jobs
    Serve {
        /// Don't start the scheduled jobs
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Run one ingest job and print its report
    Sync {
        #[arg(value_enum)]
        target: SyncTarget,
    },
    /// Create the database tables
    InitDb {
        /// Drop existing tables first
        #[arg(long)]
        clean: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SyncTarget {
    Market,
    Dashboard,
    Bist,
    Tcmb,
    Evds,
    Fred,
    Tefas,
    Tuik,
    Scraper,
    All,
}

type CliResult = Result<(), Box<dyn Error>>;

async fn open_store(config: &Config) -> Result<Arc<dyn DataHandler>, sqlx::Error> {
    match &config.database.url {
        Some(url) => {
            let db = PostgresDB::new(url, config.database.max_connections).await?;
            db.init().await?;
            info!("connected to PostgreSQL");
            Ok(Arc::new(db))
        }
        None => {
            warn!("DATABASE_URL not set, data is kept in memory only");
            Ok(Arc::new(InMemoryDB::new()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn sync(jobs: &SyncJobs, target: SyncTarget) -> CliResult {
    match target {
        SyncTarget::Market => {
            for asset_type in ["bist", "crypto", "metal", "currency"] {
                let report = jobs.market.fetch_assets(asset_type.parse()?, None).await?;
                print_json(&report)?;
            }
        }
        SyncTarget::Dashboard => print_json(&jobs.market.fetch_dashboard().await?)?,
        SyncTarget::Bist => print_json(&jobs.market.fetch_bist_indices(None).await?)?,
        SyncTarget::Tcmb => print_json(&jobs.macro_data.sync_tcmb().await?)?,
        SyncTarget::Evds => {
            print_json(&jobs.macro_data.sync_evds(&EvdsSeries::ALL, None, None).await?)?
        }
        SyncTarget::Fred => print_json(&jobs.macro_data.sync_fred_all().await?)?,
        SyncTarget::Tefas => {
            print_json(&jobs.funds.sync_tefas(None, FundType::default()).await?)?
        }
        SyncTarget::Tuik => {
            print_json(&jobs.macro_data.sync_tuik_inflation().await?)?;
            print_json(&jobs.macro_data.sync_tuik_unemployment().await?)?;
        }
        SyncTarget::Scraper => print_json(&jobs.scraper.run().await?)?,
        SyncTarget::All => print_json(&jobs.sync_all().await)?,
    }
    Ok(())
}

pub async fn run(cli: Cli, config: Config) -> CliResult {
    if let Commands::InitDb { clean } = cli.command {
        let url = config
            .database
            .url
            .as_deref()
            .ok_or("DATABASE_URL is required to initialize the database")?;
        let db = PostgresDB::new(url, config.database.max_connections).await?;
        if clean {
            db.clean().await?;
        } else {
            db.init().await?;
        }
        info!("database initialized");
        return Ok(());
    }

    let db = open_store(&config).await?;
    let client = build_http_client(config.http.timeout)?;
    let yahoo: Arc<dyn MarketQuoteProvider> =
        Arc::new(Yahoo::with_base_url(client.clone(), &config.providers.yahoo));

    match cli.command {
        Commands::Serve { no_scheduler } => {
            let state = AppState::new(&config, db, yahoo, client);
            if config.scheduler.enabled && !no_scheduler {
                let scheduler = Scheduler::new(
                    state.jobs.clone(),
                    state.alerts.clone(),
                    config.scheduler.alert_check_interval,
                );
                scheduler.spawn();
                info!("scheduled jobs started");
            }
            server::serve(&config, state).await?;
        }
        Commands::Sync { target } => {
            let jobs = SyncJobs::new(&config, db, yahoo, client);
            sync(&jobs, target).await?;
        }
        Commands::InitDb { .. } => {}
    }
    Ok(())
}
