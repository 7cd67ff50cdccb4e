use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{io, path::PathBuf};
use tracing::info;

use pl_stats_etl::{
    blob_store::ObjectStorePublisher,
    collector::Collector,
    config::EtlConfig,
    database::DatabasePublisher,
    datasets::select_rules,
    export::{write_csv, write_csv_file},
    pipeline::Pipeline,
};

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Parser)]
#[command(author, version, about = "Scrape Premier League statistics and load them into blob storage and Postgres", long_about = None)]
struct Cli {
    /// Only process the named dataset (repeatable)
    #[arg(short, long = "dataset", global = true)]
    datasets: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect every dataset and publish to blob storage and the database
    Run,
    /// Collect only; print a preview or write CSV files
    Scrape {
        /// Directory for one CSV file per dataset
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Collect and publish to blob storage only
    UploadBlob,
    /// Collect and publish to the database only
    UploadDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = EtlConfig::from_env()?;
    let rules = select_rules(&cli.datasets)?;
    let collector = Collector::new(&config.scraping, config.sources.clone())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Scrape { csv_dir } => {
            let datasets = collector.collect_all(&rules).await?;
            for dataset in &datasets {
                match &csv_dir {
                    Some(dir) => {
                        let path = write_csv_file(dataset, dir)?;
                        info!("Wrote {} rows to {:?}", dataset.len(), path);
                    }
                    None => {
                        println!("\n{} ({} rows)", dataset.name, dataset.len());
                        write_csv(dataset, io::stdout(), Some(PREVIEW_ROWS))?;
                    }
                }
            }
        }
        Commands::UploadBlob => {
            let pipeline = Pipeline::new(collector)
                .with_publisher(Box::new(ObjectStorePublisher::from_config(&config.storage)?));
            pipeline.run(&rules).await?;
        }
        Commands::UploadDb => {
            let pipeline = Pipeline::new(collector)
                .with_publisher(Box::new(DatabasePublisher::connect(&config.database).await?));
            pipeline.run(&rules).await?;
        }
        Commands::Run => {
            let pipeline = Pipeline::new(collector)
                .with_publisher(Box::new(ObjectStorePublisher::from_config(&config.storage)?))
                .with_publisher(Box::new(DatabasePublisher::connect(&config.database).await?));
            pipeline.run(&rules).await?;
        }
    }

    Ok(())
}
