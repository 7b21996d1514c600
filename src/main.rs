use clap::Parser;
use openimmo_import::config::ImportConfig;
use openimmo_import::import::Importer;
use openimmo_import::store::{JsonFileStore, LogMailer, MemoryCountryTable, NoopRenderCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "openimmo-import", about = "Import OpenImmo ZIP archives")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "openimmo-import.toml")]
    config: PathBuf,

    /// Directory the persisted JSON records are written to
    #[arg(long, default_value = "records")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = ImportConfig::load(&cli.config)?;

    info!("Importing OpenImmo archives from {}", config.import_folder.display());

    let store = Arc::new(JsonFileStore::new(
        cli.data_dir,
        config.required_fields.clone(),
    ));
    let countries = Arc::new(MemoryCountryTable::new(config.countries.clone()));

    let importer = Importer::new(
        config,
        store,
        countries,
        Arc::new(LogMailer),
        Arc::new(NoopRenderCache),
    );

    let log = tokio::task::spawn_blocking(move || importer.import_from_zip()).await?;
    print!("{}", log);

    Ok(())
}
