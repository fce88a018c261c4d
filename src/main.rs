mod app;
mod auth;
mod config;
mod data;
mod history;
mod monitoring;
mod strategies;
mod ui;

use anyhow::Result;
use app::{App, AppState};
use auth::HashedCredentials;
use config::{Config, EnvConfig};
use data::prices_api::PricesApiClient;
use history::persistence::HistoryDatabase;
use monitoring::export::CsvExporter;
use strategies::quick_flip::QuickFlipStrategy;
use tokio::io::BufReader;
use ui::console::Console;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("OSRS quick flip analyzer starting...");

    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    tracing::info!("Loading configuration from {}", config_path);
    let config = Config::load(&config_path)?;
    let env_config = EnvConfig::load()?;

    let api_url = config.prices_api_url(&env_config);
    tracing::info!("Prices API: {}", api_url);
    tracing::info!("History capacity: {}", config.system.history_capacity);
    tracing::info!("CSV export: {}", config.monitoring.csv_export);

    // Initialize database and reload previous runs
    tracing::info!("Opening history database: {}", config.system.database_path);
    let mut db = HistoryDatabase::new(&config.system.database_path)?;
    let history = db.load_history(config.system.history_capacity)?;
    tracing::info!("Stored runs: {}", db.count_runs()?);

    let exporter = config
        .monitoring
        .csv_export
        .then(|| CsvExporter::new(&config.monitoring.csv_export_path));

    let client = PricesApiClient::new(api_url, &config.api.user_agent)?;
    let verifier = HashedCredentials::new(&env_config.username, &env_config.password);

    let mut app = App::new(
        AppState::new(history),
        client,
        QuickFlipStrategy::new(config.analysis.clone()),
        db,
        exporter,
        Box::new(verifier),
    );

    let mut console = Console::new(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        &config.analysis,
    );
    console.run(&mut app).await?;

    tracing::info!("Shutting down...");
    Ok(())
}
