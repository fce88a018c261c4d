use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

pub const DEFAULT_PRICES_API_URL: &str = "https://prices.runescape.wiki/api/v1/osrs";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub database_path: String,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_min_volume")]
    pub default_min_volume_24h: u64,
    #[serde(default = "default_cash_millions")]
    pub default_cash_millions: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_sell_tax_rate")]
    pub sell_tax_rate: f64,
    /// Drop candidates whose total profit is below this value. Unset keeps
    /// negative-profit items in the ranking.
    #[serde(default)]
    pub min_profit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_export: bool,
    #[serde(default = "default_csv_export_path")]
    pub csv_export_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_min_volume_24h: default_min_volume(),
            default_cash_millions: default_cash_millions(),
            max_results: default_max_results(),
            sell_tax_rate: default_sell_tax_rate(),
            min_profit: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_export: false,
            csv_export_path: default_csv_export_path(),
        }
    }
}

fn default_history_capacity() -> usize { 3 }
fn default_base_url() -> String { DEFAULT_PRICES_API_URL.to_string() }
fn default_user_agent() -> String { "osrs-flip-analyzer/0.1 (quick flip ranking)".to_string() }
fn default_min_volume() -> u64 { 90_000 }
fn default_cash_millions() -> f64 { 10.0 }
fn default_max_results() -> usize { 50 }
fn default_sell_tax_rate() -> f64 { 0.01 }
fn default_csv_export_path() -> String { "analysis_history.csv".to_string() }

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub username: String,
    pub password: String,
    pub prices_api_url: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;

        if config.system.history_capacity == 0 {
            anyhow::bail!("system.history_capacity must be at least 1");
        }
        if config.analysis.max_results == 0 {
            anyhow::bail!("analysis.max_results must be at least 1");
        }
        if !(0.0..1.0).contains(&config.analysis.sell_tax_rate) {
            anyhow::bail!(
                "analysis.sell_tax_rate must be in [0, 1), got {}",
                config.analysis.sell_tax_rate
            );
        }

        Ok(config)
    }

    /// Base URL for the prices API, honouring the environment override.
    pub fn prices_api_url(&self, env: &EnvConfig) -> String {
        env.prices_api_url
            .clone()
            .unwrap_or_else(|| self.api.base_url.clone())
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            username: std::env::var("FLIP_USERNAME")
                .context("FLIP_USERNAME not set")?,
            password: std::env::var("FLIP_PASSWORD")
                .context("FLIP_PASSWORD not set")?,
            prices_api_url: std::env::var("PRICES_API_URL").ok(),
        })
    }
}
