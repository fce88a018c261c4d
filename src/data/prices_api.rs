use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};
use crate::data::types::{ItemCatalogEntry, ItemId, MarketSnapshot, PriceQuote, VolumeWindow, Window};

/// Client for the OSRS wiki real-time prices API.
pub struct PricesApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    data: HashMap<ItemId, LatestEntry>,
}

#[derive(Debug, Deserialize)]
struct LatestEntry {
    #[serde(default)]
    high: Option<i64>,
    #[serde(default)]
    low: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WindowResponse {
    #[serde(default)]
    data: HashMap<ItemId, WindowEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowEntry {
    #[serde(default)]
    low_price_volume: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    id: ItemId,
    name: String,
    #[serde(default)]
    limit: Option<i64>,
}

impl PricesApiClient {
    pub fn new(base_url: String, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from {}", url))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", endpoint))
    }

    /// Latest instant-buy/instant-sell prices per item
    pub async fn fetch_latest(&self) -> Result<HashMap<ItemId, PriceQuote>> {
        let response: LatestResponse = self.get_json("latest").await?;
        Ok(convert_latest(response))
    }

    /// Windowed trade volumes (5m, 1h or 24h)
    pub async fn fetch_window(&self, window: Window) -> Result<HashMap<ItemId, VolumeWindow>> {
        let response: WindowResponse = self.get_json(window.path()).await?;
        Ok(convert_window(response))
    }

    /// Static item catalog with names and buy limits
    pub async fn fetch_mapping(&self) -> Result<HashMap<ItemId, ItemCatalogEntry>> {
        let response: Vec<MappingEntry> = self.get_json("mapping").await?;
        Ok(convert_mapping(response))
    }

    /// Pull every payload one after another. Any failure aborts the whole snapshot.
    pub async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        let quotes = self.fetch_latest().await?;
        let volumes_5m = self.fetch_window(Window::FiveMinutes).await?;
        let volumes_1h = self.fetch_window(Window::OneHour).await?;
        let volumes_24h = self.fetch_window(Window::OneDay).await?;
        let catalog = self.fetch_mapping().await?;

        info!(
            "Fetched snapshot: {} quotes, {}/{}/{} volume entries (5m/1h/24h), {} catalog items",
            quotes.len(),
            volumes_5m.len(),
            volumes_1h.len(),
            volumes_24h.len(),
            catalog.len()
        );

        Ok(MarketSnapshot {
            catalog,
            quotes,
            volumes_5m,
            volumes_1h,
            volumes_24h,
        })
    }
}

fn convert_latest(response: LatestResponse) -> HashMap<ItemId, PriceQuote> {
    response.data
        .into_iter()
        .map(|(item_id, entry)| {
            (item_id, PriceQuote { item_id, low: entry.low, high: entry.high })
        })
        .collect()
}

fn convert_window(response: WindowResponse) -> HashMap<ItemId, VolumeWindow> {
    response.data
        .into_iter()
        .map(|(item_id, entry)| {
            (item_id, VolumeWindow { item_id, low_price_volume: entry.low_price_volume })
        })
        .collect()
}

fn convert_mapping(entries: Vec<MappingEntry>) -> HashMap<ItemId, ItemCatalogEntry> {
    entries
        .into_iter()
        .map(|entry| {
            (entry.id, ItemCatalogEntry {
                id: entry.id,
                name: entry.name,
                trade_limit: entry.limit,
            })
        })
        .collect()
}
