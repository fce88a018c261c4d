use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ItemId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCatalogEntry {
    pub id: ItemId,
    pub name: String,
    /// Buy limit per rolling window. `None` means unbounded.
    pub trade_limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub item_id: ItemId,
    /// Instant-buy price (what we pay)
    pub low: Option<i64>,
    /// Instant-sell price (what we receive)
    pub high: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeWindow {
    pub item_id: ItemId,
    pub low_price_volume: Option<i64>,
}

/// Aggregation window exposed by the prices API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    FiveMinutes,
    OneHour,
    OneDay,
}

impl Window {
    pub fn path(&self) -> &'static str {
        match self {
            Window::FiveMinutes => "5m",
            Window::OneHour => "1h",
            Window::OneDay => "24h",
        }
    }
}

/// One point-in-time pull of everything the ranker needs.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub catalog: HashMap<ItemId, ItemCatalogEntry>,
    pub quotes: HashMap<ItemId, PriceQuote>,
    pub volumes_5m: HashMap<ItemId, VolumeWindow>,
    pub volumes_1h: HashMap<ItemId, VolumeWindow>,
    pub volumes_24h: HashMap<ItemId, VolumeWindow>,
}

