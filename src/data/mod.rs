pub mod prices_api;
pub mod types;

use anyhow::Result;
use types::MarketSnapshot;

/// Anything that can produce a full market snapshot for one run.
#[allow(async_fn_in_trait)]
pub trait MarketDataSource {
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot>;
}

impl MarketDataSource for prices_api::PricesApiClient {
    async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        prices_api::PricesApiClient::fetch_snapshot(self).await
    }
}
