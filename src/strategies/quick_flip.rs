use crate::config::AnalysisConfig;
use crate::data::types::{ItemId, MarketSnapshot};
use crate::strategies::types::{AnalysisParams, Candidate, RunId};
use tracing::{debug, info};

pub const UNKNOWN_ITEM_NAME: &str = "Unknown";

/// Ranks instant buy/sell spreads by `profit * 24h volume`.
pub struct QuickFlipStrategy {
    config: AnalysisConfig,
}

/// Per-gate counts for one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankStats {
    pub considered: usize,
    pub missing_window: usize,
    pub missing_price: usize,
    pub low_volume: usize,
    pub unaffordable: usize,
    pub below_min_profit: usize,
    pub passed: usize,
}

impl QuickFlipStrategy {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Rank every quoted item and keep the best `max_results`.
    ///
    /// Items are dropped silently when they are missing from any volume
    /// window, have no buy/sell price or 24h volume, trade too thinly, or
    /// cannot be afforded. Profit sign is not filtered unless `min_profit`
    /// is configured.
    pub fn rank(
        &self,
        params: &AnalysisParams,
        snapshot: &MarketSnapshot,
        run_id: RunId,
    ) -> (Vec<Candidate>, RankStats) {
        let mut stats = RankStats::default();
        let mut candidates = Vec::new();

        for (item_id, quote) in &snapshot.quotes {
            stats.considered += 1;

            // 5m and 1h are existence gates only
            let volume_24h = match (
                snapshot.volumes_24h.get(item_id),
                snapshot.volumes_1h.contains_key(item_id),
                snapshot.volumes_5m.contains_key(item_id),
            ) {
                (Some(window), true, true) => window.low_price_volume,
                _ => {
                    stats.missing_window += 1;
                    continue;
                }
            };

            let (low, high, volume_24h) = match (quote.low, quote.high, volume_24h) {
                (Some(low), Some(high), Some(volume)) if low > 0 && high > 0 && volume > 0 => {
                    (low, high, volume)
                }
                _ => {
                    stats.missing_price += 1;
                    continue;
                }
            };

            if volume_24h as u64 <= params.min_volume_24h {
                stats.low_volume += 1;
                continue;
            }

            let margin = profit_margin(high, low, self.config.sell_tax_rate);
            let trade_limit = snapshot.catalog.get(item_id).and_then(|e| e.trade_limit);
            let max_qty = max_affordable_qty(params.cash, low, trade_limit);

            if max_qty <= 0 {
                stats.unaffordable += 1;
                continue;
            }

            let profit = margin.saturating_mul(max_qty);
            if let Some(min_profit) = self.config.min_profit {
                if profit < min_profit {
                    stats.below_min_profit += 1;
                    continue;
                }
            }

            stats.passed += 1;
            candidates.push(Candidate {
                name: resolve_name(snapshot, quote.item_id),
                recommended_buy_price: low,
                recommended_sell_price: high,
                profit,
                max_affordable_qty: max_qty,
                profit_times_volume: profit.saturating_mul(volume_24h),
                run_id,
            });

            debug!(
                "Item {} passed: margin={} qty={} profit={}",
                item_id, margin, max_qty, profit
            );
        }

        candidates.sort_by(|a, b| b.profit_times_volume.cmp(&a.profit_times_volume));
        candidates.truncate(self.config.max_results);

        info!(
            "Run {}: considered={} missing_window={} missing_price={} low_volume={} unaffordable={} below_min_profit={} passed={} kept={}",
            run_id,
            stats.considered,
            stats.missing_window,
            stats.missing_price,
            stats.low_volume,
            stats.unaffordable,
            stats.below_min_profit,
            stats.passed,
            candidates.len()
        );

        (candidates, stats)
    }
}

/// Per-unit margin after the sell-side tax, which is rounded down.
pub fn profit_margin(high: i64, low: i64, sell_tax_rate: f64) -> i64 {
    let tax = (high as f64 * sell_tax_rate).floor() as i64;
    high - low - tax
}

/// How many units the cash buys at `low`, capped by the buy limit.
pub fn max_affordable_qty(cash: f64, low: i64, trade_limit: Option<i64>) -> i64 {
    if low <= 0 {
        return 0;
    }
    let qty = (cash / low as f64).floor() as i64;
    match trade_limit {
        Some(limit) => qty.min(limit),
        None => qty,
    }
}

fn resolve_name(snapshot: &MarketSnapshot, item_id: ItemId) -> String {
    snapshot.catalog
        .get(&item_id)
        .map(|entry| entry.name.clone())
        .unwrap_or_else(|| UNKNOWN_ITEM_NAME.to_string())
}
