use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Random 128-bit label shared by every candidate of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub u128);

impl RunId {
    pub fn generate() -> Self {
        RunId(rand::random())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for RunId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u128::from_str_radix(s, 16).map(RunId)
    }
}

pub const MIN_CASH_MILLIONS: f64 = 0.1;
pub const MIN_VOLUME_24H: u64 = 1;

/// User inputs for one ranking run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    /// Available cash in coins
    pub cash: f64,
    /// Items need strictly more 24h volume than this
    pub min_volume_24h: u64,
}

impl AnalysisParams {
    /// Build params from the console inputs; cash is given in millions.
    pub fn from_inputs(cash_millions: f64, min_volume_24h: u64) -> Result<Self, ParamsError> {
        if !cash_millions.is_finite() || cash_millions < MIN_CASH_MILLIONS {
            return Err(ParamsError::CashTooLow(cash_millions));
        }
        if min_volume_24h < MIN_VOLUME_24H {
            return Err(ParamsError::VolumeTooLow(min_volume_24h));
        }

        Ok(Self {
            cash: cash_millions * 1_000_000.0,
            min_volume_24h,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("Cash must be at least 0.1M, got {0}")]
    CashTooLow(f64),

    #[error("Minimum 24h volume must be at least 1, got {0}")]
    VolumeTooLow(u64),

    #[error("Not a number: {0:?}")]
    NotANumber(String),
}

/// One ranked flip opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub recommended_buy_price: i64,
    pub recommended_sell_price: i64,
    pub profit: i64,
    pub max_affordable_qty: i64,
    pub profit_times_volume: i64,
    pub run_id: RunId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_hex_round_trip() {
        let id = RunId(0xdead_beef);
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<RunId>().unwrap(), id);
    }

    #[test]
    fn test_generated_run_ids_differ() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn test_params_convert_millions() {
        let params = AnalysisParams::from_inputs(10.0, 90_000).unwrap();
        assert!((params.cash - 10_000_000.0).abs() < 1e-6);
        assert_eq!(params.min_volume_24h, 90_000);
    }

    #[test]
    fn test_params_bounds() {
        assert!(AnalysisParams::from_inputs(0.1, 1).is_ok());
        assert_eq!(
            AnalysisParams::from_inputs(0.05, 1),
            Err(ParamsError::CashTooLow(0.05))
        );
        assert_eq!(
            AnalysisParams::from_inputs(1.0, 0),
            Err(ParamsError::VolumeTooLow(0))
        );
        assert!(AnalysisParams::from_inputs(f64::NAN, 10).is_err());
    }
}
