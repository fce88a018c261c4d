use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use crate::auth::{CredentialVerifier, LoginError};
use crate::data::MarketDataSource;
use crate::history::persistence::HistoryDatabase;
use crate::history::types::{AnalysisHistory, AnalysisRun};
use crate::monitoring::export::CsvExporter;
use crate::strategies::quick_flip::{QuickFlipStrategy, RankStats};
use crate::strategies::types::{AnalysisParams, RunId};

/// Session state owned by the control loop.
#[derive(Debug)]
pub struct AppState {
    pub logged_in: bool,
    pub history: AnalysisHistory,
}

impl AppState {
    pub fn new(history: AnalysisHistory) -> Self {
        Self {
            logged_in: false,
            history,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Ranked(AnalysisRun),
    NoResults(RankStats),
}

pub struct App<S> {
    state: AppState,
    source: S,
    strategy: QuickFlipStrategy,
    db: HistoryDatabase,
    exporter: Option<CsvExporter>,
    verifier: Box<dyn CredentialVerifier>,
}

impl<S: MarketDataSource> App<S> {
    pub fn new(
        state: AppState,
        source: S,
        strategy: QuickFlipStrategy,
        db: HistoryDatabase,
        exporter: Option<CsvExporter>,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            state,
            source,
            strategy,
            db,
            exporter,
            verifier,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.logged_in
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), LoginError> {
        match self.verifier.verify(username, password) {
            Ok(()) => {
                info!("Login succeeded");
                self.state.logged_in = true;
                Ok(())
            }
            Err(e) => {
                warn!("Login rejected");
                Err(e)
            }
        }
    }

    /// Fetch, rank, and record one run.
    ///
    /// A fetch failure leaves history untouched. Empty rankings are reported
    /// but not stored.
    pub async fn run_analysis(&mut self, params: AnalysisParams) -> Result<RunOutcome> {
        if !self.state.logged_in {
            anyhow::bail!("Not logged in");
        }

        info!(
            "Running analysis: cash={:.0} min_volume_24h={}",
            params.cash, params.min_volume_24h
        );

        let snapshot = self.source
            .fetch_snapshot()
            .await
            .context("Failed to fetch market data")?;

        let run_id = RunId::generate();
        let (candidates, stats) = self.strategy.rank(&params, &snapshot, run_id);

        if candidates.is_empty() {
            info!("Run {} produced no candidates", run_id);
            return Ok(RunOutcome::NoResults(stats));
        }

        let run = AnalysisRun {
            run_id,
            created_at: Utc::now(),
            params,
            candidates,
        };

        // Memory only changes once the store has accepted the run
        let mut history = self.state.history.clone();
        let evicted = history.push(run.clone());
        self.db.record(&run, &evicted).context("Failed to save analysis history")?;
        for old in &evicted {
            info!("Evicted run {} from history", old.run_id);
        }
        self.state.history = history;

        if let Some(exporter) = &self.exporter {
            match exporter.export(&self.state.history) {
                Ok(rows) => info!("Exported {} rows to {}", rows, exporter.path().display()),
                Err(e) => error!("CSV export failed: {:#}", e),
            }
        }

        Ok(RunOutcome::Ranked(run))
    }
}
