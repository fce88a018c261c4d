use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use tracing::{info, warn};
use crate::history::types::{AnalysisHistory, AnalysisRun};
use crate::strategies::types::{AnalysisParams, Candidate, RunId};

/// SQLite store for past runs, keyed by run id.
///
/// Runs carry an autoincrement sequence so reloads come back oldest first
/// regardless of how the ids sort.
pub struct HistoryDatabase {
    conn: Connection,
}

impl HistoryDatabase {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open history database: {}", db_path))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL,
                cash REAL NOT NULL,
                min_volume_24h INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS candidates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                rank INTEGER NOT NULL,
                name TEXT NOT NULL,
                recommended_buy_price INTEGER NOT NULL,
                recommended_sell_price INTEGER NOT NULL,
                profit INTEGER NOT NULL,
                max_affordable_qty INTEGER NOT NULL,
                profit_times_volume INTEGER NOT NULL,
                FOREIGN KEY(run_id) REFERENCES runs(run_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_candidates_run_id ON candidates(run_id);
            "#
        )?;

        Ok(Self { conn })
    }

    /// Store a run and everything ranked in it
    pub fn insert_run(&mut self, run: &AnalysisRun) -> Result<()> {
        let tx = self.conn.transaction()?;
        insert_run_tx(&tx, run)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete runs and their candidates
    pub fn delete_runs(&mut self, run_ids: &[RunId]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for run_id in run_ids {
            delete_run_tx(&tx, *run_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist a freshly pushed run and drop the ones the history evicted,
    /// all or nothing.
    pub fn record(&mut self, run: &AnalysisRun, evicted: &[AnalysisRun]) -> Result<()> {
        let tx = self.conn.transaction()?;
        insert_run_tx(&tx, run)?;
        for old in evicted {
            delete_run_tx(&tx, old.run_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Refuse all writes from here on
    #[cfg(test)]
    pub(crate) fn set_query_only(&self) {
        self.conn.execute_batch("PRAGMA query_only = ON;").unwrap();
    }

    /// Count stored runs
    pub fn count_runs(&self) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM runs",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Load every stored run, oldest first, candidates in rank order.
    pub fn load_runs(&self) -> Result<Vec<AnalysisRun>> {
        let mut run_stmt = self.conn.prepare(
            "SELECT run_id, created_at, cash, min_volume_24h FROM runs ORDER BY seq"
        )?;

        let rows = run_stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut runs = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let (run_id_str, created_at_str, cash, min_volume_24h) = row?;

            let run_id: RunId = match run_id_str.parse() {
                Ok(id) => id,
                Err(e) => {
                    warn!("Skipping stored run with bad id {:?}: {}", run_id_str, e);
                    continue;
                }
            };
            let created_at = match DateTime::parse_from_rfc3339(&created_at_str) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!("Skipping stored run {} with bad timestamp {:?}: {}", run_id_str, created_at_str, e);
                    continue;
                }
            };

            index.insert(run_id_str, runs.len());
            runs.push(AnalysisRun {
                run_id,
                created_at,
                params: AnalysisParams {
                    cash,
                    min_volume_24h: min_volume_24h.max(0) as u64,
                },
                candidates: Vec::new(),
            });
        }

        let mut cand_stmt = self.conn.prepare(
            "SELECT run_id, name, recommended_buy_price, recommended_sell_price,
                    profit, max_affordable_qty, profit_times_volume
             FROM candidates
             ORDER BY run_id, rank"
        )?;

        let rows = cand_stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        for row in rows {
            let (run_id_str, name, buy, sell, profit, qty, profit_volume) = row?;
            let Some(&pos) = index.get(&run_id_str) else {
                continue;
            };
            let run = &mut runs[pos];
            run.candidates.push(Candidate {
                name,
                recommended_buy_price: buy,
                recommended_sell_price: sell,
                profit,
                max_affordable_qty: qty,
                profit_times_volume: profit_volume,
                run_id: run.run_id,
            });
        }

        Ok(runs)
    }

    /// Rebuild the bounded history, pruning stored runs that no longer fit.
    pub fn load_history(&mut self, capacity: usize) -> Result<AnalysisHistory> {
        let runs = self.load_runs()?;
        let stored = runs.len();

        let mut history = AnalysisHistory::new(capacity);
        let mut evicted = Vec::new();
        for run in runs {
            evicted.extend(history.push(run));
        }
        if !evicted.is_empty() {
            let ids: Vec<RunId> = evicted.iter().map(|r| r.run_id).collect();
            self.delete_runs(&ids)?;
        }

        info!(
            "Loaded {} stored runs ({} kept of capacity {}, {} pruned)",
            stored,
            history.len(),
            history.capacity(),
            evicted.len()
        );
        Ok(history)
    }
}

fn insert_run_tx(tx: &Transaction<'_>, run: &AnalysisRun) -> Result<()> {
    let run_id = run.run_id.to_string();

    tx.execute(
        "INSERT INTO runs (run_id, created_at, cash, min_volume_24h)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            run_id,
            run.created_at.to_rfc3339(),
            run.params.cash,
            run.params.min_volume_24h as i64,
        ],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO candidates (run_id, rank, name, recommended_buy_price, recommended_sell_price,
                                 profit, max_affordable_qty, profit_times_volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    )?;
    for (rank, c) in run.candidates.iter().enumerate() {
        stmt.execute(params![
            run_id,
            rank as i64,
            c.name,
            c.recommended_buy_price,
            c.recommended_sell_price,
            c.profit,
            c.max_affordable_qty,
            c.profit_times_volume,
        ])?;
    }
    Ok(())
}

fn delete_run_tx(tx: &Transaction<'_>, run_id: RunId) -> Result<()> {
    let run_id = run_id.to_string();
    tx.execute("DELETE FROM candidates WHERE run_id = ?1", params![run_id])?;
    tx.execute("DELETE FROM runs WHERE run_id = ?1", params![run_id])?;
    Ok(())
}
