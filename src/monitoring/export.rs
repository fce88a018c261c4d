use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use crate::history::types::AnalysisHistory;
use crate::strategies::types::Candidate;

const HEADER: [&str; 7] = [
    "name",
    "Recommended Buy Price",
    "Recommended Sell Price",
    "Profit",
    "Max Qty Affordable",
    "Profit X Volume",
    "Session ID",
];

#[derive(Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    recommended_buy_price: i64,
    recommended_sell_price: i64,
    profit: i64,
    max_affordable_qty: i64,
    profit_times_volume: i64,
    session_id: String,
}

impl<'a> From<&'a Candidate> for ExportRow<'a> {
    fn from(c: &'a Candidate) -> Self {
        Self {
            name: &c.name,
            recommended_buy_price: c.recommended_buy_price,
            recommended_sell_price: c.recommended_sell_price,
            profit: c.profit,
            max_affordable_qty: c.max_affordable_qty,
            profit_times_volume: c.profit_times_volume,
            session_id: c.run_id.to_string(),
        }
    }
}

/// Flat CSV dump of the retained history, rewritten after every run.
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with every run in the history, oldest first
    pub fn export(&self, history: &AnalysisHistory) -> Result<usize> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;

        // Written explicitly so an empty history still gets a header line
        writer.write_record(HEADER)?;

        let mut rows = 0;
        for run in history.iter() {
            for candidate in &run.candidates {
                writer.serialize(ExportRow::from(candidate))?;
                rows += 1;
            }
        }

        writer.flush()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::types::AnalysisRun;
    use crate::strategies::types::{AnalysisParams, RunId};
    use chrono::Utc;

    fn run(id: u128, names: &[&str]) -> AnalysisRun {
        AnalysisRun {
            run_id: RunId(id),
            created_at: Utc::now(),
            params: AnalysisParams { cash: 1_000_000.0, min_volume_24h: 1 },
            candidates: names
                .iter()
                .map(|name| Candidate {
                    name: name.to_string(),
                    recommended_buy_price: 10,
                    recommended_sell_price: 20,
                    profit: 900,
                    max_affordable_qty: 100,
                    profit_times_volume: 90_000,
                    run_id: RunId(id),
                })
                .collect(),
        }
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("history.csv"));

        let mut history = AnalysisHistory::new(3);
        history.push(run(1, &["Shark", "Rune bar"]));
        history.push(run(2, &["Cannonball"]));

        assert_eq!(exporter.export(&history).unwrap(), 3);

        let contents = std::fs::read_to_string(exporter.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], HEADER.join(","));
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            format!("Shark,10,20,900,100,90000,{}", RunId(1))
        );
        assert!(lines[3].starts_with("Cannonball,"));
    }

    #[test]
    fn test_export_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("history.csv"));

        let mut history = AnalysisHistory::new(1);
        history.push(run(1, &["Old item"]));
        exporter.export(&history).unwrap();
        history.push(run(2, &["New item"]));
        exporter.export(&history).unwrap();

        let contents = std::fs::read_to_string(exporter.path()).unwrap();
        assert!(!contents.contains("Old item"));
        assert!(contents.contains("New item"));
    }

    #[test]
    fn test_names_with_commas_and_quotes_survive() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("history.csv"));

        let mut history = AnalysisHistory::new(3);
        history.push(run(1, &["Bones, big", "Say \"hi\""]));
        exporter.export(&history).unwrap();

        let mut reader = csv::Reader::from_path(exporter.path()).unwrap();
        let header: Vec<_> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(header, HEADER.to_vec());
        let names: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(names, vec!["Bones, big", "Say \"hi\""]);
    }

    #[test]
    fn test_empty_history_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("history.csv"));

        assert_eq!(exporter.export(&AnalysisHistory::new(3)).unwrap(), 0);
        let contents = std::fs::read_to_string(exporter.path()).unwrap();
        assert_eq!(contents.trim_end(), HEADER.join(","));
    }
}
