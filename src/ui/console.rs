use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::error;
use crate::app::{App, RunOutcome};
use crate::config::AnalysisConfig;
use crate::data::MarketDataSource;
use crate::history::types::AnalysisHistory;
use crate::strategies::types::{AnalysisParams, Candidate, ParamsError};

const HELP: &str = "Commands: run | history | help | quit";

/// Line-oriented terminal front-end: login gate, then a command loop.
pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
    default_min_volume: u64,
    default_cash_millions: f64,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W, analysis: &AnalysisConfig) -> Self {
        Self {
            lines: input.lines(),
            out,
            default_min_volume: analysis.default_min_volume_24h,
            default_cash_millions: analysis.default_cash_millions,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    /// `None` on end of input
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.out.write_all(label.as_bytes()).await?;
        self.out.flush().await?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }

    /// Keep asking until the credentials match. `false` if input ran out.
    pub async fn login<S: MarketDataSource>(&mut self, app: &mut App<S>) -> Result<bool> {
        self.say("=== Login ===").await?;
        while !app.is_logged_in() {
            let Some(username) = self.prompt("Username: ").await? else {
                return Ok(false);
            };
            let Some(password) = self.prompt("Password: ").await? else {
                return Ok(false);
            };

            match app.login(&username, &password) {
                Ok(()) => self.say("Logged in successfully!").await?,
                Err(e) => self.say(&e.to_string()).await?,
            }
        }
        Ok(true)
    }

    pub async fn run<S: MarketDataSource>(&mut self, app: &mut App<S>) -> Result<()> {
        if !app.is_logged_in() && !self.login(app).await? {
            return Ok(());
        }

        self.say("=== OSRS Quick Flip Analyzer ===").await?;
        self.say(HELP).await?;

        loop {
            let Some(command) = self.prompt("> ").await? else {
                break;
            };

            match command.to_lowercase().as_str() {
                "run" | "r" => self.run_analysis(app).await?,
                "history" | "h" => {
                    let text = render_history(&app.state().history);
                    self.say(&text).await?;
                }
                "help" | "?" => self.say(HELP).await?,
                "quit" | "exit" | "q" => break,
                "" => {}
                other => self.say(&format!("Unknown command: {}. {}", other, HELP)).await?,
            }
        }

        Ok(())
    }

    async fn run_analysis<S: MarketDataSource>(&mut self, app: &mut App<S>) -> Result<()> {
        let label = format!("Minimum 24h volume [{}]: ", self.default_min_volume);
        let Some(volume) = self.prompt(&label).await? else {
            return Ok(());
        };
        let label = format!("Available cash in millions [{:.1}]: ", self.default_cash_millions);
        let Some(cash) = self.prompt(&label).await? else {
            return Ok(());
        };

        let params = match parse_params(&volume, &cash, self.default_min_volume, self.default_cash_millions) {
            Ok(params) => params,
            Err(e) => return self.say(&e.to_string()).await,
        };

        self.say("Fetching data and running analysis...").await?;

        match app.run_analysis(params).await {
            Ok(RunOutcome::Ranked(run)) => {
                self.say(&format!(
                    "Analysis complete! Here are your top {} items for quick flipping:",
                    run.candidates.len()
                ))
                .await?;
                self.say(&render_candidates(&run.candidates)).await?;
            }
            Ok(RunOutcome::NoResults(_)) => {
                self.say("No items found with the specified criteria.").await?;
            }
            Err(e) => {
                error!("Analysis failed: {:#}", e);
                self.say(&format!("An error occurred: {:#}", e)).await?;
            }
        }

        Ok(())
    }
}

/// Blank input falls back to the defaults.
pub fn parse_params(
    volume: &str,
    cash_millions: &str,
    default_volume: u64,
    default_cash_millions: f64,
) -> Result<AnalysisParams, ParamsError> {
    let volume = if volume.is_empty() {
        default_volume
    } else {
        volume
            .replace('_', "")
            .parse::<u64>()
            .map_err(|_| ParamsError::NotANumber(volume.to_string()))?
    };

    let cash = if cash_millions.is_empty() {
        default_cash_millions
    } else {
        cash_millions
            .parse::<f64>()
            .map_err(|_| ParamsError::NotANumber(cash_millions.to_string()))?
    };

    AnalysisParams::from_inputs(cash, volume)
}

pub fn render_candidates(candidates: &[Candidate]) -> String {
    let mut out = format!(
        "{:>3} | {:<32} | {:>12} | {:>12} | {:>14} | {:>10} | {:>18}\n",
        "#", "Name", "Buy", "Sell", "Profit", "Max Qty", "Profit x Volume"
    );
    out.push_str(&format!("{:-<124}\n", ""));

    for (i, c) in candidates.iter().enumerate() {
        out.push_str(&format!(
            "{:>3} | {:<32} | {:>12} | {:>12} | {:>14} | {:>10} | {:>18}\n",
            i + 1,
            truncate(&c.name, 32),
            c.recommended_buy_price,
            c.recommended_sell_price,
            c.profit,
            c.max_affordable_qty,
            c.profit_times_volume
        ));
    }

    if let Some(first) = candidates.first() {
        out.push_str(&format!("Session ID: {}", first.run_id));
    }
    out
}

/// Newest run first, numbered from 1.
pub fn render_history(history: &AnalysisHistory) -> String {
    if history.is_empty() {
        return "No previous analyses.".to_string();
    }

    let mut out = String::from("### Previous Analyses:\n");
    for (i, run) in history.iter().rev().enumerate() {
        out.push_str(&format!(
            "#### Analysis {} ({}; cash {:.1}M, min volume {})\n",
            i + 1,
            run.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            run.params.cash / 1_000_000.0,
            run.params.min_volume_24h
        ));
        out.push_str(&render_candidates(&run.candidates));
        out.push('\n');
    }
    out
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let cut: String = name.chars().take(width.saturating_sub(1)).collect();
        format!("{}~", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{snapshot_with, test_app};
    use crate::strategies::types::RunId;
    use tokio::io::BufReader;

    fn console(script: &str) -> Console<BufReader<&[u8]>, Vec<u8>> {
        Console::new(BufReader::new(script.as_bytes()), Vec::new(), &AnalysisConfig::default())
    }

    #[test]
    fn test_parse_params_defaults_and_errors() {
        let params = parse_params("", "", 90_000, 10.0).unwrap();
        assert_eq!(params.min_volume_24h, 90_000);
        assert!((params.cash - 10_000_000.0).abs() < 1e-6);

        let params = parse_params("1_000", "2.5", 90_000, 10.0).unwrap();
        assert_eq!(params.min_volume_24h, 1000);
        assert!((params.cash - 2_500_000.0).abs() < 1e-6);

        assert_eq!(
            parse_params("lots", "", 1, 1.0),
            Err(ParamsError::NotANumber("lots".to_string()))
        );
        assert_eq!(parse_params("0", "", 1, 1.0), Err(ParamsError::VolumeTooLow(0)));
        assert!(parse_params("", "0.01", 1, 1.0).is_err());
    }

    #[test]
    fn test_render_candidates_table() {
        let candidates = vec![Candidate {
            name: "Shark".to_string(),
            recommended_buy_price: 900,
            recommended_sell_price: 1000,
            profit: 90_000,
            max_affordable_qty: 1000,
            profit_times_volume: 45_000_000,
            run_id: RunId(3),
        }];

        let table = render_candidates(&candidates);
        let row = table.lines().nth(2).unwrap();
        assert!(row.contains("Shark"));
        assert!(row.contains("45000000"));
        assert!(table.ends_with(&RunId(3).to_string()));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Shark", 10), "Shark");
        assert_eq!(truncate("Dragon warhammer", 8), "Dragon ~");
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_history(&AnalysisHistory::new(3)), "No previous analyses.");
    }

    #[tokio::test]
    async fn test_scripted_session() {
        let mut app = test_app(Some(snapshot_with(&[(1, "Shark", 900, 1000, 500_000)])));
        let mut console = console("admin\nnope\nadmin\nsecret\nrun\n\n1\nhistory\nquit\n");

        console.run(&mut app).await.unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();

        assert!(output.contains("Invalid username or password"));
        assert!(output.contains("Logged in successfully!"));
        assert!(output.contains("Analysis complete! Here are your top 1 items"));
        assert!(output.contains("#### Analysis 1"));
        assert_eq!(app.state().history.len(), 1);
    }

    #[tokio::test]
    async fn test_session_reports_no_results_and_errors() {
        let mut app = test_app(Some(snapshot_with(&[(1, "Shark", 900, 1000, 50)])));
        let mut console = console("admin\nsecret\nrun\n\n\nrun\nabc\n\nbogus\n");

        console.run(&mut app).await.unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();

        assert!(output.contains("No items found with the specified criteria."));
        assert!(output.contains("Not a number: \"abc\""));
        assert!(output.contains("Unknown command: bogus"));
        assert!(app.state().history.is_empty());
    }

    #[tokio::test]
    async fn test_session_reports_fetch_failure() {
        let mut app = test_app(None);
        let mut console = console("admin\nsecret\nrun\n\n\n");

        console.run(&mut app).await.unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();

        assert!(output.contains("An error occurred:"));
        assert!(output.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_login_gives_up_at_end_of_input() {
        let mut app = test_app(None);
        let mut console = console("admin\n");

        console.run(&mut app).await.unwrap();
        assert!(!app.is_logged_in());
    }
}
