use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use crate::strategies::types::{AnalysisParams, Candidate, RunId};

/// One finished ranking run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub params: AnalysisParams,
    pub candidates: Vec<Candidate>,
}

/// Most recent runs, oldest first. Pushing past capacity evicts the oldest.
#[derive(Debug, Clone)]
pub struct AnalysisHistory {
    runs: VecDeque<AnalysisRun>,
    capacity: usize,
}

impl AnalysisHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            runs: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a run, returning whatever got evicted.
    pub fn push(&mut self, run: AnalysisRun) -> Vec<AnalysisRun> {
        self.runs.push_back(run);

        let mut evicted = Vec::new();
        while self.runs.len() > self.capacity {
            if let Some(oldest) = self.runs.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnalysisRun> {
        self.runs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: u128) -> AnalysisRun {
        AnalysisRun {
            run_id: RunId(id),
            created_at: Utc::now(),
            params: AnalysisParams { cash: 1_000_000.0, min_volume_24h: 10 },
            candidates: Vec::new(),
        }
    }

    #[test]
    fn test_keeps_at_most_capacity() {
        let mut history = AnalysisHistory::new(3);
        for id in 1..=3 {
            assert!(history.push(run(id)).is_empty());
        }
        assert_eq!(history.len(), 3);

        let evicted = history.push(run(4));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].run_id, RunId(1));

        let ids: Vec<_> = history.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![RunId(2), RunId(3), RunId(4)]);
    }

    #[test]
    fn test_eviction_is_fifo_not_by_size() {
        let mut history = AnalysisHistory::new(2);
        let mut big = run(1);
        big.candidates = vec![Candidate {
            name: "Big".to_string(),
            recommended_buy_price: 1,
            recommended_sell_price: 2,
            profit: 1,
            max_affordable_qty: 1,
            profit_times_volume: 1,
            run_id: RunId(1),
        }];
        history.push(big);
        history.push(run(2));
        history.push(run(3));

        let ids: Vec<_> = history.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![RunId(2), RunId(3)]);
    }

    #[test]
    fn test_zero_capacity_still_keeps_one() {
        let mut history = AnalysisHistory::new(0);
        history.push(run(1));
        history.push(run(2));
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }
}
