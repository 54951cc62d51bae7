//! Grouping of one bot's full-day log into runs and cycles for the logs page.

use crate::types::LogEntry;
use std::collections::BTreeMap;

/// All entries of one cycle within a run
#[derive(Debug, Clone, PartialEq)]
pub struct CycleGroup {
    /// `None` for top-level process logs
    pub cycle: Option<i64>,
    pub entries: Vec<LogEntry>,
    pub error_count: usize,
    pub warning_count: usize,
    /// Tag name and occurrence count, in first-appearance order
    pub tag_counts: Vec<(String, usize)>,
}

impl CycleGroup {
    fn new(cycle: Option<i64>) -> Self {
        Self {
            cycle,
            entries: Vec::new(),
            error_count: 0,
            warning_count: 0,
            tag_counts: Vec::new(),
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if entry.is_error() {
            self.error_count += 1;
        } else if entry.is_warning() {
            self.warning_count += 1;
        }
        if let Some(tag) = &entry.tag {
            match self.tag_counts.iter_mut().find(|(name, _)| name == tag.as_str()) {
                Some((_, count)) => *count += 1,
                None => self.tag_counts.push((tag.as_str().to_string(), 1)),
            }
        }
        self.entries.push(entry);
    }

    pub fn first_time(&self) -> Option<&str> {
        self.entries.first().map(|e| e.time.as_str())
    }

    pub fn last_time(&self) -> Option<&str> {
        self.entries.last().map(|e| e.time.as_str())
    }
}

/// One agent run
#[derive(Debug, Clone, PartialEq)]
pub struct RunGroup {
    pub run_prefix: String,
    /// Ordered by cycle number, process-level entries first
    pub cycles: Vec<CycleGroup>,
}

impl RunGroup {
    pub fn total_entries(&self) -> usize {
        self.cycles.iter().map(|c| c.entries.len()).sum()
    }
}

/// Group entries by run (first-appearance order) and then by cycle
pub fn group_day_logs(logs: Vec<LogEntry>) -> Vec<RunGroup> {
    let mut runs: Vec<(String, BTreeMap<Option<i64>, CycleGroup>)> = Vec::new();

    for entry in logs {
        let idx = match runs.iter().position(|(prefix, _)| *prefix == entry.run_prefix) {
            Some(idx) => idx,
            None => {
                runs.push((entry.run_prefix.clone(), BTreeMap::new()));
                runs.len() - 1
            }
        };
        runs[idx]
            .1
            .entry(entry.cycle)
            .or_insert_with(|| CycleGroup::new(entry.cycle))
            .push(entry);
    }

    runs.into_iter()
        .map(|(run_prefix, cycles)| RunGroup {
            run_prefix,
            cycles: cycles.into_values().collect(),
        })
        .collect()
}
