//! Per-subject weights

use crate::run::SubjectId;
use crate::table::{KeySchema, ResultTable, TableKey, STATUS_COLUMN, STATUS_OK};
use gapstat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much each subject adds to the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightPolicy {
    /// Every subject adds 1
    #[default]
    Uniform,
    /// Weight is the percentile rank of the subject's habitat pixel count
    /// among the subjects of this run; adds `1 / weight`
    Percentile,
    /// Weight is the habitat pixel count; adds `1 / count`
    Area,
}

impl WeightPolicy {
    pub fn is_weighted(self) -> bool {
        self != WeightPolicy::Uniform
    }
}

impl fmt::Display for WeightPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightPolicy::Uniform => "None",
            WeightPolicy::Percentile => "percentile",
            WeightPolicy::Area => "area",
        };
        f.write_str(name)
    }
}

impl FromStr for WeightPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "uniform" => Ok(WeightPolicy::Uniform),
            "percentile" => Ok(WeightPolicy::Percentile),
            "area" => Ok(WeightPolicy::Area),
            _ => Err(Error::InvalidParameter {
                name: "weight",
                value: s.to_string(),
                reason: "expected None, percentile or area".into(),
            }),
        }
    }
}

/// Weight of one subject
#[derive(Debug, Clone, PartialEq)]
pub struct WeightEntry {
    pub subject: SubjectId,
    /// Habitat pixels in the selected season
    pub count: u64,
    pub weight: f64,
    /// Amount added to each habitat cell of the tally
    pub weighted_value: f64,
}

/// Weights of every subject in a run.
///
/// Percentile weights depend on which subjects the run includes: the same
/// subject gets a different weight in a different group.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    policy: WeightPolicy,
    entries: Vec<WeightEntry>,
}

impl WeightTable {
    /// Build weights from `(subject, habitat pixel count)` pairs
    pub fn build(policy: WeightPolicy, counts: &[(SubjectId, u64)]) -> Self {
        let weights: Vec<f64> = match policy {
            WeightPolicy::Uniform => vec![1.0; counts.len()],
            WeightPolicy::Area => counts.iter().map(|(_, c)| *c as f64).collect(),
            WeightPolicy::Percentile => {
                let values: Vec<u64> = counts.iter().map(|(_, c)| *c).collect();
                let n = values.len() as f64;
                average_ranks(&values)
                    .into_iter()
                    .map(|rank| 100.0 * rank / n)
                    .collect()
            }
        };

        let entries = counts
            .iter()
            .zip(weights)
            .map(|((subject, count), weight)| WeightEntry {
                subject: subject.clone(),
                count: *count,
                weight,
                weighted_value: if weight == 0.0 { 0.0 } else { 1.0 / weight },
            })
            .collect();

        Self { policy, entries }
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, subject: &SubjectId) -> Option<&WeightEntry> {
        self.entries.iter().find(|e| &e.subject == subject)
    }

    pub fn weighted_value(&self, subject: &SubjectId) -> Option<f64> {
        self.get(subject).map(|e| e.weighted_value)
    }

    /// Table keyed by subject with `cnt`, `weight`, `weighted_value` and
    /// an `ok` status
    pub fn to_table(&self) -> Result<ResultTable> {
        let mut table = ResultTable::new(KeySchema::Subject).with_columns([
            "cnt",
            "weight",
            "weighted_value",
            STATUS_COLUMN,
        ]);
        for e in &self.entries {
            let key = TableKey::subject(e.subject.as_str());
            table.set(key.clone(), "cnt", e.count)?;
            table.set(key.clone(), "weight", e.weight)?;
            table.set(key.clone(), "weighted_value", e.weighted_value)?;
            table.set(key, STATUS_COLUMN, STATUS_OK)?;
        }
        Ok(table)
    }
}

/// 1-based ranks, ties sharing the average of the ranks they span
pub fn average_ranks(values: &[u64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| values[i]);

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}
