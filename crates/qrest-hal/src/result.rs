//! Measurement results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Histogram of measured bitstrings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<String, u64>);

impl Counts {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add `count` observations of `bitstring`. Repeated inserts accumulate.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.0.entry(bitstring.into()).or_insert(0) += count;
    }

    /// Observations of `bitstring` (zero if never seen).
    pub fn get(&self, bitstring: &str) -> u64 {
        self.0.get(bitstring).copied().unwrap_or(0)
    }

    /// Total number of observations.
    pub fn total_shots(&self) -> u64 {
        self.0.values().sum()
    }

    /// Entries ordered by descending count, ties broken by bitstring.
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The most frequently observed bitstring.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.sorted().into_iter().next()
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in bitstring order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = Counts::new();
        for (bitstring, count) in iter {
            counts.insert(bitstring, count);
        }
        counts
    }
}

/// Counts for one submitted circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    /// Kernel name the counts belong to.
    pub name: String,
    /// Observed histogram.
    pub counts: Counts,
}

/// Backend-agnostic outcome of a job: one histogram per circuit, in
/// submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Per-circuit results.
    pub executions: Vec<ExecutionCounts>,
}

impl SampleResult {
    /// Create a result from per-circuit counts.
    pub fn new(executions: Vec<ExecutionCounts>) -> Self {
        Self { executions }
    }

    /// Create a single-circuit result.
    pub fn single(name: impl Into<String>, counts: Counts) -> Self {
        Self {
            executions: vec![ExecutionCounts {
                name: name.into(),
                counts,
            }],
        }
    }

    /// Counts of the first circuit.
    pub fn counts(&self) -> Option<&Counts> {
        self.executions.first().map(|e| &e.counts)
    }

    /// Counts for the circuit submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&Counts> {
        self.executions
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.counts)
    }

    /// Name entries after the submitted kernels.
    ///
    /// Applies only when there is one entry per kernel. An entry whose name
    /// is not one of `kernel_names` takes the kernel name at its position.
    pub fn name_by_kernels(&mut self, kernel_names: &[String]) {
        if self.executions.len() != kernel_names.len() {
            return;
        }
        for (execution, kernel) in self.executions.iter_mut().zip(kernel_names) {
            if !kernel_names.contains(&execution.name) {
                execution.name.clone_from(kernel);
            }
        }
    }

    /// Observations across all circuits.
    pub fn total_shots(&self) -> u64 {
        self.executions.iter().map(|e| e.counts.total_shots()).sum()
    }

    /// Number of circuits.
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Whether the result holds no circuits.
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
