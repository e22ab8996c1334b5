//! Percentile summaries of line counts.

use gitlore_core::StatsConfig;
use serde::{Deserialize, Serialize};

/// Where the percentile value is read from.
///
/// # Examples
///
/// ```
/// use gitlore_mining::summary::PercentileOptions;
///
/// let opts = PercentileOptions::default();
/// assert_eq!(opts.percentile, 0.99);
/// assert_eq!(opts.boundary_window, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileOptions {
    /// Rank as a fraction of the sample size.
    pub percentile: f64,
    /// A rank inside this many trailing elements moves down by one.
    pub boundary_window: usize,
}

impl Default for PercentileOptions {
    fn default() -> Self {
        Self::from(&StatsConfig::default())
    }
}

impl From<&StatsConfig> for PercentileOptions {
    fn from(config: &StatsConfig) -> Self {
        Self {
            percentile: config.percentile,
            boundary_window: config.boundary_window,
        }
    }
}

/// Smallest, largest and near-maximum line count of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    /// Smallest value.
    pub min: usize,
    /// Largest value.
    pub max: usize,
    /// Value at the configured percentile rank.
    pub percentile_value: usize,
}

/// Summarize insertions and deletions as one combined sample.
///
/// The rank is `floor(n * percentile)`. A rank inside the last
/// `boundary_window` elements is moved down by one so a couple of huge
/// commits do not decide the value. An empty sample yields all zeros.
///
/// # Examples
///
/// ```
/// use gitlore_mining::summary::{summarize, PercentileOptions};
///
/// let insertions: Vec<usize> = (1..=50).collect();
/// let deletions: Vec<usize> = (51..=100).collect();
/// let stats = summarize(&insertions, &deletions, &PercentileOptions::default());
/// assert_eq!((stats.min, stats.max, stats.percentile_value), (1, 100, 99));
/// ```
#[must_use]
pub fn summarize(
    insertions: &[usize],
    deletions: &[usize],
    options: &PercentileOptions,
) -> LineStats {
    let mut values: Vec<usize> = insertions.iter().chain(deletions).copied().collect();
    if values.is_empty() {
        return LineStats::default();
    }
    values.sort_unstable();

    let n = values.len();
    let mut rank = (n as f64 * options.percentile).floor() as usize;
    if rank + options.boundary_window >= n {
        rank = rank.saturating_sub(1);
    }
    let rank = rank.min(n - 1);

    LineStats {
        min: values[0],
        max: values[n - 1],
        percentile_value: values[rank],
    }
}
