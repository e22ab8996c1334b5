use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GitloreError;

/// Top-level configuration loaded from `.gitlore.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use gitlore_core::GitloreConfig;
///
/// let config = GitloreConfig::default();
/// assert_eq!(config.hotspots.max_files, 15);
/// assert_eq!(config.authors.main_cohort_size, 14);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitloreConfig {
    /// Where the commit walk starts.
    #[serde(default)]
    pub walk: WalkConfig,
    /// Hotspot file selection.
    #[serde(default)]
    pub hotspots: HotspotConfig,
    /// Author cohort split.
    #[serde(default)]
    pub authors: AuthorConfig,
    /// Percentile summaries.
    #[serde(default)]
    pub stats: StatsConfig,
}

impl GitloreConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitloreError::Io`] if the file cannot be read, or
    /// [`GitloreError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gitlore_core::GitloreConfig;
    /// use std::path::Path;
    ///
    /// let config = GitloreConfig::from_file(Path::new(".gitlore.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, GitloreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GitloreError::Toml`] if parsing fails, or
    /// [`GitloreError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitlore_core::GitloreConfig;
    ///
    /// let toml = r#"
    /// [hotspots]
    /// max_files = 5
    /// "#;
    /// let config = GitloreConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.hotspots.max_files, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, GitloreError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`GitloreError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<(), GitloreError> {
        if !(0.0..=1.0).contains(&self.stats.percentile) {
            return Err(GitloreError::Config(format!(
                "stats.percentile must be within 0.0..=1.0, got {}",
                self.stats.percentile
            )));
        }
        if !(0.0..=1.0).contains(&self.authors.long_tail_fraction) {
            return Err(GitloreError::Config(format!(
                "authors.long_tail_fraction must be within 0.0..=1.0, got {}",
                self.authors.long_tail_fraction
            )));
        }
        Ok(())
    }
}

/// Commit walk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Reference to start from instead of HEAD.
    pub branch: Option<String>,
}

/// Hotspot file selection.
///
/// # Examples
///
/// ```
/// use gitlore_core::HotspotConfig;
///
/// let config = HotspotConfig::default();
/// assert!(config.extensions.iter().any(|e| e == "rs"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    /// How many of the most-committed files to track (default: 15).
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// File extensions (without the dot) that count as source files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_max_files() -> usize {
    15
}

fn default_extensions() -> Vec<String> {
    [
        "m", "cc", "cpp", "mm", "h", "c", "swift", "py", "rb", "js", "json", "html", "txt", "go",
        "rs", "clj", "cljs", "md", "rst", "yml", "erb", "scss",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
        }
    }
}

/// How resolved identities are split into "main" and "long-tail" cohorts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortStrategy {
    /// The `main_cohort_size` identities with the most commits are main.
    #[default]
    Count,
    /// The bottom `long_tail_fraction` of identities by commit count are long-tail.
    Percentile,
}

/// Author cohort configuration.
///
/// # Examples
///
/// ```
/// use gitlore_core::{AuthorConfig, CohortStrategy};
///
/// let config = AuthorConfig::default();
/// assert_eq!(config.strategy, CohortStrategy::Count);
/// assert_eq!(config.main_cohort_size, 14);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorConfig {
    /// Split strategy (default: `"count"`).
    #[serde(default)]
    pub strategy: CohortStrategy,
    /// Main cohort size for the count strategy (default: 14).
    #[serde(default = "default_main_cohort_size")]
    pub main_cohort_size: usize,
    /// Long-tail fraction for the percentile strategy (default: 0.1).
    #[serde(default = "default_long_tail_fraction")]
    pub long_tail_fraction: f64,
}

fn default_main_cohort_size() -> usize {
    14
}

fn default_long_tail_fraction() -> f64 {
    0.1
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            strategy: CohortStrategy::default(),
            main_cohort_size: default_main_cohort_size(),
            long_tail_fraction: default_long_tail_fraction(),
        }
    }
}

/// Percentile summary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Rank of the reported percentile value (default: 0.99).
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// A rank landing within this many trailing elements is moved down by one (default: 3).
    #[serde(default = "default_boundary_window")]
    pub boundary_window: usize,
}

fn default_percentile() -> f64 {
    0.99
}

fn default_boundary_window() -> usize {
    3
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            percentile: default_percentile(),
            boundary_window: default_boundary_window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GitloreConfig::default();
        assert!(config.walk.branch.is_none());
        assert_eq!(config.hotspots.max_files, 15);
        assert_eq!(config.hotspots.extensions.len(), 22);
        assert_eq!(config.authors.strategy, CohortStrategy::Count);
        assert_eq!(config.authors.main_cohort_size, 14);
        assert_eq!(config.authors.long_tail_fraction, 0.1);
        assert_eq!(config.stats.percentile, 0.99);
        assert_eq!(config.stats.boundary_window, 3);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[walk]
branch = "main"

[hotspots]
max_files = 5
extensions = ["rs", "toml"]

[authors]
strategy = "percentile"
long_tail_fraction = 0.25

[stats]
percentile = 0.95
boundary_window = 2
"#;
        let config = GitloreConfig::from_toml(toml).unwrap();
        assert_eq!(config.walk.branch.as_deref(), Some("main"));
        assert_eq!(config.hotspots.max_files, 5);
        assert_eq!(config.hotspots.extensions, vec!["rs", "toml"]);
        assert_eq!(config.authors.strategy, CohortStrategy::Percentile);
        assert_eq!(config.authors.main_cohort_size, 14);
        assert_eq!(config.authors.long_tail_fraction, 0.25);
        assert_eq!(config.stats.percentile, 0.95);
        assert_eq!(config.stats.boundary_window, 2);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = GitloreConfig::from_toml("").unwrap();
        assert_eq!(config.hotspots.max_files, 15);
        assert_eq!(config.stats.percentile, 0.99);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = GitloreConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_percentile_is_rejected() {
        let err = GitloreConfig::from_toml("[stats]\npercentile = 1.5\n").unwrap_err();
        assert!(matches!(err, GitloreError::Config(_)));
        assert!(err.to_string().contains("stats.percentile"));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = GitloreConfig::from_toml("[authors]\nstrategy = \"random\"\n");
        assert!(result.is_err());
    }
}
