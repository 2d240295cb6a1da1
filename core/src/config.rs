use crate::error::{Error, Result};
use crate::vocab::DocFrequency;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How similarity rows are produced at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStrategyKind {
    /// Full N x N matrix computed once at build time.
    Precomputed,
    /// One row per query, optionally cached.
    #[default]
    OnDemand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    pub strategy: SimilarityStrategyKind,
    /// Rows kept by the on-demand strategy; 0 disables the cache.
    pub cache_capacity: usize,
    /// Decimal places of the similarity score handed to callers.
    pub score_precision: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_df: DocFrequency::Count(2),
            max_df: DocFrequency::Proportion(0.8),
            strategy: SimilarityStrategyKind::OnDemand,
            cache_capacity: 1024,
            score_precision: 3,
        }
    }
}

impl ModelConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // proportions are range-checked here, counts only make sense against a corpus
        self.min_df.resolve_min(0)?;
        self.max_df.resolve_max(0)?;
        if self.score_precision > 12 {
            return Err(Error::InvalidConfig(format!("score_precision {} exceeds 12", self.score_precision)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Keep only rows whose `type` column is `Movie`.
    pub movies_only: bool,
    /// Abort the load when the share of skipped rows exceeds this.
    pub max_skip_ratio: f64,
}

impl Default for IngestConfig {
    fn default() -> Self { Self { movies_only: true, max_skip_ratio: 0.05 } }
}
