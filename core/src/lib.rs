//! Content-based title similarity: records are flattened into weighted text
//! "soups", vectorized with smoothed tf-idf over unigrams and bigrams, and
//! compared by cosine similarity to answer "more like this" queries.

pub mod config;
pub mod error;
pub mod handle;
pub mod ingest;
pub mod model;
pub mod persist;
pub mod recommend;
pub mod similarity;
pub mod soup;
pub mod tokenizer;
pub mod vector;
pub mod vocab;

use serde::{Deserialize, Serialize};

pub use config::{IngestConfig, ModelConfig, SimilarityStrategyKind};
pub use error::{Error, Result};
pub use handle::ModelHandle;
pub use model::Model;
pub use recommend::{Recommendation, Recommender};
pub use vector::WeightedVector;
pub use vocab::{DocFrequency, Vocabulary};

pub type TermId = u32;
pub type DocId = u32;

/// Placeholder written by the loader for any missing categorical field.
pub const UNKNOWN: &str = "Unknown";

/// One catalog item. Missing categorical values are already `UNKNOWN` by the time a
/// `Record` exists; see [`ingest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub genres: Vec<String>,
    pub director: String,
    pub cast: Vec<String>,
    pub country: Vec<String>,
    pub rating: String,
    pub description: String,
    pub duration: String,
}

impl Record {
    /// A record with only an id and title; every categorical field is the sentinel.
    pub fn with_title(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genres: Vec::new(),
            director: UNKNOWN.to_string(),
            cast: vec![UNKNOWN.to_string()],
            country: vec![UNKNOWN.to_string()],
            rating: UNKNOWN.to_string(),
            description: String::new(),
            duration: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64, // normalized tf-idf weight
}
