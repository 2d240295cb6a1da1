//! Term weighting: tf-idf over the retained vocabulary, L2-normalized per document.

use crate::config::ModelConfig;
use crate::error::Result;
use crate::soup::build_soup;
use crate::tokenizer::term_counts;
use crate::vocab::{DocFrequency, Vocabulary};
use crate::{Record, TermId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sparse document vector, entries sorted by term id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedVector {
    entries: Vec<(TermId, f64)>,
}

impl WeightedVector {
    /// Sorts by term id and scales to unit length. An all-zero input stays zero.
    pub fn normalized(mut entries: Vec<(TermId, f64)>) -> Self {
        entries.retain(|(_, w)| *w != 0.0);
        entries.sort_by_key(|(id, _)| *id);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f64)] { &self.entries }

    pub fn is_zero(&self) -> bool { self.entries.is_empty() }

    pub fn norm(&self) -> f64 { self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt() }

    /// Dot product by merging the two sorted entry lists.
    pub fn dot(&self, other: &WeightedVector) -> f64 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

fn weigh(counts: &HashMap<String, u32>, vocabulary: &Vocabulary) -> WeightedVector {
    let entries = counts
        .iter()
        .filter_map(|(term, &tf)| vocabulary.term_id(term).map(|id| (id, tf as f64 * vocabulary.idf(id))))
        .collect();
    WeightedVector::normalized(entries)
}

/// Vectorize precomputed soups.
pub fn fit_soups(soups: &[String], min_df: DocFrequency, max_df: DocFrequency) -> Result<(Vocabulary, Vec<WeightedVector>)> {
    let doc_counts: Vec<HashMap<String, u32>> = soups.par_iter().map(|s| term_counts(s)).collect();
    let vocabulary = Vocabulary::build(&doc_counts, min_df, max_df)?;
    let vectors: Vec<WeightedVector> = doc_counts.par_iter().map(|c| weigh(c, &vocabulary)).collect();
    let empty = vectors.iter().filter(|v| v.is_zero()).count();
    if empty > 0 {
        tracing::warn!(empty, "documents without any retained term");
    }
    Ok((vocabulary, vectors))
}

/// Build soups for the corpus and vectorize them.
pub fn fit(records: &[Record], config: &ModelConfig) -> Result<(Vocabulary, Vec<WeightedVector>)> {
    let soups: Vec<String> = records.par_iter().map(build_soup).collect();
    fit_soups(&soups, config.min_df, config.max_df)
}
