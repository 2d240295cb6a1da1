use crate::error::{Error, Result};
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Document-frequency bound: an absolute document count or a proportion of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocFrequency {
    Count(u32),
    Proportion(f64),
}

impl DocFrequency {
    /// Smallest admissible document count; proportions round up.
    pub fn resolve_min(self, num_docs: usize) -> Result<u32> {
        match self {
            DocFrequency::Count(c) => Ok(c),
            DocFrequency::Proportion(p) => Ok((check_proportion(p)? * num_docs as f64).ceil() as u32),
        }
    }

    /// Largest admissible document count; proportions round down.
    pub fn resolve_max(self, num_docs: usize) -> Result<u32> {
        match self {
            DocFrequency::Count(c) => Ok(c),
            DocFrequency::Proportion(p) => Ok((check_proportion(p)? * num_docs as f64).floor() as u32),
        }
    }
}

fn check_proportion(p: f64) -> Result<f64> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(Error::InvalidConfig(format!("document-frequency proportion {p} outside [0, 1]")))
    }
}

impl FromStr for DocFrequency {
    type Err = Error;

    /// `"2"` is a count, `"0.8"` a proportion.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains('.') {
            let p: f64 = s.parse().map_err(|_| Error::InvalidConfig(format!("bad proportion: {s}")))?;
            check_proportion(p).map(DocFrequency::Proportion)
        } else {
            s.parse().map(DocFrequency::Count).map_err(|_| Error::InvalidConfig(format!("bad document count: {s}")))
        }
    }
}

impl fmt::Display for DocFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocFrequency::Count(c) => write!(f, "{c}"),
            DocFrequency::Proportion(p) => write!(f, "{p:?}"),
        }
    }
}

/// Retained terms with dense, lexicographically ordered column ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub dictionary: HashMap<String, TermId>,
    /// Document frequency per term id.
    pub df: Vec<u32>,
    pub num_docs: u32,
}

impl Vocabulary {
    /// Build from per-document term counts. Fails with `DegenerateModel` when nothing survives
    /// the document-frequency window.
    pub fn build(doc_counts: &[HashMap<String, u32>], min_df: DocFrequency, max_df: DocFrequency) -> Result<Self> {
        let num_docs = doc_counts.len();
        if num_docs == 0 {
            return Err(Error::DegenerateModel("empty corpus".into()));
        }
        let min = min_df.resolve_min(num_docs)?;
        let max = max_df.resolve_max(num_docs)?;
        if min > max {
            return Err(Error::DegenerateModel(format!(
                "min_df {min_df} resolves above max_df {max_df} for {num_docs} documents"
            )));
        }

        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for doc in doc_counts {
            for term in doc.keys() {
                *counts.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut dictionary = HashMap::new();
        let mut df = Vec::new();
        for (term, n) in counts {
            if n < min || n > max { continue; }
            dictionary.insert(term.to_string(), df.len() as TermId);
            df.push(n);
        }
        if df.is_empty() {
            return Err(Error::DegenerateModel(format!(
                "no term has document frequency within [{min}, {max}] across {num_docs} documents"
            )));
        }
        tracing::debug!(num_docs, retained = df.len(), min, max, "vocabulary built");
        Ok(Self { dictionary, df, num_docs: num_docs as u32 })
    }

    pub fn len(&self) -> usize { self.df.len() }

    pub fn is_empty(&self) -> bool { self.df.is_empty() }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    /// Smoothed idf: `ln((1 + N) / (1 + df)) + 1`.
    pub fn idf(&self, term_id: TermId) -> f64 {
        let n = self.num_docs as f64;
        let df = self.df[term_id as usize] as f64;
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    }

    /// Terms in column order.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = vec![""; self.df.len()];
        for (term, &id) in &self.dictionary {
            terms[id as usize] = term.as_str();
        }
        terms
    }
}
