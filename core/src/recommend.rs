use crate::config::{ModelConfig, SimilarityStrategyKind};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::similarity::{self, SimilaritySource};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// One ranked neighbour with the record's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub doc_id: DocId,
    pub title: String,
    pub genres: Vec<String>,
    pub director: String,
    pub cast: Vec<String>,
    pub country: Vec<String>,
    pub rating: String,
    pub description: String,
    pub duration: String,
    pub similarity: f64,
}

/// Query service over one immutable model.
pub struct Recommender {
    model: Model,
    similarity: Box<dyn SimilaritySource>,
    titles: HashMap<String, DocId>, // folded title -> first doc in corpus order
    score_precision: u32,
}

fn title_key(title: &str) -> String { title.nfkc().collect::<String>().to_lowercase() }

impl Recommender {
    pub fn new(model: Model, similarity: Box<dyn SimilaritySource>, score_precision: u32) -> Self {
        let mut titles = HashMap::with_capacity(model.num_docs());
        for (doc_id, r) in model.records().iter().enumerate() {
            titles.entry(title_key(&r.title)).or_insert(doc_id as DocId);
        }
        Self { model, similarity, titles, score_precision }
    }

    pub fn from_config(model: Model, config: &ModelConfig) -> Self {
        let source = similarity::from_config(&model, config);
        Self::new(model, source, config.score_precision)
    }

    pub fn model(&self) -> &Model { &self.model }

    pub fn strategy(&self) -> SimilarityStrategyKind { self.similarity.kind() }

    /// Case-insensitive exact title match; duplicates resolve to the earliest record.
    pub fn resolve(&self, title: &str) -> Result<DocId> {
        self.titles.get(&title_key(title)).copied().ok_or_else(|| Error::NotFound(title.to_string()))
    }

    /// Up to `top_n` other documents by descending similarity, ties in corpus order.
    /// Scores are left unrounded.
    pub fn rank(&self, doc: DocId, top_n: usize) -> Vec<(DocId, f64)> {
        let row = self.similarity.row(&self.model, doc);
        let mut scored: Vec<(DocId, f64)> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != doc as usize)
            .map(|(i, &s)| (i as DocId, s))
            .collect();
        // stable: equal scores keep corpus order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);
        scored
    }

    pub fn recommend(&self, title: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        if top_n == 0 {
            return Err(Error::InvalidQuery("top_n must be positive".into()));
        }
        let doc = self.resolve(title)?;
        let ranked = self.rank(doc, top_n);
        tracing::debug!(title, doc, hits = ranked.len(), "recommendations ranked");
        Ok(ranked.into_iter().map(|(doc_id, score)| self.entry(doc_id, score)).collect())
    }

    fn entry(&self, doc_id: DocId, score: f64) -> Recommendation {
        let r = &self.model.records()[doc_id as usize];
        Recommendation {
            doc_id,
            title: r.title.clone(),
            genres: r.genres.clone(),
            director: r.director.clone(),
            cast: r.cast.clone(),
            country: r.country.clone(),
            rating: r.rating.clone(),
            description: r.description.clone(),
            duration: r.duration.clone(),
            similarity: round_to(score, self.score_precision),
        }
    }
}

pub fn round_to(x: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (x * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_three_places() {
        assert_eq!(round_to(0.123456, 3), 0.123);
        assert_eq!(round_to(0.9996, 3), 1.0);
    }

    #[test]
    fn title_keys_fold_case_and_width() {
        assert_eq!(title_key("The Conjuring"), title_key("THE CONJURING"));
        assert_eq!(title_key("ＡＢＣ"), "abc");
    }
}
