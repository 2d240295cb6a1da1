//! Cosine similarity between unit-length weighted vectors, and the two ways of serving
//! a similarity row: a precomputed N x N matrix or per-query rows with a single-flight cache.

use crate::config::{ModelConfig, SimilarityStrategyKind};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::vector::WeightedVector;
use crate::DocId;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

#[inline]
fn clamp_unit(x: f64) -> f64 { x.clamp(0.0, 1.0) }

/// Dot product of two normalized vectors, clamped to `[0, 1]`.
pub fn similarity(a: &WeightedVector, b: &WeightedVector) -> f64 { clamp_unit(a.dot(b)) }

/// Similarity of document `i` against every document, in corpus order.
pub fn similarity_row(i: DocId, vectors: &[WeightedVector]) -> Vec<f64> {
    let query = &vectors[i as usize];
    vectors.iter().map(|v| similarity(query, v)).collect()
}

/// Same result as [`similarity_row`], accumulated through the model's postings so only
/// documents sharing a term with `doc` are touched.
pub fn row_from_postings(model: &Model, doc: DocId) -> Vec<f64> {
    let mut scores = vec![0.0f64; model.num_docs()];
    for &(term_id, weight) in model.vectors()[doc as usize].entries() {
        for p in model.postings(term_id as usize) {
            scores[p.doc_id as usize] += weight * p.weight;
        }
    }
    for s in scores.iter_mut() { *s = clamp_unit(*s); }
    scores
}

/// A similarity row borrowed from a matrix or shared out of a cache.
pub enum Row<'a> {
    Borrowed(&'a [f64]),
    Shared(Arc<[f64]>),
}

impl Deref for Row<'_> {
    type Target = [f64];
    fn deref(&self) -> &[f64] {
        match self {
            Row::Borrowed(r) => r,
            Row::Shared(r) => r,
        }
    }
}

pub trait SimilaritySource: Send + Sync {
    fn kind(&self) -> SimilarityStrategyKind;
    fn row<'a>(&'a self, model: &Model, doc: DocId) -> Row<'a>;
}

/// Build the source selected by `config`.
pub fn from_config(model: &Model, config: &ModelConfig) -> Box<dyn SimilaritySource> {
    match config.strategy {
        SimilarityStrategyKind::Precomputed => Box::new(PrecomputedMatrix::build(model)),
        SimilarityStrategyKind::OnDemand => Box::new(OnDemandRows::new(config.cache_capacity)),
    }
}

/// Row-major N x N similarity matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedMatrix {
    num_docs: usize,
    scores: Vec<f64>,
}

impl PrecomputedMatrix {
    pub fn build(model: &Model) -> Self {
        let n = model.num_docs();
        let rows: Vec<Vec<f64>> = (0..n as DocId).into_par_iter().map(|doc| row_from_postings(model, doc)).collect();
        let scores = rows.into_iter().flatten().collect();
        tracing::info!(num_docs = n, "similarity matrix precomputed");
        Self { num_docs: n, scores }
    }

    pub fn from_scores(num_docs: usize, scores: Vec<f64>) -> Result<Self> {
        if scores.len() != num_docs * num_docs {
            return Err(Error::ArtifactMismatch(format!(
                "similarity matrix holds {} scores, expected {num_docs}^2",
                scores.len()
            )));
        }
        Ok(Self { num_docs, scores })
    }

    pub fn num_docs(&self) -> usize { self.num_docs }

    pub fn scores(&self) -> &[f64] { &self.scores }

    pub fn row_slice(&self, doc: DocId) -> &[f64] {
        let start = doc as usize * self.num_docs;
        &self.scores[start..start + self.num_docs]
    }
}

impl SimilaritySource for PrecomputedMatrix {
    fn kind(&self) -> SimilarityStrategyKind { SimilarityStrategyKind::Precomputed }

    fn row<'a>(&'a self, _model: &Model, doc: DocId) -> Row<'a> { Row::Borrowed(self.row_slice(doc)) }
}

type Slot = Arc<OnceLock<Arc<[f64]>>>;

#[derive(Default)]
struct Slots {
    by_doc: HashMap<DocId, Slot>,
    order: VecDeque<DocId>, // insertion order, oldest first
}

/// Rows computed per query. With a nonzero capacity, rows are cached and concurrent
/// requests for the same document wait on one computation.
pub struct OnDemandRows {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl OnDemandRows {
    pub fn new(capacity: usize) -> Self { Self { capacity, slots: Mutex::new(Slots::default()) } }

    fn slot(&self, doc: DocId) -> Slot {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.by_doc.get(&doc) {
            tracing::debug!(doc, "similarity row cache hit");
            return slot.clone();
        }
        while slots.order.len() >= self.capacity {
            let Some(oldest) = slots.order.pop_front() else { break };
            slots.by_doc.remove(&oldest);
        }
        let slot: Slot = Arc::new(OnceLock::new());
        slots.by_doc.insert(doc, slot.clone());
        slots.order.push_back(doc);
        slot
    }

    pub fn cached_rows(&self) -> usize { self.slots.lock().by_doc.len() }
}

impl SimilaritySource for OnDemandRows {
    fn kind(&self) -> SimilarityStrategyKind { SimilarityStrategyKind::OnDemand }

    fn row<'a>(&'a self, model: &Model, doc: DocId) -> Row<'a> {
        if self.capacity == 0 {
            return Row::Shared(row_from_postings(model, doc).into());
        }
        // the map lock is released before computing; OnceLock blocks duplicate initializers
        let slot = self.slot(doc);
        let row = slot.get_or_init(|| row_from_postings(model, doc).into()).clone();
        Row::Shared(row)
    }
}
