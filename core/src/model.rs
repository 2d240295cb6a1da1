use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::vector::{self, WeightedVector};
use crate::vocab::Vocabulary;
use crate::{DocId, Posting, Record};
use sha1::{Digest, Sha1};

/// Immutable fitted model: the corpus in order, its vocabulary and one weighted vector per
/// record, plus an inverted term index used to compute similarity rows.
#[derive(Debug, Clone)]
pub struct Model {
    records: Vec<Record>,
    vocabulary: Vocabulary,
    vectors: Vec<WeightedVector>,
    postings: Vec<Vec<Posting>>, // by term id, sorted by doc_id
    fingerprint: String,
}

impl Model {
    pub fn fit(records: Vec<Record>, config: &ModelConfig) -> Result<Self> {
        let (vocabulary, vectors) = vector::fit(&records, config)?;
        tracing::info!(num_docs = records.len(), num_terms = vocabulary.len(), "model fitted");
        Self::from_parts(records, vocabulary, vectors)
    }

    /// Assemble a model from loaded or freshly fitted parts, checking they describe the same corpus.
    pub fn from_parts(records: Vec<Record>, vocabulary: Vocabulary, vectors: Vec<WeightedVector>) -> Result<Self> {
        if records.len() != vectors.len() || vocabulary.num_docs as usize != records.len() {
            return Err(Error::ArtifactMismatch(format!(
                "{} records, {} vectors, vocabulary fitted on {} documents",
                records.len(),
                vectors.len(),
                vocabulary.num_docs
            )));
        }
        let num_terms = vocabulary.df.len();
        if vocabulary.dictionary.len() != num_terms {
            return Err(Error::ArtifactMismatch(format!(
                "vocabulary has {} terms but {num_terms} document frequencies",
                vocabulary.dictionary.len()
            )));
        }
        if let Some((term, id)) = vocabulary.dictionary.iter().find(|&(_, &id)| id as usize >= num_terms) {
            return Err(Error::ArtifactMismatch(format!("term {term:?} has id {id} beyond vocabulary of {num_terms}")));
        }
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); num_terms];
        for (doc_id, v) in vectors.iter().enumerate() {
            for &(term_id, weight) in v.entries() {
                let list = postings.get_mut(term_id as usize).ok_or_else(|| {
                    Error::ArtifactMismatch(format!("document {doc_id} references term {term_id} beyond vocabulary of {num_terms}"))
                })?;
                list.push(Posting { doc_id: doc_id as DocId, weight });
            }
        }
        let fingerprint = fingerprint(&records);
        Ok(Self { records, vocabulary, vectors, postings, fingerprint })
    }

    pub fn num_docs(&self) -> usize { self.records.len() }

    pub fn records(&self) -> &[Record] { &self.records }

    pub fn record(&self, doc_id: DocId) -> Option<&Record> { self.records.get(doc_id as usize) }

    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }

    pub fn vectors(&self) -> &[WeightedVector] { &self.vectors }

    pub fn postings(&self, term_id: usize) -> &[Posting] { &self.postings[term_id] }

    /// SHA-1 over `(id, title)` in corpus order; binds artifacts to this exact corpus.
    pub fn fingerprint(&self) -> &str { &self.fingerprint }
}

pub fn fingerprint(records: &[Record]) -> String {
    let mut hasher = Sha1::new();
    for r in records {
        hasher.update(r.id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(r.title.as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}
