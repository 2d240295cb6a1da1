use crate::config::{ModelConfig, SimilarityStrategyKind};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::recommend::Recommender;
use crate::similarity::{OnDemandRows, PrecomputedMatrix, SimilaritySource};
use crate::vector::WeightedVector;
use crate::vocab::Vocabulary;
use crate::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, remove_file, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const ARTIFACT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub fingerprint: String,
    pub created_at: String,
    pub version: u32,
    pub config: ModelConfig,
}

/// Header wrapped around `vocabulary.bin` and `vectors.bin`; the payload
/// is only trusted for the corpus whose fingerprint it carries.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusBound<T> {
    pub num_docs: u32,
    pub fingerprint: String,
    pub payload: T,
}

impl<T> CorpusBound<T> {
    fn check(self, what: &str, meta: &MetaFile) -> Result<T> {
        if self.num_docs != meta.num_docs || self.fingerprint != meta.fingerprint {
            return Err(Error::ArtifactMismatch(format!(
                "{what} built for {} docs ({}), meta.json describes {} docs ({})",
                self.num_docs, self.fingerprint, meta.num_docs, meta.fingerprint
            )));
        }
        Ok(self.payload)
    }
}

/// Optional precomputed matrix, bound to the corpus it was computed for.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarityFile {
    pub num_docs: u32,
    pub fingerprint: String,
    pub scores: Vec<f64>,
}

pub struct ModelPaths {
    pub root: PathBuf,
}

impl ModelPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary.bin") }
    fn vectors(&self) -> PathBuf { self.root.join("vectors.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn similarity(&self) -> PathBuf { self.root.join("similarity.bin") }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut f, value)?;
    f.flush()?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(f)?)
}

pub fn save_meta(paths: &ModelPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &ModelPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write vocabulary, vectors, display records and `meta.json`.
/// A `similarity.bin` left by an earlier build is removed.
pub fn save_model(paths: &ModelPaths, model: &Model, config: &ModelConfig) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let stale = paths.similarity();
    if stale.exists() {
        remove_file(&stale)?;
        tracing::debug!(path = %stale.display(), "removed previous similarity matrix");
    }
    let num_docs = model.num_docs() as u32;
    let fingerprint = model.fingerprint();
    write_bin(
        &paths.vocabulary(),
        &CorpusBound { num_docs, fingerprint: fingerprint.to_string(), payload: model.vocabulary() },
    )?;
    write_bin(&paths.vectors(), &CorpusBound { num_docs, fingerprint: fingerprint.to_string(), payload: model.vectors() })?;
    write_bin(&paths.docs(), &model.records())?;
    let meta = MetaFile {
        num_docs,
        num_terms: model.vocabulary().len() as u32,
        fingerprint: fingerprint.to_string(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: ARTIFACT_VERSION,
        config: config.clone(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "model saved");
    Ok(meta)
}

/// Load the model artifacts and verify they all describe the corpus recorded in `meta.json`.
pub fn load_model(paths: &ModelPaths) -> Result<(Model, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != ARTIFACT_VERSION {
        return Err(Error::ArtifactMismatch(format!("artifact version {} (expected {ARTIFACT_VERSION})", meta.version)));
    }
    let vocabulary = read_bin::<CorpusBound<Vocabulary>>(&paths.vocabulary())?.check("vocabulary.bin", &meta)?;
    let vectors = read_bin::<CorpusBound<Vec<WeightedVector>>>(&paths.vectors())?.check("vectors.bin", &meta)?;
    let records: Vec<Record> = read_bin(&paths.docs())?;
    if records.len() != meta.num_docs as usize || vocabulary.len() != meta.num_terms as usize {
        return Err(Error::ArtifactMismatch(format!(
            "meta.json describes {} docs / {} terms, artifacts hold {} docs / {} terms",
            meta.num_docs,
            meta.num_terms,
            records.len(),
            vocabulary.len()
        )));
    }
    let model = Model::from_parts(records, vocabulary, vectors)?;
    if model.fingerprint() != meta.fingerprint {
        return Err(Error::ArtifactMismatch("corpus order differs from meta.json fingerprint".into()));
    }
    Ok((model, meta))
}

pub fn save_similarity(paths: &ModelPaths, model: &Model, matrix: &PrecomputedMatrix) -> Result<()> {
    if matrix.num_docs() != model.num_docs() {
        return Err(Error::ArtifactMismatch(format!(
            "matrix covers {} docs, model has {}",
            matrix.num_docs(),
            model.num_docs()
        )));
    }
    create_dir_all(&paths.root)?;
    let file = SimilarityFile {
        num_docs: model.num_docs() as u32,
        fingerprint: model.fingerprint().to_string(),
        scores: matrix.scores().to_vec(),
    };
    write_bin(&paths.similarity(), &file)
}

/// `Ok(None)` when no matrix was saved; a matrix for a different corpus is an error.
pub fn load_similarity(paths: &ModelPaths, model: &Model) -> Result<Option<PrecomputedMatrix>> {
    let path = paths.similarity();
    if !path.exists() {
        return Ok(None);
    }
    let file: SimilarityFile = read_bin(&path)?;
    if file.num_docs as usize != model.num_docs() || file.fingerprint != model.fingerprint() {
        return Err(Error::ArtifactMismatch(format!(
            "similarity matrix built for {} docs ({}), model has {} docs ({})",
            file.num_docs,
            file.fingerprint,
            model.num_docs(),
            model.fingerprint()
        )));
    }
    PrecomputedMatrix::from_scores(file.num_docs as usize, file.scores).map(Some)
}

/// Load everything needed to serve queries, using the strategy recorded at build time.
/// A precomputed strategy without a saved matrix computes one on load.
pub fn load_recommender(paths: &ModelPaths) -> Result<Recommender> {
    let (model, meta) = load_model(paths)?;
    let config = meta.config;
    let source: Box<dyn SimilaritySource> = match config.strategy {
        SimilarityStrategyKind::Precomputed => match load_similarity(paths, &model)? {
            Some(matrix) => Box::new(matrix),
            None => Box::new(PrecomputedMatrix::build(&model)),
        },
        SimilarityStrategyKind::OnDemand => Box::new(OnDemandRows::new(config.cache_capacity)),
    };
    Ok(Recommender::new(model, source, config.score_precision))
}
