use reelsim_core::persist::{load_model, load_recommender, load_similarity, save_model, save_similarity, ModelPaths};
use reelsim_core::similarity::PrecomputedMatrix;
use reelsim_core::{Error, Model, ModelConfig, Record, Recommender, SimilarityStrategyKind};
use std::fs;
use tempfile::tempdir;

fn corpus() -> Vec<Record> {
    let rows = [
        ("Ghost Ship", "Horror Movies", "a ghost haunts a cargo ship"),
        ("Ghost Town", "Horror Movies", "a ghost haunts a mining town"),
        ("Ocean Race", "Sports Movies", "sailors race across the ocean"),
        ("Ocean Rescue", "Sports Movies", "sailors rescue a cargo ship"),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (title, genre, desc))| {
            let mut r = Record::with_title(format!("s{i}"), *title);
            r.genres = vec![genre.to_string()];
            r.description = desc.to_string();
            r
        })
        .collect()
}

#[test]
fn saved_model_answers_like_the_original() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    let config = ModelConfig { strategy: SimilarityStrategyKind::Precomputed, ..ModelConfig::default() };
    let model = Model::fit(corpus(), &config).unwrap();
    save_model(&paths, &model, &config).unwrap();
    save_similarity(&paths, &model, &PrecomputedMatrix::build(&model)).unwrap();

    let original = Recommender::from_config(model, &config);
    let loaded = load_recommender(&paths).unwrap();
    assert_eq!(loaded.strategy(), SimilarityStrategyKind::Precomputed);
    for title in ["Ghost Ship", "ocean race"] {
        assert_eq!(original.recommend(title, 3).unwrap(), loaded.recommend(title, 3).unwrap());
    }
}

#[test]
fn similarity_for_another_corpus_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    let config = ModelConfig::default();

    let mut reordered = corpus();
    reordered.swap(0, 1);
    let other = Model::fit(reordered, &config).unwrap();
    let model = Model::fit(corpus(), &config).unwrap();
    save_model(&paths, &model, &config).unwrap();
    save_similarity(&paths, &other, &PrecomputedMatrix::build(&other)).unwrap();

    let (loaded, meta) = load_model(&paths).unwrap();
    assert_eq!(meta.num_docs, 4);
    assert!(matches!(load_similarity(&paths, &loaded), Err(Error::ArtifactMismatch(_))));
}

#[test]
fn tampered_meta_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    let config = ModelConfig::default();
    let model = Model::fit(corpus(), &config).unwrap();
    let mut meta = save_model(&paths, &model, &config).unwrap();
    meta.num_docs += 1;
    reelsim_core::persist::save_meta(&paths, &meta).unwrap();
    assert!(matches!(load_model(&paths), Err(Error::ArtifactMismatch(_))));
}

#[test]
fn missing_similarity_is_optional() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    let config = ModelConfig::default();
    let model = Model::fit(corpus(), &config).unwrap();
    save_model(&paths, &model, &config).unwrap();
    assert!(load_similarity(&paths, &model).unwrap().is_none());
    assert_eq!(load_recommender(&paths).unwrap().strategy(), SimilarityStrategyKind::OnDemand);
}

fn save_reordered(config: &ModelConfig) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let mut reordered = corpus();
    reordered.swap(0, 2);
    let model = Model::fit(reordered, config).unwrap();
    save_model(&ModelPaths::new(dir.path()), &model, config).unwrap();
    dir
}

#[test]
fn vectors_from_a_reordered_build_are_rejected() {
    let config = ModelConfig::default();
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    save_model(&paths, &Model::fit(corpus(), &config).unwrap(), &config).unwrap();
    let other = save_reordered(&config);

    fs::copy(other.path().join("vectors.bin"), dir.path().join("vectors.bin")).unwrap();
    assert!(matches!(load_model(&paths), Err(Error::ArtifactMismatch(_))));
    assert!(matches!(load_recommender(&paths), Err(Error::ArtifactMismatch(_))));
}

#[test]
fn vocabulary_from_a_reordered_build_is_rejected() {
    let config = ModelConfig::default();
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    save_model(&paths, &Model::fit(corpus(), &config).unwrap(), &config).unwrap();
    let other = save_reordered(&config);

    fs::copy(other.path().join("vocabulary.bin"), dir.path().join("vocabulary.bin")).unwrap();
    assert!(matches!(load_model(&paths), Err(Error::ArtifactMismatch(_))));
}

#[test]
fn rebuild_without_matrix_drops_the_old_one() {
    let dir = tempdir().unwrap();
    let paths = ModelPaths::new(dir.path());
    let eager = ModelConfig { strategy: SimilarityStrategyKind::Precomputed, ..ModelConfig::default() };
    let model = Model::fit(corpus(), &eager).unwrap();
    save_model(&paths, &model, &eager).unwrap();
    save_similarity(&paths, &model, &PrecomputedMatrix::build(&model)).unwrap();
    assert!(paths.similarity().exists());

    let mut reordered = corpus();
    reordered.swap(1, 3);
    let lazy = ModelConfig::default();
    save_model(&paths, &Model::fit(reordered, &lazy).unwrap(), &lazy).unwrap();
    assert!(!paths.similarity().exists());
    assert_eq!(load_recommender(&paths).unwrap().strategy(), SimilarityStrategyKind::OnDemand);
}
