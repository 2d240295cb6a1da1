use reelsim_core::{DocFrequency, Error, Model, ModelConfig, Record, Recommender, SimilarityStrategyKind};

fn record(id: &str, title: &str, description: &str) -> Record {
    Record {
        id: id.into(),
        title: title.into(),
        genres: vec![],
        director: String::new(),
        cast: vec![],
        country: vec![],
        rating: String::new(),
        description: description.into(),
        duration: String::new(),
    }
}

fn relaxed(strategy: SimilarityStrategyKind) -> ModelConfig {
    ModelConfig {
        min_df: DocFrequency::Count(1),
        max_df: DocFrequency::Proportion(1.0),
        strategy,
        ..ModelConfig::default()
    }
}

fn wizards(strategy: SimilarityStrategyKind) -> Recommender {
    let records = vec![
        record("1", "A", "wizard magic wizard"),
        record("2", "B", "wizard magic school"),
        record("3", "C", "pirate ship ocean"),
    ];
    let config = relaxed(strategy);
    Recommender::from_config(Model::fit(records, &config).unwrap(), &config)
}

fn catalog() -> Vec<Record> {
    let rows = [
        ("Haunted House", "Horror Movies", "James Wan", "a family moves into a haunted house"),
        ("Haunted Manor", "Horror Movies", "James Wan", "ghosts haunt a family manor"),
        ("Space Race", "Sci-Fi Movies", "Ridley Scott", "astronauts race to mars"),
        ("Mars Colony", "Sci-Fi Movies", "Ridley Scott", "colonists survive on mars"),
        ("Kitchen Wars", "Reality TV", "Unknown", "chefs compete in a kitchen"),
        ("Haunted Kitchen", "Horror Movies", "Unknown", "a haunted kitchen terrifies chefs"),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (title, genre, director, desc))| Record {
            id: format!("s{i}"),
            title: title.to_string(),
            genres: vec![genre.to_string()],
            director: director.to_string(),
            cast: vec!["Unknown".into()],
            country: vec!["United States".into()],
            rating: "PG-13".into(),
            description: desc.to_string(),
            duration: "90 min".into(),
        })
        .collect()
}

#[test]
fn shared_vocabulary_ranks_higher() {
    let rec = wizards(SimilarityStrategyKind::OnDemand);
    let out = rec.recommend("A", 2).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].title, "B");
    assert_eq!(out[1].title, "C");
    assert!(out[0].similarity > out[1].similarity);
}

#[test]
fn title_lookup_is_case_insensitive() {
    let rec = wizards(SimilarityStrategyKind::Precomputed);
    assert_eq!(rec.recommend("a", 1).unwrap(), rec.recommend("A", 1).unwrap());
}

#[test]
fn unknown_title_is_not_found() {
    let rec = wizards(SimilarityStrategyKind::OnDemand);
    let err = rec.recommend("Nonexistent Title", 5).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_recoverable());
}

#[test]
fn zero_top_n_is_rejected() {
    let rec = wizards(SimilarityStrategyKind::OnDemand);
    assert!(matches!(rec.recommend("A", 0), Err(Error::InvalidQuery(_))));
}

#[test]
fn results_are_bounded_sorted_and_exclude_query() {
    let config = ModelConfig::default();
    let rec = Recommender::from_config(Model::fit(catalog(), &config).unwrap(), &config);
    for r in catalog() {
        let query = rec.resolve(&r.title).unwrap();
        for n in [1, 3, 10] {
            let out = rec.recommend(&r.title, n).unwrap();
            assert!(out.len() <= n);
            assert!(out.iter().all(|e| e.doc_id != query));
            assert!(out.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        }
    }
    // everything else comes back when top_n covers the corpus
    assert_eq!(rec.recommend("Space Race", 100).unwrap().len(), 5);
    assert_eq!(rec.recommend("Space Race", 1).unwrap()[0].title, "Mars Colony");
}

#[test]
fn scores_are_rounded_to_three_places() {
    let config = ModelConfig::default();
    let rec = Recommender::from_config(Model::fit(catalog(), &config).unwrap(), &config);
    for e in rec.recommend("Haunted House", 5).unwrap() {
        assert_eq!(e.similarity, (e.similarity * 1000.0).round() / 1000.0);
    }
}

#[test]
fn strategies_return_identical_rankings() {
    let eager_cfg = ModelConfig { strategy: SimilarityStrategyKind::Precomputed, ..ModelConfig::default() };
    let lazy_cfg = ModelConfig { strategy: SimilarityStrategyKind::OnDemand, cache_capacity: 0, ..ModelConfig::default() };
    let eager = Recommender::from_config(Model::fit(catalog(), &eager_cfg).unwrap(), &eager_cfg);
    let lazy = Recommender::from_config(Model::fit(catalog(), &lazy_cfg).unwrap(), &lazy_cfg);
    for r in catalog() {
        assert_eq!(eager.recommend(&r.title, 5).unwrap(), lazy.recommend(&r.title, 5).unwrap());
    }
}

#[test]
fn duplicate_titles_resolve_to_first() {
    let records = vec![
        record("1", "Twin", "wizard magic"),
        record("2", "twin", "wizard school"),
        record("3", "Other", "pirate ship"),
    ];
    let config = relaxed(SimilarityStrategyKind::OnDemand);
    let rec = Recommender::from_config(Model::fit(records, &config).unwrap(), &config);
    assert_eq!(rec.resolve("TWIN").unwrap(), 0);
    let out = rec.recommend("twin", 2).unwrap();
    assert!(out.iter().all(|e| e.doc_id != 0));
}

#[test]
fn ties_keep_corpus_order() {
    let records = vec![
        record("1", "Query", "wizard"),
        record("2", "First", "pirate"),
        record("3", "Second", "ocean"),
    ];
    let config = relaxed(SimilarityStrategyKind::OnDemand);
    let rec = Recommender::from_config(Model::fit(records, &config).unwrap(), &config);
    let titles: Vec<_> = rec.recommend("Query", 2).unwrap().into_iter().map(|e| e.title).collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[test]
fn default_bounds_drop_rare_and_ubiquitous_terms() {
    let model = Model::fit(catalog(), &ModelConfig::default()).unwrap();
    let vocab = model.vocabulary();
    let n = model.num_docs() as u32;
    assert!(vocab.df.iter().all(|&df| df >= 2 && df < n));
    // "united states" is in every record
    assert!(vocab.term_id("united").is_none());
    for v in model.vectors().iter().filter(|v| !v.is_zero()) {
        assert!((v.norm() - 1.0).abs() < 1e-6);
    }
}
