use reelsim_core::soup::build_soup;
use reelsim_core::tokenizer::{normalize_fragment, term_counts, terms};
use reelsim_core::Record;

#[test]
fn it_normalizes_fragments() {
    assert_eq!(normalize_fragment("Action & Adventure"), "action adventure");
    // unicode word characters survive
    assert_eq!(normalize_fragment("Amélie!"), "amélie");
}

#[test]
fn it_filters_stopwords_from_unigrams_only() {
    let t = terms("the lord of the rings");
    assert!(!t.contains(&"the".to_string()));
    assert!(!t.contains(&"of".to_string()));
    assert!(t.contains(&"lord".to_string()));
    assert!(t.contains(&"lord of".to_string()));
    assert!(t.contains(&"the rings".to_string()));
}

#[test]
fn it_counts_weighted_soup_terms() {
    let mut record = Record::with_title("s1", "Spirited Away");
    record.genres = vec!["Anime Features".into()];
    let counts = term_counts(&build_soup(&record));
    assert_eq!(counts["spirited"], 2);
    assert_eq!(counts["anime features"], 3);
    assert_eq!(counts["unknown"], 4);
}
