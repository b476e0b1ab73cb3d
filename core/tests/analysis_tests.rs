use postings_core::{FieldName, Pipeline};

fn words(field: FieldName, text: &str) -> Vec<String> {
    Pipeline::standard()
        .analyze(field, text, false)
        .unwrap()
        .iter()
        .map(|t| t.to_string())
        .collect()
}

#[test]
fn it_normalizes_and_stems_content() {
    let w = words(FieldName::Content, "Running Runners RUN! The café's menu.");
    assert!(w.contains(&"run".to_string()));
    // NFKC + lowercase keeps the accent, the stemmer drops the possessive
    assert!(w.iter().any(|t| t.starts_with("café")));
    assert!(w.contains(&"menu".to_string()));
}

#[test]
fn it_filters_stopwords_only_in_text_fields() {
    let content = words(FieldName::Content, "The quick brown fox and the lazy dog");
    assert!(!content.contains(&"the".to_string()));
    assert!(!content.contains(&"and".to_string()));

    let org = words(FieldName::AuthorOrg, "The Bank of England");
    assert_eq!(org, vec!["the", "bank", "of", "england"]);
}

#[test]
fn it_keeps_dates_as_keywords() {
    assert_eq!(words(FieldName::NewsDate, "March 26, 1987"), vec!["march", "26", "1987"]);
}

#[test]
fn query_terms_match_indexed_terms() {
    let pipeline = Pipeline::standard();
    let indexed = words(FieldName::Content, "Exporters raised coffee quotas");
    assert_eq!(pipeline.normalize_query("exporter QUOTA"), vec![indexed[0].clone(), indexed[3].clone()]);
}
