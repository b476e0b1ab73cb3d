use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use postings_core::{Document, FieldName, IndexBuilder};
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path, extra: &[(&str, &str)]) {
    let mut builder = IndexBuilder::standard(dir);
    let base = [("d1", "cocoa cocoa demand"), ("d2", "cocoa demand demand"), ("d3", "grain")];
    for (id, content) in base.iter().chain(extra) {
        let doc = Document::new().with_field(FieldName::FileId, *id).with_field(FieldName::Content, *content);
        builder.add_document(&doc).unwrap();
    }
    builder.close().unwrap();
}

async fn call(app: Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("X-ADMIN-TOKEN", t);
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn app_for(dir: &std::path::Path) -> Router {
    server::build_app(dir.to_string_lossy().to_string()).unwrap()
}

#[tokio::test]
async fn query_returns_documents_containing_all_terms() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &[]);

    let (status, json) = call(app_for(dir.path()), "GET", "/query?q=Cocoa%20demand", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr[0]["doc_id"], "d1");
    assert_eq!(arr[0]["frequency"], 3);
    assert_eq!(arr[1]["doc_id"], "d2");
    assert_eq!(arr[1]["frequency"], 3);
}

#[tokio::test]
async fn query_with_unknown_term_is_not_found() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &[]);

    let (status, json) = call(app_for(dir.path()), "GET", "/query?q=cocoa%20zebra", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown term: zebra");

    let (status, _) = call(app_for(dir.path()), "GET", "/query?q=cocoa%20grain", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn postings_stats_and_top_k() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &[]);
    let app = app_for(dir.path());

    let (status, json) = call(app.clone(), "GET", "/postings/Cocoa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["term"], "cocoa");
    assert_eq!(json["postings"]["d1"], 2);
    assert_eq!(json["postings"]["d2"], 1);
    assert_eq!(json["total_document_frequency"], 2);

    let (status, _) = call(app.clone(), "GET", "/postings/zebra", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(app.clone(), "GET", "/stats", None).await;
    assert_eq!(json["key_terms"], 3);
    assert_eq!(json["value_terms"], 3);

    let (status, json) = call(app.clone(), "GET", "/topk?k=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let terms: Vec<&str> = json["terms"].as_array().unwrap().iter().map(|t| t["term"].as_str().unwrap()).collect();
    assert_eq!(terms, vec!["cocoa", "demand"]);

    let (status, _) = call(app, "GET", "/topk?k=0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    std::env::set_var("ADMIN_TOKEN", "secret");
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &[]);
    let app = app_for(dir.path());

    let (status, _) = call(app.clone(), "POST", "/index/reload", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    build_tiny_index(dir.path(), &[("d4", "wheat harvest")]);
    let (status, json) = call(app.clone(), "POST", "/index/reload", Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key_terms"], 5);
    assert_eq!(json["value_terms"], 4);

    let (_, json) = call(app, "GET", "/stats", None).await;
    assert_eq!(json["value_terms"], 4);
}

#[tokio::test]
async fn postings_can_be_looked_up_per_field() {
    let dir = tempdir().unwrap();
    let mut builder = IndexBuilder::standard(dir.path());
    let doc = Document::new()
        .with_field(FieldName::FileId, "d1")
        .with_field(FieldName::Place, "Paris")
        .with_field(FieldName::Content, "wheat");
    builder.add_document(&doc).unwrap();
    builder.close().unwrap();
    let app = app_for(dir.path());

    let (status, json) = call(app.clone(), "GET", "/postings/Paris?field=place", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["term"], "paris");
    assert_eq!(json["postings"]["d1"], 1);

    // CONTENT stems the path term, which misses the keyword-analyzed place
    let (status, json) = call(app.clone(), "GET", "/postings/Paris", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown term: pari");

    let (status, _) = call(app, "GET", "/postings/Paris?field=planet", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_frequencies_are_summed_without_overflow() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(postings_core::INDEX_FILE),
        "wheat=d1@4000000000@4000000000@1\ngrain=d1@4000000000@4000000000@1\n",
    )
    .unwrap();

    let (status, json) = call(app_for(dir.path()), "GET", "/query?q=wheat%20grain", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["frequency"], 8_000_000_000u64);
}

#[test]
fn missing_index_fails_at_startup() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    assert!(server::build_app(root.clone()).is_err());

    let err = server::check_index_dir(&root).unwrap_err();
    assert!(err.to_string().contains("indexFile.properties not found"), "{err}");
    let gone = dir.path().join("gone").to_string_lossy().to_string();
    assert!(server::check_index_dir(&gone).unwrap_err().to_string().contains("does not exist"));

    build_tiny_index(dir.path(), &[]);
    assert_eq!(server::check_index_dir(&root).unwrap(), dir.path().join("indexFile.properties"));
}
