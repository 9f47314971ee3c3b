use super::*;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_vec(value).expect("json serializes")).expect("file written");
    path
}

#[test]
fn loads_paired_index() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(
        &dir,
        "index.json",
        &json!({ "metric": "cosine", "dimension": 2, "vectors": [[1.0, 0.0], [0.0, 1.0]] }),
    );
    let metadata_path = write(
        &dir,
        "metadata.json",
        &json!([
            { "title": "A", "content": "about apples", "url": "https://x/t/a/1", "links": [], "images": [] },
            "raw banana text"
        ]),
    );

    let index = load_index(&index_path, &metadata_path).expect("index should load");

    assert_eq!(index.len(), 2);
    assert_eq!(index.dimension(), 2);
    assert_eq!(index.metric(), DistanceMetric::Cosine);
    assert_eq!(
        index.entries()[1].record,
        DocumentRecord::Text("raw banana text".to_string())
    );
}

#[test]
fn metric_and_dimension_are_optional() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(&dir, "index.json", &json!({ "vectors": [[0.5, 0.5, 0.5]] }));
    let metadata_path = write(&dir, "metadata.json", &json!(["only"]));

    let index = load_index(&index_path, &metadata_path).expect("index should load");

    assert_eq!(index.metric(), DistanceMetric::L2);
    assert_eq!(index.dimension(), 3);
}

#[test]
fn empty_index_is_fatal() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(&dir, "index.json", &json!({ "vectors": [] }));
    let metadata_path = write(&dir, "metadata.json", &json!([]));

    let err = load_index(&index_path, &metadata_path).expect_err("empty index must fail");
    assert!(matches!(err, QaError::Index(_)));
}

#[test]
fn count_mismatch_is_fatal() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(&dir, "index.json", &json!({ "vectors": [[1.0], [2.0]] }));
    let metadata_path = write(&dir, "metadata.json", &json!(["one"]));

    let err = load_index(&index_path, &metadata_path).expect_err("mismatch must fail");
    assert!(err.to_string().contains("2 vectors but metadata has 1"), "{err}");
}

#[test]
fn declared_dimension_must_match_vectors() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(
        &dir,
        "index.json",
        &json!({ "dimension": 384, "vectors": [[1.0, 2.0]] }),
    );
    let metadata_path = write(&dir, "metadata.json", &json!(["one"]));

    assert!(matches!(
        load_index(&index_path, &metadata_path),
        Err(QaError::Index(_))
    ));
}

#[test]
fn missing_or_malformed_files_are_fatal() {
    let dir = TempDir::new().expect("should create temp dir");
    let index_path = write(&dir, "index.json", &json!({ "vectors": [[1.0]] }));
    let bad_metadata = write(&dir, "metadata.json", &json!([1, 2, 3]));

    assert!(matches!(
        load_index(&index_path, &dir.path().join("missing.json")),
        Err(QaError::Index(_))
    ));
    assert!(matches!(
        load_index(&dir.path().join("missing.json"), &bad_metadata),
        Err(QaError::Index(_))
    ));
    assert!(matches!(
        load_index(&index_path, &bad_metadata),
        Err(QaError::Index(_))
    ));
}

#[test]
fn index_file_roundtrip() {
    let file = IndexFile {
        metric: DistanceMetric::InnerProduct,
        dimension: None,
        vectors: vec![vec![0.25, 0.75]],
    };

    let text = serde_json::to_string(&file).expect("serializes");
    assert!(text.contains("\"inner_product\""));
    assert!(!text.contains("dimension"));
    assert_eq!(
        serde_json::from_str::<IndexFile>(&text).expect("parses"),
        file
    );
}
