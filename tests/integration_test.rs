//! Integration test: config load, artifact load, scoring pipeline, HTTP surface.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use ids_demo::{
    config::{DemoConfig, ModelConfig},
    load_artifact,
    model::{nsl_kdd, ClassLabel, ClassProbabilities, Classifier, ColumnKind, FeatureSchema, ModelError},
    router,
    scoring::{round4, ScoringError, EXPORT_FILE_NAME, USER_MESSAGE},
    AppState, FeatureTable, ScoringPipeline, Value,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

fn demos() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn sample_csv() -> Vec<u8> {
    std::fs::read(demos().join("sample_records.csv")).unwrap()
}

fn demo_classifier() -> Arc<dyn Classifier> {
    let config = ModelConfig {
        path: demos().join("ids_scorecard.json"),
        ..ModelConfig::default()
    };
    load_artifact(&config).unwrap()
}

/// Upload with the NSL-KDD `flag` column removed.
fn mismatched_csv() -> Vec<u8> {
    let table = FeatureTable::from_csv(&sample_csv()).unwrap();
    let drop = table.column_index("flag").unwrap();
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != drop)
        .map(|(_, c)| c.clone())
        .collect();
    let rows = table
        .rows()
        .iter()
        .map(|r| {
            r.iter()
                .enumerate()
                .filter(|(i, _)| *i != drop)
                .map(|(_, v)| v.clone())
                .collect()
        })
        .collect();
    FeatureTable::new(columns, rows).unwrap().to_csv().unwrap()
}

/// Labels every even row as an intrusion; declares no schema.
struct AlternatingClassifier;

impl Classifier for AlternatingClassifier {
    fn name(&self) -> &str {
        "alternating"
    }

    fn schema(&self) -> Option<&FeatureSchema> {
        None
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<ClassLabel>, ModelError> {
        (0..table.len())
            .map(|i| ClassLabel::from_code(if i % 2 == 0 { 1 } else { 0 }))
            .collect()
    }

    fn predict_proba(&self, table: &FeatureTable) -> Result<Vec<ClassProbabilities>, ModelError> {
        Ok((0..table.len())
            .map(|i| ClassProbabilities::from_intrusion(if i % 2 == 0 { 0.876549 } else { 0.123451 }))
            .collect())
    }
}

#[test]
fn config_load_default() {
    let c = DemoConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.model.path, PathBuf::from("ids_model.onnx"));
    assert_eq!(c.render.preview_rows, 10);
    assert_eq!(c.render.result_rows, 20);
}

#[test]
fn demo_config_points_at_scorecard() {
    let c = DemoConfig::load(&demos().join("config.json"));
    assert_eq!(c.model.path, PathBuf::from("demos/ids_scorecard.json"));
}

#[test]
fn demo_scorecard_declares_nsl_kdd_features() {
    let classifier = demo_classifier();
    let schema = classifier.schema().unwrap();
    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names, nsl_kdd::FEATURE_COLUMNS);
    for spec in &schema.columns {
        let categorical = matches!(spec.kind, ColumnKind::Categorical { .. });
        assert_eq!(categorical, nsl_kdd::is_categorical(&spec.name), "{}", spec.name);
    }
}

#[test]
fn pipeline_preserves_rows_and_labels() {
    let pipeline = ScoringPipeline::new(demo_classifier());
    let input = pipeline.decode(&sample_csv()).unwrap();
    let result = pipeline.score(&input).unwrap();

    assert_eq!(result.table.len(), input.len());
    assert_eq!(&result.table.columns()[..input.width()], input.columns());
    assert_eq!(result.table.columns()[input.width()], "prediction");
    assert_eq!(result.table.columns()[input.width() + 1], "attack_probability");

    for (i, (out_row, in_row)) in result.table.rows().iter().zip(input.rows()).enumerate() {
        assert_eq!(&out_row[..input.width()], &in_row[..]);
        let label = result.labels[i];
        assert_eq!(out_row[input.width()], Value::text(label.as_str()));

        let p = result.attack_probabilities[i];
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(round4(p), p);
        assert_eq!(out_row[input.width() + 1], Value::Float(p));
        // scorecard threshold is 0.5
        assert_eq!(label == ClassLabel::Intrusion, p >= 0.5, "row {}", i);
    }

    let s = result.summary;
    assert_eq!(s.normal + s.intrusion, s.total);
    assert_eq!((s.normal, s.intrusion, s.total), (8, 4, 12));
}

#[test]
fn substituted_classifier_drives_labels() {
    let pipeline = ScoringPipeline::new(Arc::new(AlternatingClassifier));
    let result = pipeline.run(b"a,b\n1,x\n2,y\n3,z\n").unwrap();

    let labels: Vec<&str> = result.labels.iter().map(|l| l.as_str()).collect();
    assert_eq!(labels, ["INTRUSION", "NORMAL", "INTRUSION"]);
    assert_eq!(result.attack_probabilities, vec![0.8765, 0.1235, 0.8765]);
    assert_eq!(result.summary.intrusion, 2);
    assert_eq!(result.summary.normal, 1);
}

#[test]
fn exported_csv_decodes_to_result_table() {
    let pipeline = ScoringPipeline::new(demo_classifier());
    let result = pipeline.run(&sample_csv()).unwrap();
    let csv = result.to_csv().unwrap();

    let text = String::from_utf8(csv.clone()).unwrap();
    assert!(text.lines().next().unwrap().ends_with(",prediction,attack_probability"));
    assert_eq!(text.lines().count(), result.table.len() + 1);

    let decoded = FeatureTable::from_csv(&csv).unwrap();
    assert_eq!(decoded, result.table);
}

#[test]
fn schema_mismatch_is_a_model_error() {
    let pipeline = ScoringPipeline::new(demo_classifier());
    let err = pipeline.run(&mismatched_csv()).unwrap_err();
    assert!(matches!(err, ScoringError::Model(ModelError::SchemaMismatch(_))));
    assert!(err.detail().contains("missing: flag"), "{}", err.detail());
    assert_eq!(err.kind(), "predict");
}

#[test]
fn nan_cell_fails_prediction_as_missing_value() {
    let text = String::from_utf8(sample_csv()).unwrap();
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    // src_bytes is the fifth column
    let mut cells: Vec<&str> = lines[1].split(',').collect();
    cells[4] = "NAN";
    let edited = cells.join(",");
    lines[1] = edited;
    let upload = lines.join("\n") + "\n";

    let pipeline = ScoringPipeline::new(demo_classifier());
    let table = pipeline.decode(upload.as_bytes()).unwrap();
    let col = table.column_index("src_bytes").unwrap();
    assert_eq!(table.rows()[0][col], Value::Missing);

    let err = pipeline.score(&table).unwrap_err();
    assert!(
        matches!(err, ScoringError::Model(ModelError::MissingValue { row: 0, ref column }) if column == "src_bytes"),
        "{}",
        err
    );
    assert_eq!(err.kind(), "predict");
    assert!(err.detail().contains("Input contains NaN"));
}

#[test]
fn header_only_upload_is_rejected() {
    let pipeline = ScoringPipeline::new(demo_classifier());
    let header = nsl_kdd::FEATURE_COLUMNS.join(",") + "\n";
    assert!(matches!(pipeline.run(header.as_bytes()), Err(ScoringError::NoRows)));
}

#[test]
fn malformed_csv_is_a_decode_error() {
    let pipeline = ScoringPipeline::new(demo_classifier());
    let err = pipeline.run(b"a,b\n1,2,3\n").unwrap_err();
    assert_eq!(err.kind(), "decode");
}

// --- HTTP surface ---

const BOUNDARY: &str = "ids-demo-test-boundary";

fn multipart(uri: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n",
        b = BOUNDARY,
        f = file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn app() -> axum::Router {
    router(AppState::new(demo_classifier(), &DemoConfig::default()))
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn index_prompts_for_upload() {
    let resp = app()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Upload a CSV to start."));
    assert!(html.contains("Upload CSV file"));
    assert!(!html.contains("Download predictions as CSV"));
}

#[tokio::test]
async fn form_without_file_shows_prompt_only() {
    let resp = app().oneshot(multipart("/", "", b"")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Upload a CSV to start."));
    assert!(!html.contains("Predictions</h3>"));
    assert!(!html.contains(EXPORT_FILE_NAME));
}

#[tokio::test]
async fn upload_renders_preview_predictions_summary_and_download() {
    let resp = app()
        .oneshot(multipart("/", "KDDTest.csv", &sample_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Preview of Uploaded Data"));
    assert!(html.contains("Predictions</h3>"));
    assert!(html.contains("Normal: <b>8</b> | Intrusion: <b>4</b> | Total: <b>12</b>"));
    assert!(html.contains(&format!("download=\"{}\"", EXPORT_FILE_NAME)));
    assert!(!html.contains("Prediction failed"));
}

#[tokio::test]
async fn mismatched_upload_shows_error_without_results() {
    let resp = app()
        .oneshot(multipart("/", "wrong.csv", &mismatched_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Preview of Uploaded Data"));
    assert!(html.contains("Prediction failed. Most likely: your CSV columns don&#39;t match"));
    assert!(html.contains("missing: flag"));
    assert!(!html.contains("Predictions</h3>"));
    assert!(!html.contains("Download predictions as CSV"));
}

#[tokio::test]
async fn csv_endpoint_returns_attachment() {
    let resp = app()
        .oneshot(multipart("/api/v1/predictions/csv", "records.csv", &sample_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"ids_predictions.csv\"");

    let body = body_text(resp).await;
    let table = FeatureTable::from_csv(body.as_bytes()).unwrap();
    assert_eq!(table.len(), 12);
    assert_eq!(table.width(), nsl_kdd::FEATURE_COLUMNS.len() + 2);
}

#[tokio::test]
async fn json_endpoint_reports_summary() {
    let resp = app()
        .oneshot(multipart("/api/v1/predictions", "records.csv", &sample_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["model"], "nsl-kdd-scorecard");
    assert_eq!(json["summary"]["total"], 12);
    assert_eq!(json["rows"].as_array().unwrap().len(), 12);
    assert_eq!(json["columns"].as_array().unwrap().last().unwrap(), "attack_probability");
}

#[tokio::test]
async fn json_endpoint_maps_failures() {
    let resp = app()
        .oneshot(multipart("/api/v1/predictions", "wrong.csv", &mismatched_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["error"], USER_MESSAGE);
    assert_eq!(json["stage"], "predict");
    assert_eq!(json["status"], 422);

    let resp = app()
        .oneshot(multipart("/api/v1/predictions", "", b""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_names_model() {
    let resp = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"], "nsl-kdd-scorecard");
}

fn small_upload_app() -> axum::Router {
    let mut config = DemoConfig::default();
    config.server.max_upload_bytes = 1024;
    router(AppState::new(demo_classifier(), &config))
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let resp = small_upload_app()
        .oneshot(multipart("/api/v1/predictions", "records.csv", &sample_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], 413);
}

#[tokio::test]
async fn oversized_form_upload_renders_page() {
    let resp = small_upload_app()
        .oneshot(multipart("/", "records.csv", &sample_csv()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let html = body_text(resp).await;
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("The upload could not be read."));
    assert!(!html.contains("Predictions</h3>"));
    assert!(!html.contains("Download predictions as CSV"));
}
