//! End-to-end tests for the dispatch pipeline
//!
//! A local axum server plays every remote party: the origin media host, the
//! provider's upload endpoint and the provider's message endpoint.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use dispatchbox::config::Config;
use dispatchbox::job::{OutcomeRecord, OutcomeStatus};
use dispatchbox::observability::Metrics;
use dispatchbox::processor::JobProcessor;
use dispatchbox::reporter::InMemorySink;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const PUBLIC_URL: &str = "https://cdn.chakra.test/media/abc.jpg";
const ORIGIN_BYTES: &[u8] = b"\x89PNG fake image bytes";

#[derive(Debug, Clone)]
struct Captured {
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Default)]
struct Recorder {
    origin_hits: Mutex<usize>,
    uploads: Mutex<Vec<(String, Captured)>>,
    deliveries: Mutex<Vec<Captured>>,
}

impl Recorder {
    fn origin_hits(&self) -> usize {
        *self.origin_hits.lock().unwrap()
    }

    fn uploads(&self) -> Vec<(String, Captured)> {
        self.uploads.lock().unwrap().clone()
    }

    fn deliveries(&self) -> Vec<Captured> {
        self.deliveries.lock().unwrap().clone()
    }

    fn delivered_json(&self, index: usize) -> Value {
        serde_json::from_slice(&self.deliveries()[index].body).unwrap()
    }
}

async fn origin_media(State(recorder): State<Arc<Recorder>>) -> impl IntoResponse {
    *recorder.origin_hits.lock().unwrap() += 1;
    Bytes::from_static(ORIGIN_BYTES)
}

async fn upload_media(
    State(recorder): State<Arc<Recorder>>,
    Path(plugin): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    recorder
        .uploads
        .lock()
        .unwrap()
        .push((plugin.clone(), Captured { headers, body }));

    match plugin.as_str() {
        "reject" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))).into_response(),
        "nourl" => (StatusCode::OK, Json(json!({"_data": {}}))).into_response(),
        "notjson" => (StatusCode::OK, "<html>uploaded</html>").into_response(),
        _ => (
            StatusCode::OK,
            Json(json!({"_data": {"publicMediaUrl": PUBLIC_URL}})),
        )
            .into_response(),
    }
}

async fn deliver(
    State(recorder): State<Arc<Recorder>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    recorder
        .deliveries
        .lock()
        .unwrap()
        .push(Captured { headers, body });
    (StatusCode::OK, r#"{"messages":[{"id":"wamid.1"}]}"#)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such endpoint")
}

async fn start_mock_server() -> (String, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());

    let app = Router::new()
        .route("/origin/img.jpg", get(origin_media))
        .route("/origin/gone.jpg", get(not_found))
        .route(
            "/v1/ext/plugin/whatsapp/{plugin}/upload-public-media",
            post(upload_media),
        )
        .route("/v1/ext/plugin/whatsapp/{plugin}/api/messages", post(deliver))
        .route("/missing", post(not_found))
        .with_state(recorder.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", bound_addr), recorder)
}

/// Config whose provider is the mock server
fn test_config(base: &str) -> Config {
    let mut config = Config::default();
    config.provider.host_marker = "127.0.0.1".to_string();
    config.provider.upload_base_url = base.to_string();
    config
}

fn processor(config: &Config) -> (JobProcessor, Arc<InMemorySink>, Arc<Metrics>) {
    let sink = Arc::new(InMemorySink::new());
    let metrics = Arc::new(Metrics::new());
    let processor = JobProcessor::new(config, sink.clone(), metrics.clone()).unwrap();
    (processor, sink, metrics)
}

fn message(id: i64, url: &str, header: &str, body: &Value) -> String {
    json!({
        "CodSysFilaEnvioMensagens": id,
        "Url": url,
        "Header": header,
        "Body": body.to_string(),
        "Instancia": "crm"
    })
    .to_string()
}

fn messages_url(base: &str, plugin: &str) -> String {
    format!("{}/v1/ext/plugin/whatsapp/{}/api/messages", base, plugin)
}

fn multipart_text(captured: &Captured) -> String {
    String::from_utf8_lossy(&captured.body).into_owned()
}

#[tokio::test]
async fn test_relay_rewrites_link_before_delivery() {
    let (base, recorder) = start_mock_server().await;
    let (processor, sink, metrics) = processor(&test_config(&base));

    let body = json!({
        "messaging_product": "whatsapp",
        "to": "5511999999999",
        "type": "image",
        "image": {"link": format!("{}/origin/img.jpg", base), "caption": "hello"}
    });
    let raw = message(
        101,
        &messages_url(&base, "plug-1"),
        "Authorization:Bearer abc;Content-Type:text/plain",
        &body,
    );

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.job_id, 101);
    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(record.response_content, r#"{"messages":[{"id":"wamid.1"}]}"#);

    assert_eq!(recorder.origin_hits(), 1);

    let uploads = recorder.uploads();
    assert_eq!(uploads.len(), 1);
    let (plugin, upload) = &uploads[0];
    assert_eq!(plugin, "plug-1");
    assert_eq!(upload.headers["authorization"], "Bearer abc");
    assert!(
        upload.headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data")
    );
    let form = multipart_text(upload);
    assert!(form.contains(r#"name="file"; filename="file.bin""#));
    assert!(form.contains("application/octet-stream"));
    assert!(form.contains(r#"name="filename""#));
    assert!(form.contains("fake image bytes"));

    let delivered = recorder.delivered_json(0);
    assert_eq!(delivered["image"]["link"], PUBLIC_URL);
    assert_eq!(delivered["image"]["caption"], "hello");
    assert_eq!(delivered["to"], "5511999999999");

    let delivery = &recorder.deliveries()[0];
    assert_eq!(delivery.headers["authorization"], "Bearer abc");
    assert_eq!(delivery.headers["content-type"], "application/json");

    assert_eq!(sink.records().await, vec![record]);
    assert_eq!(metrics.snapshot().media_relayed, 1);
}

#[tokio::test]
async fn test_document_upload_keeps_filename() {
    let (base, recorder) = start_mock_server().await;
    let (processor, _sink, _metrics) = processor(&test_config(&base));

    let body = json!({
        "type": "document",
        "document": {"link": format!("{}/origin/img.jpg", base), "filename": "nota.pdf"}
    });
    let raw = message(102, &messages_url(&base, "plug-1"), "", &body);

    processor.process_message(&raw).await.unwrap();

    let uploads = recorder.uploads();
    let form = multipart_text(&uploads[0].1);
    assert!(form.contains(r#"filename="nota.pdf""#));
    assert_eq!(recorder.delivered_json(0)["document"]["link"], PUBLIC_URL);
    assert_eq!(recorder.delivered_json(0)["document"]["filename"], "nota.pdf");
}

#[tokio::test]
async fn test_origin_download_failure_keeps_original_body() {
    let (base, recorder) = start_mock_server().await;
    let (processor, sink, metrics) = processor(&test_config(&base));

    let body = json!({"type": "image", "image": {"link": format!("{}/origin/gone.jpg", base)}});
    let raw = message(103, &messages_url(&base, "plug-1"), "", &body);

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert!(recorder.uploads().is_empty());
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());
    assert_eq!(sink.records().await.len(), 1);
    assert_eq!(metrics.snapshot().relay_fallbacks, 1);
}

#[tokio::test]
async fn test_rejected_upload_keeps_original_body() {
    let (base, recorder) = start_mock_server().await;
    let (processor, _sink, _metrics) = processor(&test_config(&base));

    let body = json!({"type": "video", "video": {"link": format!("{}/origin/img.jpg", base)}});
    let raw = message(104, &messages_url(&base, "reject"), "", &body);

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(recorder.uploads().len(), 1);
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());
}

#[tokio::test]
async fn test_upload_without_public_url_keeps_original_body() {
    let (base, recorder) = start_mock_server().await;
    let (processor, _sink, _metrics) = processor(&test_config(&base));

    let body = json!({"type": "audio", "audio": {"link": format!("{}/origin/img.jpg", base)}});
    let raw = message(105, &messages_url(&base, "nourl"), "", &body);

    processor.process_message(&raw).await.unwrap();

    assert_eq!(recorder.uploads().len(), 1);
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());
}

#[tokio::test]
async fn test_non_json_upload_response_keeps_original_body() {
    let (base, recorder) = start_mock_server().await;
    let (processor, _sink, metrics) = processor(&test_config(&base));

    let body = json!({"type": "sticker", "sticker": {"link": format!("{}/origin/img.jpg", base)}});
    let raw = message(108, &messages_url(&base, "notjson"), "", &body);

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(recorder.uploads().len(), 1);
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());
    assert_eq!(metrics.snapshot().relay_fallbacks, 1);
}

#[tokio::test]
async fn test_unreachable_upload_endpoint_keeps_original_body() {
    let (base, recorder) = start_mock_server().await;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let mut config = test_config(&base);
    config.provider.upload_base_url = format!("http://{}", dead);
    let (processor, _sink, metrics) = processor(&config);

    let body = json!({"type": "image", "image": {"link": format!("{}/origin/img.jpg", base)}});
    let raw = message(109, &messages_url(&base, "plug-1"), "", &body);

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(recorder.origin_hits(), 1);
    assert!(recorder.uploads().is_empty());
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());
    assert_eq!(metrics.snapshot().relay_fallbacks, 1);
}

#[tokio::test]
async fn test_non_provider_url_bypasses_relay() {
    let (base, recorder) = start_mock_server().await;
    let mut config = test_config(&base);
    config.provider.host_marker = "chakrahq.com".to_string();
    let (processor, _sink, metrics) = processor(&config);

    let body = json!({"type": "image", "image": {"link": format!("{}/origin/img.jpg", base)}});
    let raw = message(106, &messages_url(&base, "plug-1"), "", &body);

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(recorder.origin_hits(), 0);
    assert!(recorder.uploads().is_empty());
    assert_eq!(recorder.deliveries()[0].body, body.to_string().into_bytes());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.media_relayed, 0);
    assert_eq!(snapshot.relay_fallbacks, 0);
}

#[tokio::test]
async fn test_non_success_status_is_reported_as_failure() {
    let (base, _recorder) = start_mock_server().await;
    let (processor, sink, metrics) = processor(&test_config(&base));

    let raw = message(107, &format!("{}/missing", base), "", &json!({"type": "text"}));

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(
        record,
        OutcomeRecord {
            job_id: 107,
            status: OutcomeStatus::Failed,
            response_content: "no such endpoint".to_string(),
        }
    );
    assert_eq!(sink.records().await, vec![record]);
    assert_eq!(metrics.snapshot().jobs_failed, 1);
}

#[tokio::test]
async fn test_batch_skips_malformed_messages_and_reports_the_rest() {
    let (base, recorder) = start_mock_server().await;
    let (processor, sink, metrics) = processor(&test_config(&base));

    let text = json!({"type": "text", "text": {"body": "oi"}});
    let batch = vec![
        message(201, &messages_url(&base, "plug-1"), "", &text),
        "{this is not json".to_string(),
        "   ".to_string(),
        r#"{"Url": "http://no-id"}"#.to_string(),
        message(202, &format!("{}/missing", base), "", &text),
        message(203, &messages_url(&base, "plug-1"), "X-Trace:1", &text),
    ];

    let summary = processor.process_batch(batch).await;

    assert_eq!(summary.received, 6);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.failed, 1);

    let mut ids: Vec<i64> = sink.records().await.iter().map(|r| r.job_id).collect();
    ids.sort();
    assert_eq!(ids, vec![201, 202, 203]);

    assert_eq!(recorder.deliveries().len(), 2);
    assert_eq!(metrics.snapshot().jobs_skipped, 3);
}

#[tokio::test]
async fn test_absent_body_is_sent_as_empty_object() {
    let (base, recorder) = start_mock_server().await;
    let (processor, _sink, _metrics) = processor(&test_config(&base));

    let raw = json!({"codSysFilaEnvioMensagens": 301, "url": messages_url(&base, "plug-1")}).to_string();

    let record = processor.process_message(&raw).await.unwrap();

    assert_eq!(record.status, OutcomeStatus::Delivered);
    assert_eq!(recorder.deliveries()[0].body, Bytes::from_static(b"{}"));
}

#[tokio::test]
async fn test_replay_processes_file_lines() {
    let (base, recorder) = start_mock_server().await;
    let config = test_config(&base);

    let text = json!({"type": "text", "text": {"body": "oi"}});
    let contents = [
        message(401, &messages_url(&base, "plug-1"), "", &text),
        "not a message".to_string(),
        message(402, &messages_url(&base, "plug-1"), "", &text),
    ]
    .join("\n");

    let temp_dir = tempfile::TempDir::new().unwrap();
    let input = temp_dir.path().join("batch.jsonl");
    std::fs::write(&input, contents).unwrap();

    let summary = dispatchbox::runner::run_replay(config, &input, true)
        .await
        .unwrap();

    assert_eq!(summary.received, 3);
    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(recorder.deliveries().len(), 2);
}
