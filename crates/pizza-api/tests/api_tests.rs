//! API integration tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use image::{ImageOutputFormat, Rgb, RgbImage};
use pizza_api::error::INTERNAL_ERROR_MESSAGE;
use pizza_api::{create_router, ApiConfig, AppState};
use pizza_media::{Detection, Detector, MediaResult};
use pizza_models::{MediaType, PIZZA_CLASS_ID};
use pizza_reports::excel::SHEET_NAME;
use pizza_reports::{layout_pages, ReportTable, REPORT_HEADERS};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "pizza-test-boundary";

/// Returns a fixed number of pizzas per call, cycling through `counts`.
struct StubDetector {
    counts: Vec<usize>,
    calls: AtomicUsize,
}

impl StubDetector {
    fn fixed(count: usize) -> Self {
        Self::cycling(vec![count])
    }

    fn cycling(counts: Vec<usize>) -> Self {
        Self {
            counts,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Detector for StubDetector {
    fn detect(&self, _frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let pizzas = self.counts[call % self.counts.len()];

        let mut detections: Vec<Detection> = (0..pizzas)
            .map(|i| Detection {
                x: 0.05 + 0.1 * i as f32,
                y: 0.1,
                width: 0.08,
                height: 0.3,
                class_id: PIZZA_CLASS_ID,
                confidence: 0.9,
            })
            .collect();
        // A person that must not be counted
        detections.push(Detection {
            x: 0.5,
            y: 0.5,
            width: 0.2,
            height: 0.4,
            class_id: 0,
            confidence: 0.95,
        });
        Ok(detections)
    }
}

struct TestApp {
    dir: TempDir,
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new(detector: StubDetector) -> Self {
        Self::with_environment(detector, "development")
    }

    fn with_environment(detector: StubDetector, environment: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            output_dir: dir.path().join("static"),
            history_db_path: dir.path().join("history.db"),
            environment: environment.to_string(),
            ..Default::default()
        };

        let state = AppState::with_detector(config, Arc::new(detector)).unwrap();
        let router = create_router(state.clone(), None);
        Self { dir, state, router }
    }

    fn static_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("static")
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn upload(&self, field: &str, filename: &str, content: &[u8]) -> Response {
        self.send(multipart_request(field, filename, content)).await
    }

    fn history_len(&self) -> u64 {
        self.state.history.count().unwrap()
    }

    /// Download the Excel report and read its sheet back as display strings.
    async fn excel_rows(&self) -> Vec<Vec<String>> {
        let response = self.get("/report/excel").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = body_bytes(response).await;
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        workbook
            .worksheet_range(SHEET_NAME)
            .unwrap()
            .rows()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 48, Rgb([210, 160, 80]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(StubDetector::fixed(0));
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = TestApp::new(StubDetector::fixed(0));
    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["checks"]["history"]["status"], "ok");
    assert_eq!(body["checks"]["output_dir"]["status"], "ok");
}

/// Metrics are off when no recorder handle is passed.
#[tokio::test]
async fn test_metrics_disabled() {
    let app = TestApp::new(StubDetector::fixed(0));
    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_page() {
    let app = TestApp::new(StubDetector::fixed(0));
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("imageInput"));
    assert!(html.contains("/process"));
}

#[tokio::test]
async fn test_unsupported_type_is_rejected_without_record() {
    let app = TestApp::new(StubDetector::fixed(1));

    let response = app.upload("image", "notes.txt", b"not media").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Unsupported file type"})
    );

    assert_eq!(app.history_len(), 0);
    assert!(!app.static_dir().join("result.jpg").exists());
    assert!(!app.static_dir().join("pizza_report.pdf").exists());
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let app = TestApp::new(StubDetector::fixed(1));

    let response = app.upload("file", "pizza.png", &png_bytes()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("image"));
    assert_eq!(app.history_len(), 0);
}

#[tokio::test]
async fn test_image_upload_counts_and_records() {
    let app = TestApp::new(StubDetector::fixed(2));

    let response = app.upload("image", "Dinner.PNG", &png_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"count": 2, "type": "image"}));

    let records = app.state.history.list_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].count, 2);
    assert_eq!(records[0].media_type, MediaType::Image);
    assert!(records[0].result_path.ends_with("result.jpg"));

    // Annotated result and refreshed reports land in the output directory
    assert!(app.static_dir().join("result.jpg").exists());
    assert!(app.static_dir().join("pizza_report.pdf").exists());
    assert!(app.static_dir().join("pizza_report.xlsx").exists());

    let response = app.get("/static/result.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_corrupt_image_is_server_error() {
    let app = TestApp::new(StubDetector::fixed(1));

    let response = app.upload("image", "broken.jpg", b"definitely not a jpeg").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert_ne!(error, INTERNAL_ERROR_MESSAGE);
    assert_eq!(app.history_len(), 0);
}

#[tokio::test]
async fn test_production_hides_server_error_details() {
    let app = TestApp::with_environment(StubDetector::fixed(1), "production");

    let response = app.upload("image", "broken.jpg", b"definitely not a jpeg").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(
        body_json(response).await,
        json!({"error": INTERNAL_ERROR_MESSAGE})
    );

    // Client errors keep their message
    let response = app.upload("image", "notes.txt", b"not media").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Unsupported file type"})
    );
}

#[tokio::test]
async fn test_each_upload_appends_one_record_newest_first() {
    let app = TestApp::new(StubDetector::cycling(vec![1, 4]));

    for _ in 0..2 {
        let response = app.upload("image", "pizza.jpg", &png_bytes()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let records = app.state.history.list_all().unwrap();
    let counts: Vec<u32> = records.iter().map(|r| r.count).collect();
    assert_eq!(counts, vec![4, 1]);
}

#[tokio::test]
async fn test_pdf_report_download() {
    let app = TestApp::new(StubDetector::fixed(3));
    app.upload("image", "pizza.png", &png_bytes()).await;

    let response = app.get("/report/pdf").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"pizza_report.pdf\""
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_excel_report_download() {
    let app = TestApp::new(StubDetector::fixed(3));
    app.upload("image", "pizza.png", &png_bytes()).await;

    let response = app.get("/report/excel").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"pizza_report.xlsx\""
    );
    assert!(body_bytes(response).await.starts_with(b"PK"));
}

#[tokio::test]
async fn test_reports_on_empty_history() {
    let app = TestApp::new(StubDetector::fixed(0));

    assert_eq!(app.get("/report/pdf").await.status(), StatusCode::OK);
    let rows = app.excel_rows().await;
    assert_eq!(rows, vec![REPORT_HEADERS.map(String::from).to_vec()]);
}

#[tokio::test]
async fn test_excel_report_lists_every_record_newest_first() {
    let app = TestApp::new(StubDetector::cycling(vec![1, 4, 2]));
    for name in ["a.jpg", "b.bmp", "c.png"] {
        let response = app.upload("image", name, &png_bytes()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let records = app.state.history.list_all().unwrap();
    let rows = app.excel_rows().await;
    assert_eq!(rows.len(), 1 + records.len());
    assert_eq!(rows[0], REPORT_HEADERS.map(String::from).to_vec());

    let counts: Vec<&str> = rows[1..].iter().map(|r| r[1].as_str()).collect();
    assert_eq!(counts, vec!["2", "4", "1"]);
    for (row, record) in rows[1..].iter().zip(&records) {
        assert_eq!(row[0], record.timestamp_iso());
        assert_eq!(row[2], "image");
        assert_eq!(row[3], record.result_path);
    }

    // The PDF is laid out from the same rows
    let pages = layout_pages(&ReportTable::from_records(&records));
    let dates: Vec<&str> = pages
        .iter()
        .flat_map(|p| &p.items)
        .map(|i| i.text.as_str())
        .filter(|text| records.iter().any(|r| r.timestamp_iso() == *text))
        .collect();
    let expected: Vec<String> = records.iter().map(|r| r.timestamp_iso()).collect();
    assert_eq!(dates, expected);
}

#[tokio::test]
async fn test_report_requests_do_not_change_history() {
    let app = TestApp::new(StubDetector::fixed(1));
    app.upload("image", "a.jpg", &png_bytes()).await;
    app.upload("image", "b.bmp", &png_bytes()).await;
    assert_eq!(app.history_len(), 2);

    let first = app.excel_rows().await;
    for _ in 0..3 {
        assert_eq!(app.get("/report/pdf").await.status(), StatusCode::OK);
        assert_eq!(app.excel_rows().await, first);
    }
    assert_eq!(first.len(), 3);
    assert_eq!(app.history_len(), 2);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new(StubDetector::fixed(0));
    let response = app.get("/health").await;

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

/// Requires `ffmpeg` and `ffprobe` on PATH.
#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_video_upload_reports_max_per_frame() {
    let app = TestApp::new(StubDetector::cycling(vec![1, 3, 2]));

    let source = app.dir.path().join("source.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=size=64x48:rate=5"])
        .args(["-t", "1", "-pix_fmt", "yuv420p", "-c:v", "mpeg4"])
        .arg(&source)
        .status()
        .unwrap();
    assert!(status.success());

    let bytes = std::fs::read(&source).unwrap();
    let response = app.upload("image", "clip.MP4", &bytes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"count": 3, "type": "video"}));

    let records = app.state.history.list_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].media_type, MediaType::Video);
    assert!(app.static_dir().join("result.mp4").exists());

    // Temporary upload is gone
    let leftovers: Vec<_> = std::fs::read_dir(app.static_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_video"))
        .collect();
    assert!(leftovers.is_empty());
}
