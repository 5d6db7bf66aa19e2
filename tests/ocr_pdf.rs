//! End-to-end tests for `POST /ocr-pdf` with stand-in rasterizer and OCR
//! backends.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ocr_pdf_server::config::Config;
use ocr_pdf_server::error::OcrPdfError;
use ocr_pdf_server::ocr::{OcrError, OcrProvider, OcrProviderTrait, OcrService, PageImage};
use ocr_pdf_server::pipeline::{OcrPipeline, PageOrdering, Upload};
use ocr_pdf_server::rasterizer::{RasterizeError, Rasterizer};
use ocr_pdf_server::routes;
use ocr_pdf_server::state::AppState;
use ocr_pdf_server::workspace::WorkspaceManager;

const BOUNDARY: &str = "ocr-pdf-test-boundary";

// ============================================================================
// Fakes
// ============================================================================

/// Writes a fixed set of page images, then succeeds or fails
#[derive(Default)]
struct FakeRasterizer {
    pages: Vec<String>,
    fail: bool,
    wipe_output: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeRasterizer {
    fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn failing_after(pages: &[&str]) -> Self {
        Self {
            fail: true,
            ..Self::with_pages(pages)
        }
    }

    /// Succeeds but leaves no output directory behind
    fn wiping_output() -> Self {
        Self {
            wipe_output: true,
            ..Default::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn workspaces(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(
        &self,
        input: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<(), RasterizeError> {
        assert!(input.is_file(), "input PDF must be written before rasterizing");
        assert_eq!(input.file_name().unwrap(), "input.pdf");
        assert_eq!(prefix, "page");
        self.calls.lock().unwrap().push(output_dir.to_path_buf());

        for name in &self.pages {
            image::RgbImage::new(1, 1).save(output_dir.join(name)).unwrap();
        }

        if self.wipe_output {
            std::fs::remove_dir_all(output_dir).unwrap();
        }

        if self.fail {
            return Err(RasterizeError::Failed {
                code: Some(1),
                stderr: "Incorrect password".to_string(),
            });
        }
        Ok(())
    }
}

/// Answers by page file name and records the order pages were seen in
#[derive(Default)]
struct FakeOcr {
    texts: HashMap<String, String>,
    fail_on: HashSet<String>,
    seen: Mutex<Vec<String>>,
}

impl FakeOcr {
    fn with_texts(texts: &[(&str, &str)]) -> Self {
        Self {
            texts: texts
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_string());
        self
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrProviderTrait for FakeOcr {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, page: &PageImage) -> Result<String, OcrError> {
        let name = page.path.file_name().unwrap().to_string_lossy().into_owned();
        self.seen.lock().unwrap().push(name.clone());

        if self.fail_on.contains(&name) {
            return Err(OcrError::ProcessingError("engine crashed".to_string()));
        }
        Ok(self.texts.get(&name).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    root: TempDir,
    rasterizer: Arc<FakeRasterizer>,
    ocr: Arc<FakeOcr>,
    pipeline: OcrPipeline,
}

impl Harness {
    fn new(rasterizer: FakeRasterizer, ocr: FakeOcr) -> Self {
        Self::with_ordering(rasterizer, ocr, PageOrdering::Numeric)
    }

    fn with_ordering(rasterizer: FakeRasterizer, ocr: FakeOcr, ordering: PageOrdering) -> Self {
        let root = TempDir::new().unwrap();
        let rasterizer = Arc::new(rasterizer);
        let ocr = Arc::new(ocr);
        let pipeline = OcrPipeline::new(
            WorkspaceManager::new(Some(root.path().to_path_buf())),
            rasterizer.clone(),
            OcrService::new(ocr.clone()),
            ordering,
        );
        Self {
            root,
            rasterizer,
            ocr,
            pipeline,
        }
    }

    fn app(&self) -> Router {
        self.app_with(Config::default())
    }

    fn app_with(&self, mut config: Config) -> Router {
        config.pipeline.work_dir = Some(self.root.path().to_path_buf());
        routes::app(AppState::with_pipeline(config, self.pipeline.clone()))
    }

    fn gated_app(&self, api_key: Option<&str>) -> Router {
        let mut config = Config::default();
        config.auth.enabled = true;
        config.auth.api_key = api_key.map(str::to_string);
        self.app_with(config)
    }

    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.root.path()).unwrap().count()
    }
}

fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(field: &str, file_name: &str, data: &[u8], api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/ocr-pdf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder
        .body(Body::from(multipart_body(field, file_name, data)))
        .unwrap()
}

fn pdf_request(file_name: &str) -> Request<Body> {
    upload_request("file", file_name, b"%PDF-1.7 fake", None)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Success paths
// ============================================================================

#[tokio::test]
async fn test_two_page_report() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Hello"), ("page-2.png", "World")]),
    );

    let (status, body) = send(h.app(), pdf_request("report.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "text": "Hello\n\nWorld" }));
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_uppercase_extension_accepted() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Scanned")]),
    );

    let (status, body) = send(h.app(), pdf_request("SCAN.PDF")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Scanned");
}

#[tokio::test]
async fn test_page_text_whitespace_is_kept_between_pages() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png"]),
        FakeOcr::with_texts(&[("page-1.png", "  Hello\n"), ("page-2.png", "World\n\x0c")]),
    );

    let text = h
        .pipeline
        .process(&Upload::new("doc.pdf", b"%PDF".to_vec()))
        .await
        .unwrap();

    assert_eq!(text, "Hello\n\n\nWorld");
}

#[tokio::test]
async fn test_no_pages_gives_empty_text() {
    let h = Harness::new(FakeRasterizer::with_pages(&[]), FakeOcr::default());

    let (status, body) = send(h.app(), pdf_request("empty.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "text": "" }));
    assert_eq!(h.rasterizer.call_count(), 1);
    assert!(h.ocr.seen().is_empty());
}

#[tokio::test]
async fn test_blank_pages_are_not_errors() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png", "page-3.png"]),
        FakeOcr::with_texts(&[("page-2.png", "Only text")]),
    );

    let (status, body) = send(h.app(), pdf_request("mostly-blank.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Only text");
    assert_eq!(h.ocr.seen().len(), 3);
}

#[tokio::test]
async fn test_numeric_page_order_beyond_nine_pages() {
    let names: Vec<String> = (1..=11).map(|n| format!("page-{}.png", n)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let texts: Vec<(String, String)> = (1..=11)
        .map(|n| (format!("page-{}.png", n), format!("p{}", n)))
        .collect();
    let text_refs: Vec<(&str, &str)> = texts
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();

    let h = Harness::new(
        FakeRasterizer::with_pages(&name_refs),
        FakeOcr::with_texts(&text_refs),
    );

    let text = h
        .pipeline
        .process(&Upload::new("long.pdf", b"%PDF".to_vec()))
        .await
        .unwrap();

    let expected: Vec<String> = (1..=11).map(|n| format!("p{}", n)).collect();
    assert_eq!(text, expected.join("\n\n"));
    assert_eq!(h.ocr.seen(), names);
}

#[tokio::test]
async fn test_lexical_page_order_is_plain_file_name_order() {
    let h = Harness::with_ordering(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png", "page-10.png"]),
        FakeOcr::with_texts(&[("page-1.png", "a"), ("page-2.png", "b"), ("page-10.png", "c")]),
        PageOrdering::Lexicographic,
    );

    let text = h
        .pipeline
        .process(&Upload::new("doc.pdf", b"%PDF".to_vec()))
        .await
        .unwrap();

    assert_eq!(text, "a\n\nc\n\nb");
}

#[tokio::test]
async fn test_same_pdf_twice_gives_same_text() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Hello"), ("page-2.png", "World")]),
    );

    let (_, first) = send(h.app(), pdf_request("report.pdf")).await;
    assert_eq!(h.leftover_workspaces(), 0);
    let (_, second) = send(h.app(), pdf_request("report.pdf")).await;
    assert_eq!(h.leftover_workspaces(), 0);

    assert_eq!(first, second);
    let workspaces = h.rasterizer.workspaces();
    assert_eq!(workspaces.len(), 2);
    assert_ne!(workspaces[0], workspaces[1]);
    assert!(workspaces.iter().all(|w| !w.exists()));
}

#[tokio::test]
async fn test_concurrent_requests_use_separate_workspaces() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Hello")]),
    );
    let upload = Upload::new("a.pdf", b"%PDF".to_vec());

    let (a, b) = tokio::join!(h.pipeline.process(&upload), h.pipeline.process(&upload));

    assert_eq!(a.unwrap(), "Hello");
    assert_eq!(b.unwrap(), "Hello");
    let workspaces = h.rasterizer.workspaces();
    assert_ne!(workspaces[0], workspaces[1]);
    assert_eq!(h.leftover_workspaces(), 0);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_non_pdf_rejected() {
    let h = Harness::new(FakeRasterizer::with_pages(&["page-1.png"]), FakeOcr::default());

    let (status, body) = send(h.app(), pdf_request("notes.txt")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({ "error": "Only PDF files are supported" }));
    assert_eq!(h.rasterizer.call_count(), 0);
    assert!(h.ocr.seen().is_empty());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_non_pdf_rejected_before_workspace() {
    // A workspace root that does not exist makes any acquire fail with 500,
    // so a 400 proves no workspace was requested.
    let rasterizer = Arc::new(FakeRasterizer::with_pages(&["page-1.png"]));
    let pipeline = OcrPipeline::new(
        WorkspaceManager::new(Some(PathBuf::from("/nonexistent/ocr-pdf-root"))),
        rasterizer.clone(),
        OcrService::new(Arc::new(FakeOcr::default())),
        PageOrdering::Numeric,
    );

    let result = pipeline
        .process(&Upload::new("notes.txt", b"plain text".to_vec()))
        .await;
    assert!(matches!(result, Err(OcrPdfError::InvalidFileType)));

    let result = pipeline
        .process(&Upload::new("report.pdf", b"%PDF".to_vec()))
        .await;
    assert!(matches!(result, Err(OcrPdfError::Workspace(_))));
    assert_eq!(rasterizer.call_count(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_returns_json_error() {
    let h = Harness::new(FakeRasterizer::with_pages(&["page-1.png"]), FakeOcr::default());

    let request = Request::builder()
        .method("POST")
        .uri("/ocr-pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(h.app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({ "error": "Failed to read upload" }));
    assert_eq!(h.rasterizer.call_count(), 0);
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_missing_file_field() {
    let h = Harness::new(FakeRasterizer::default(), FakeOcr::default());

    let (status, body) = send(h.app(), upload_request("document", "report.pdf", b"%PDF", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
    assert_eq!(h.rasterizer.call_count(), 0);
}

#[tokio::test]
async fn test_rasterizer_failure() {
    let h = Harness::new(
        FakeRasterizer::failing_after(&["page-1.png"]),
        FakeOcr::with_texts(&[("page-1.png", "should not appear")]),
    );

    let (status, body) = send(h.app(), pdf_request("encrypted.pdf")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "error": "Failed to convert PDF to images" }));
    assert!(h.ocr.seen().is_empty());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_page_listing_failure() {
    let h = Harness::new(FakeRasterizer::wiping_output(), FakeOcr::default());

    let (status, body) = send(h.app(), pdf_request("report.pdf")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "error": "Failed to list page images" }));
    assert!(h.ocr.seen().is_empty());
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_ocr_failure_aborts_remaining_pages() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png", "page-2.png", "page-3.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Hello"), ("page-3.png", "Never")])
            .failing_on("page-2.png"),
    );

    let (status, body) = send(h.app(), pdf_request("report.pdf")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("OCR failed on "), "{}", error);
    assert!(error.ends_with("page-2.png"), "{}", error);
    assert!(body.get("text").is_none());
    assert!(!error.contains("Hello"));
    assert_eq!(h.ocr.seen(), vec!["page-1.png", "page-2.png"]);
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_undecodable_page_is_ocr_failure() {
    struct GarbageRasterizer;

    #[async_trait]
    impl Rasterizer for GarbageRasterizer {
        async fn rasterize(&self, _: &Path, output_dir: &Path, _: &str) -> Result<(), RasterizeError> {
            std::fs::write(output_dir.join("page-1.png"), b"not an image").unwrap();
            Ok(())
        }
    }

    let root = TempDir::new().unwrap();
    let ocr = Arc::new(FakeOcr::default());
    let pipeline = OcrPipeline::new(
        WorkspaceManager::new(Some(root.path().to_path_buf())),
        Arc::new(GarbageRasterizer),
        OcrService::new(ocr.clone()),
        PageOrdering::Numeric,
    );

    let result = pipeline
        .process(&Upload::new("report.pdf", b"%PDF".to_vec()))
        .await;

    match result {
        Err(OcrPdfError::Ocr { path, source }) => {
            assert!(path.ends_with("page-1.png"));
            assert!(matches!(source, OcrError::ImageDecode(_)));
        }
        other => panic!("expected OCR failure, got {:?}", other),
    }
    assert!(ocr.seen().is_empty());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let h = Harness::new(FakeRasterizer::with_pages(&["page-1.png"]), FakeOcr::default());
    let mut config = Config::default();
    config.pipeline.max_upload_bytes = 64;

    let request = upload_request("file", "big.pdf", &vec![b'x'; 4096], None);
    let (status, body) = send(h.app_with(config), request).await;

    assert!(status.is_client_error(), "{}", status);
    assert_eq!(body["error"], "Failed to read upload");
    assert_eq!(h.rasterizer.call_count(), 0);
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_gate_accepts_matching_key() {
    let h = Harness::new(
        FakeRasterizer::with_pages(&["page-1.png"]),
        FakeOcr::with_texts(&[("page-1.png", "Hello")]),
    );

    let request = upload_request("file", "report.pdf", b"%PDF", Some("s3cret"));
    let (status, body) = send(h.gated_app(Some("s3cret")), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Hello");
}

#[tokio::test]
async fn test_gate_rejects_missing_and_wrong_keys() {
    let h = Harness::new(FakeRasterizer::with_pages(&["page-1.png"]), FakeOcr::default());

    for key in [None, Some("wrong"), Some("")] {
        let request = upload_request("file", "report.pdf", b"%PDF", key);
        let (status, body) = send(h.gated_app(Some("s3cret")), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "key {:?}", key);
        assert_eq!(body["detail"], "Invalid or missing API Key");
    }

    assert_eq!(h.rasterizer.call_count(), 0);
    assert_eq!(h.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_gate_runs_before_validation() {
    let h = Harness::new(FakeRasterizer::default(), FakeOcr::default());

    let request = upload_request("file", "notes.txt", b"text", None);
    let (status, _) = send(h.gated_app(Some("s3cret")), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gate_without_configured_key_rejects_everything() {
    let h = Harness::new(FakeRasterizer::with_pages(&["page-1.png"]), FakeOcr::default());

    let request = upload_request("file", "report.pdf", b"%PDF", Some("anything"));
    let (status, _) = send(h.gated_app(None), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.rasterizer.call_count(), 0);
}

#[tokio::test]
async fn test_health_is_not_gated() {
    let h = Harness::new(FakeRasterizer::default(), FakeOcr::default());
    let server = axum_test::TestServer::new(h.gated_app(Some("s3cret"))).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ocr-pdf-server");
    assert_eq!(body["ocr_provider"], "tesseract");
}

#[tokio::test]
async fn test_gated_route_without_body_is_unauthorized() {
    let h = Harness::new(FakeRasterizer::default(), FakeOcr::default());
    let server = axum_test::TestServer::new(h.gated_app(Some("s3cret"))).unwrap();

    let response = server.post("/ocr-pdf").expect_failure().await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Invalid or missing API Key");
}
