//! Shared helpers for paytrack-intake integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use paytrack_common::api::ContractFields;
use paytrack_common::config::CompiledDefaults;
use paytrack_common::events::EventBus;
use paytrack_intake::config::IntakeSettings;
use paytrack_intake::models::UploadedDocument;
use paytrack_intake::services::{ContractParser, LocalContractParser, ParseError};
use paytrack_intake::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "paytrack-test-boundary";

/// Local parser that counts invocations
#[derive(Default)]
pub struct CountingParser {
    inner: LocalContractParser,
    calls: AtomicUsize,
}

impl CountingParser {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractParser for CountingParser {
    async fn parse(&self, document: &UploadedDocument) -> Result<ContractFields, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.parse(document).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub state: AppState,
    pub parser: Arc<CountingParser>,
    pub root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_max_upload(10 * 1024 * 1024).await
    }

    pub async fn with_max_upload(max_upload_bytes: u64) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        paytrack_intake::db::init_tables(&pool).await.expect("tables");

        let root = tempfile::tempdir().expect("temp dir");
        let defaults = CompiledDefaults::for_current_platform();
        let settings = IntakeSettings {
            host: defaults.host.clone(),
            port: defaults.port,
            root_folder: root.path().to_path_buf(),
            max_upload_bytes,
            allowed_origins: Vec::new(),
            default_region: defaults.default_region.clone(),
            default_currency: defaults.default_currency.clone(),
            parser_url: None,
            event_bus_capacity: 64,
            log_level: "info".to_string(),
        };

        let parser = Arc::new(CountingParser::default());
        let state = AppState::new(
            pool.clone(),
            EventBus::new(settings.event_bus_capacity),
            parser.clone(),
            &settings,
            root.path().join("uploads"),
            root.path().join("outputs"),
        );
        let router = paytrack_intake::build_router(state.clone(), &settings.allowed_origins);

        Self {
            router,
            pool,
            state,
            parser,
            root,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router response")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn upload(&self, uri: &str, files: &[(&str, &str, &[u8])]) -> Response<Body> {
        self.send(multipart_request(uri, files)).await
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

/// `(file_name, content_type, bytes)` parts under the `file` field. With no
/// files the body carries a single text field so it is still valid multipart.
pub fn multipart_request(uri: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    if files.is_empty() {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nno file\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
    }
    for (file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}
