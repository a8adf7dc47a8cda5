#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use lead_capture::{
    config::AppConfig,
    db,
    handlers::AppServices,
    repositories::LeadRepository,
    storage::{PhotoPolicy, PhotoStore},
    AppState,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "lead-capture-test-boundary";

/// Application router over a temp-file SQLite database and a temp upload
/// directory; both vanish with the harness.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("leads.db");
        let upload_dir = dir.path().join("uploads");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.upload_dir = upload_dir.clone();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let db_arc = Arc::new(pool);
        LeadRepository::new(db_arc.clone())
            .ensure_schema()
            .await
            .expect("failed to create schema in tests");

        let photos = PhotoStore::open(
            &upload_dir,
            cfg.uploads_url_prefix.clone(),
            PhotoPolicy {
                max_bytes: cfg.max_photo_bytes,
                max_count: cfg.max_photos,
            },
        )
        .await
        .expect("photo store");

        let services = AppServices::new(db_arc.clone(), photos);
        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        Self {
            router: lead_capture::build_router(state.clone()),
            state,
            upload_dir,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.request(
            Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, form: MultipartBody) -> Response {
        let (content_type, bytes) = form.finish();
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(bytes))
                .expect("request"),
        )
        .await
    }

    /// Names of the files currently in the upload directory
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .expect("read upload dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub async fn lead_count(&self) -> u64 {
        lead_capture::entities::lead::Entity::find()
            .count(self.state.db.as_ref())
            .await
            .expect("count leads")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn photo(self, file_name: &str, data: &[u8]) -> Self {
        let content_type = lead_capture::storage::content_type_for(file_name);
        self.file("photos", file_name, content_type, data)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            self.body,
        )
    }
}
