//! Shared harness for router-level tests: stub engines and stores, a
//! repository that records status history, and a multipart body builder.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use doc2pdf::common::upload::WordFormat;
use doc2pdf::config::settings::AppConfig;
use doc2pdf::infrastructure::engine::{ConversionEngine, ConversionError};
use doc2pdf::infrastructure::storage::{LocalStore, ObjectStore, StorageError, StoredObject};
use doc2pdf::modules::documents::model::{DocumentRecord, DocumentStatus, StoredArtifact};
use doc2pdf::modules::documents::repository::{
    DocumentRepository, MemoryDocumentRepository, RepositoryError, Transition,
};
use doc2pdf::state::AppState;

pub const BOUNDARY: &str = "doc2pdf-test-boundary";

pub fn sample_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 18.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Bytes that pass `.docx` validation: ZIP signature plus a `word/` part name.
pub fn docx_bytes() -> Vec<u8> {
    let mut data = b"PK\x03\x04".to_vec();
    data.extend_from_slice(b"\x14\x00\x06\x00[Content_Types].xml");
    data.extend_from_slice(b"word/document.xml");
    data.extend_from_slice(&[0u8; 256]);
    data
}

/// Converts anything into a one-page PDF.
pub struct StubEngine;

#[async_trait]
impl ConversionEngine for StubEngine {
    async fn convert(&self, _: &[u8], _: WordFormat) -> Result<Bytes, ConversionError> {
        Ok(Bytes::from(sample_pdf("Converted document")))
    }
}

pub struct FailingEngine;

#[async_trait]
impl ConversionEngine for FailingEngine {
    async fn convert(&self, _: &[u8], _: WordFormat) -> Result<Bytes, ConversionError> {
        Err(ConversionError::Engine {
            status: "exit status: 1".to_string(),
            stderr: "Error: source file could not be loaded".to_string(),
        })
    }
}

/// Object store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, _: &str, _: Bytes, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("AccessDenied: bucket policy".to_string()))
    }
    async fn get(&self, _: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(None)
    }
    async fn delete(&self, _: &str) -> Result<(), StorageError> {
        Ok(())
    }
    async fn presigned_get(&self, _: &str, _: Duration) -> Result<Option<String>, StorageError> {
        Ok(None)
    }
    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// In-memory repository that keeps every status a document has held.
#[derive(Default)]
pub struct RecordingRepository {
    inner: MemoryDocumentRepository,
    history: Mutex<HashMap<Uuid, Vec<DocumentStatus>>>,
}

impl RecordingRepository {
    pub fn history(&self, file_id: Uuid) -> Vec<DocumentStatus> {
        self.history.lock().unwrap().get(&file_id).cloned().unwrap_or_default()
    }

    /// Status histories of every document, in no particular order.
    pub fn history_all(&self) -> Vec<Vec<DocumentStatus>> {
        self.history.lock().unwrap().values().cloned().collect()
    }

    pub fn document_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentRepository for RecordingRepository {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), RepositoryError> {
        self.inner.insert_document(record).await?;
        self.history.lock().unwrap().insert(record.file_id, vec![record.status]);
        Ok(())
    }

    async fn get_document(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, RepositoryError> {
        self.inner.get_document(file_id).await
    }

    async fn transition(&self, file_id: Uuid, transition: Transition<'_>) -> Result<bool, RepositoryError> {
        let status = transition.status;
        let changed = self.inner.transition(file_id, transition).await?;
        if changed {
            self.history.lock().unwrap().entry(file_id).or_default().push(status);
        }
        Ok(changed)
    }

    async fn insert_artifact(&self, artifact: &StoredArtifact) -> Result<(), RepositoryError> {
        self.inner.insert_artifact(artifact).await
    }

    async fn find_artifact(&self, key: &str) -> Result<Option<StoredArtifact>, RepositoryError> {
        self.inner.find_artifact(key).await
    }

    async fn artifacts_for(&self, file_id: Uuid) -> Result<Vec<StoredArtifact>, RepositoryError> {
        self.inner.artifacts_for(file_id).await
    }

    async fn record_download(&self, key: &str) -> Result<(), RepositoryError> {
        self.inner.record_download(key).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub repo: Arc<RecordingRepository>,
    pub config: AppConfig,
    dir: TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> PathBuf {
        self.config.upload_temp_dir.clone()
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.config.local_storage_path.clone()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_multipart(&self, uri: &str, form: MultipartForm) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(request).await
    }

    /// Uploads `file_name` with `content` to `/convert`.
    pub async fn convert(&self, file_name: &str, content: Vec<u8>, password: Option<&str>) -> TestResponse {
        let mut form = MultipartForm::new().file("file", file_name, content);
        if let Some(password) = password {
            form = form.text("password", password);
        }
        self.post_multipart("/convert", form).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct Setup {
    pub engine: Arc<dyn ConversionEngine>,
    pub store: Option<Arc<dyn ObjectStore>>,
    pub configure: Box<dyn FnOnce(&mut AppConfig)>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            engine: Arc::new(StubEngine),
            store: None,
            configure: Box::new(|_| {}),
        }
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_with(Setup::default()).await
}

pub async fn setup_with(setup: Setup) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::local(dir.path());
    (setup.configure)(&mut config);
    std::fs::create_dir_all(&config.upload_temp_dir).unwrap();

    let repo = Arc::new(RecordingRepository::default());
    let store: Arc<dyn ObjectStore> = match setup.store {
        Some(store) => store,
        None => Arc::new(LocalStore::new(config.local_storage_path.clone()).await.unwrap()),
    };

    let state = AppState::new(config.clone(), repo.clone(), store, setup.engine).unwrap();
    let router = doc2pdf::app::create_app(state.clone());

    TestApp {
        router,
        state,
        repo,
        config,
        dir,
    }
}

/// Minimal `multipart/form-data` encoder.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, file_name: &str, content: Vec<u8>) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(&content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// Files left in `dir`, ignoring subdirectories.
pub fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// Path and query of an absolute URL, for replaying it against the router.
pub fn path_and_query(url: &str) -> String {
    let parsed = url::Url::parse(url).unwrap();
    match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    }
}
