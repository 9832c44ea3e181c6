use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    DocumentStore,
    StorageBackend,
    S3Endpoint,
    S3Region,
    S3Bucket,
    S3AccessKey,
    S3SecretKey,
    LocalStoragePath,
    PublicBaseUrl,
    UrlPolicy,
    SignedUrlExpirySecs,
    UrlSigningSecret,
    MaxUploadBytes,
    UploadTempDir,
    WorkerConcurrency,
    QueueCapacity,
    EngineTimeoutSecs,
    StorageTimeoutSecs,
    SofficeBin,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::DocumentStore => "DOCUMENT_STORE",
            EnvKey::StorageBackend => "STORAGE_BACKEND",
            EnvKey::S3Endpoint => "MINIO_ENDPOINT",
            EnvKey::S3Region => "AWS_REGION",
            EnvKey::S3Bucket => "S3_BUCKET",
            EnvKey::S3AccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::S3SecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::LocalStoragePath => "LOCAL_STORAGE_PATH",
            EnvKey::PublicBaseUrl => "PUBLIC_BASE_URL",
            EnvKey::UrlPolicy => "URL_POLICY",
            EnvKey::SignedUrlExpirySecs => "SIGNED_URL_EXPIRY_SECS",
            EnvKey::UrlSigningSecret => "URL_SIGNING_SECRET",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::UploadTempDir => "UPLOAD_TEMP_DIR",
            EnvKey::WorkerConcurrency => "WORKER_CONCURRENCY",
            EnvKey::QueueCapacity => "QUEUE_CAPACITY",
            EnvKey::EngineTimeoutSecs => "ENGINE_TIMEOUT_SECS",
            EnvKey::StorageTimeoutSecs => "STORAGE_TIMEOUT_SECS",
            EnvKey::SofficeBin => "SOFFICE_BIN",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Like [`get`], but treats unset and blank values the same way.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
