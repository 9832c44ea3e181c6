use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use crate::config::env::{self, EnvKey};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentStoreKind {
    Postgres,
    Memory,
}

impl FromStr for DocumentStoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackendKind {
    S3,
    Local,
}

impl FromStr for StorageBackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" | "minio" => Ok(Self::S3),
            "local" | "fs" => Ok(Self::Local),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlPolicy {
    /// Time-limited link: an S3 pre-signed URL, or a server link carrying a signed token.
    Signed,
    /// Stable server link without expiry.
    Direct,
}

impl FromStr for UrlPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signed" | "presigned" => Ok(Self::Signed),
            "direct" => Ok(Self::Direct),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Clone, Debug, Validate)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub document_store: DocumentStoreKind,
    pub storage_backend: StorageBackendKind,
    pub s3: S3Settings,
    pub local_storage_path: PathBuf,
    #[validate(url)]
    pub public_base_url: String,
    pub url_policy: UrlPolicy,
    #[validate(range(min = 1))]
    pub signed_url_expiry_secs: u64,
    #[validate(length(min = 16, message = "URL signing secret must be at least 16 characters"))]
    pub url_signing_secret: String,
    #[validate(range(min = 1))]
    pub max_upload_bytes: u64,
    pub upload_temp_dir: PathBuf,
    #[validate(range(min = 1, max = 256))]
    pub worker_concurrency: usize,
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
    #[validate(range(min = 1))]
    pub engine_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub storage_timeout_secs: u64,
    pub soffice_bin: String,
}

fn parse_kind<T: FromStr>(key: EnvKey, default: &str) -> Result<T, ConfigError> {
    let name = key.as_str();
    let value = env::get_or(key, default);
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key: name, value })
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let document_store: DocumentStoreKind = parse_kind(EnvKey::DocumentStore, "postgres")?;
        let storage_backend: StorageBackendKind = parse_kind(EnvKey::StorageBackend, "s3")?;
        let url_policy: UrlPolicy = parse_kind(EnvKey::UrlPolicy, "signed")?;

        let database_url = env::get_opt(EnvKey::DatabaseUrl);
        if document_store == DocumentStoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing(EnvKey::DatabaseUrl.as_str()));
        }

        let bucket = env::get_opt(EnvKey::S3Bucket);
        if storage_backend == StorageBackendKind::S3 && bucket.is_none() {
            return Err(ConfigError::Missing(EnvKey::S3Bucket.as_str()));
        }

        let url_signing_secret = match env::get_opt(EnvKey::UrlSigningSecret) {
            Some(secret) => secret,
            None if url_policy == UrlPolicy::Signed && storage_backend == StorageBackendKind::Local => {
                return Err(ConfigError::Missing(EnvKey::UrlSigningSecret.as_str()));
            }
            // Never used to sign anything under this deployment shape.
            None => crate::common::security::random_hex(32),
        };

        let config = Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url,
            document_store,
            storage_backend,
            s3: S3Settings {
                endpoint: env::get_opt(EnvKey::S3Endpoint),
                region: env::get_or(EnvKey::S3Region, "us-east-1"),
                bucket: bucket.unwrap_or_default(),
                access_key: env::get_opt(EnvKey::S3AccessKey),
                secret_key: env::get_opt(EnvKey::S3SecretKey),
            },
            local_storage_path: PathBuf::from(env::get_or(EnvKey::LocalStoragePath, "./data/artifacts")),
            public_base_url: env::get_or(EnvKey::PublicBaseUrl, "http://localhost:3000"),
            url_policy,
            signed_url_expiry_secs: env::get_parsed(
                EnvKey::SignedUrlExpirySecs,
                DEFAULT_SIGNED_URL_EXPIRY_SECS,
            ),
            url_signing_secret,
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, DEFAULT_MAX_UPLOAD_BYTES),
            upload_temp_dir: env::get_opt(EnvKey::UploadTempDir)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            worker_concurrency: env::get_parsed(EnvKey::WorkerConcurrency, 4),
            queue_capacity: env::get_parsed(EnvKey::QueueCapacity, 64),
            engine_timeout_secs: env::get_parsed(EnvKey::EngineTimeoutSecs, 120),
            storage_timeout_secs: env::get_parsed(EnvKey::StorageTimeoutSecs, 30),
            soffice_bin: env::get_or(EnvKey::SofficeBin, "soffice"),
        };

        config.validate()?;
        Ok(config)
    }

    /// In-memory records and direct links, everything on disk under `root`.
    pub fn local(root: &Path) -> Self {
        Self {
            server_port: 3000,
            database_url: None,
            document_store: DocumentStoreKind::Memory,
            storage_backend: StorageBackendKind::Local,
            s3: S3Settings {
                endpoint: None,
                region: "us-east-1".to_string(),
                bucket: String::new(),
                access_key: None,
                secret_key: None,
            },
            local_storage_path: root.join("artifacts"),
            public_base_url: "http://localhost:3000".to_string(),
            url_policy: UrlPolicy::Direct,
            signed_url_expiry_secs: DEFAULT_SIGNED_URL_EXPIRY_SECS,
            url_signing_secret: crate::common::security::random_hex(32),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_temp_dir: root.join("uploads"),
            worker_concurrency: 2,
            queue_capacity: 16,
            engine_timeout_secs: 120,
            storage_timeout_secs: 30,
            soffice_bin: "soffice".to_string(),
        }
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    pub fn signed_url_expiry(&self) -> Duration {
        Duration::from_secs(self.signed_url_expiry_secs)
    }
}
