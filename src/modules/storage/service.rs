use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::keys;
use super::links::LinkBuilder;
use crate::common::error::AppError;
use crate::config::settings::{AppConfig, UrlPolicy};
use crate::infrastructure::storage::{ObjectStore, StorageError, StoredObject};
use crate::modules::documents::model::StoredArtifact;
use crate::modules::documents::repository::DocumentRepository;

#[derive(Debug, Clone)]
pub struct PersistedArtifact {
    pub artifact: StoredArtifact,
    pub url: String,
}

#[derive(Clone)]
pub struct StorageHandoff {
    store: Arc<dyn ObjectStore>,
    repo: Arc<dyn DocumentRepository>,
    links: LinkBuilder,
    policy: UrlPolicy,
    timeout: Duration,
    url_expiry: Duration,
}

impl StorageHandoff {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        repo: Arc<dyn DocumentRepository>,
        config: &AppConfig,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            store,
            repo,
            links: LinkBuilder::new(&config.public_base_url, &config.url_signing_secret)?,
            policy: config.url_policy,
            timeout: config.storage_timeout(),
            url_expiry: config.signed_url_expiry(),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Persists `pdf` under a fresh key. The object is removed again unless
    /// its metadata row is written too.
    pub async fn persist(
        &self,
        pdf: Bytes,
        artifact_name: &str,
        file_id: Uuid,
        password_protected: bool,
    ) -> Result<PersistedArtifact, StorageError> {
        let key = keys::artifact_key(artifact_name);
        let url = self.retrieval_url(&key).await?;
        let size = pdf.len();
        let start = Instant::now();

        let put = tokio::time::timeout(self.timeout, self.store.put(&key, pdf, mime::APPLICATION_PDF.as_ref())).await;
        let Ok(put) = put else {
            // The backend may still commit the write after we stop waiting.
            warn!(key = %key, file_id = %file_id, "Artifact upload timed out, removing object");
            self.discard(&key).await;
            return Err(StorageError::Timeout(self.timeout));
        };
        put?;

        let artifact = StoredArtifact {
            artifact_key: key.clone(),
            file_id,
            size_bytes: size as i64,
            password_protected,
            download_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self.repo.insert_artifact(&artifact).await {
            error!(key = %key, file_id = %file_id, error = %e, "Artifact metadata write failed, removing object");
            self.discard(&key).await;
            return Err(StorageError::Metadata(e.to_string()));
        }

        info!(
            key = %key,
            file_id = %file_id,
            size_bytes = size,
            backend = self.store.backend_name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "📦 Artifact stored"
        );

        Ok(PersistedArtifact { artifact, url })
    }

    pub async fn retrieval_url(&self, key: &str) -> Result<String, StorageError> {
        match self.policy {
            UrlPolicy::Direct => self.links.direct(key),
            UrlPolicy::Signed => match self.store.presigned_get(key, self.url_expiry).await? {
                Some(url) => Ok(url),
                None => self.links.signed(key, self.url_expiry),
            },
        }
    }

    /// Unknown keys are 404 under every policy, before any token check.
    pub async fn open_download(&self, key: &str, token: Option<&str>) -> Result<StoredObject, AppError> {
        let not_found = || AppError::NotFound(format!("Artifact {} not found", key));

        if self.repo.find_artifact(key).await?.is_none() {
            return Err(not_found());
        }

        if self.policy == UrlPolicy::Signed {
            let granted = token.is_some_and(|t| self.links.verify(key, t));
            if !granted {
                return Err(AppError::Forbidden("Download link is missing, invalid or expired".to_string()));
            }
        }

        let object = tokio::time::timeout(self.timeout, self.store.get(key))
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))??;
        let Some(object) = object else {
            warn!(key = %key, "Artifact metadata exists but object is missing");
            return Err(not_found());
        };

        if let Err(e) = self.repo.record_download(key).await {
            warn!(key = %key, error = %e, "Failed to count download");
        }

        Ok(object)
    }

    async fn discard(&self, key: &str) {
        match tokio::time::timeout(self.timeout, self.store.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(key = %key, error = %e, "Failed to remove orphaned object"),
            Err(_) => error!(key = %key, "Timed out removing orphaned object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::LocalStore;
    use crate::modules::documents::repository::{MemoryDocumentRepository, RepositoryError, Transition};
    use crate::modules::documents::model::DocumentRecord;
    use async_trait::async_trait;
    use futures_util::TryStreamExt;

    struct NoArtifacts(MemoryDocumentRepository);

    #[async_trait]
    impl DocumentRepository for NoArtifacts {
        async fn insert_document(&self, record: &DocumentRecord) -> Result<(), RepositoryError> {
            self.0.insert_document(record).await
        }
        async fn get_document(&self, file_id: Uuid) -> Result<Option<DocumentRecord>, RepositoryError> {
            self.0.get_document(file_id).await
        }
        async fn transition(&self, file_id: Uuid, t: Transition<'_>) -> Result<bool, RepositoryError> {
            self.0.transition(file_id, t).await
        }
        async fn insert_artifact(&self, _: &StoredArtifact) -> Result<(), RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolClosed))
        }
        async fn find_artifact(&self, key: &str) -> Result<Option<StoredArtifact>, RepositoryError> {
            self.0.find_artifact(key).await
        }
        async fn artifacts_for(&self, file_id: Uuid) -> Result<Vec<StoredArtifact>, RepositoryError> {
            self.0.artifacts_for(file_id).await
        }
        async fn record_download(&self, key: &str) -> Result<(), RepositoryError> {
            self.0.record_download(key).await
        }
    }

    #[derive(Default)]
    struct StalledStore {
        deleted: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn put(&self, _: &str, _: Bytes, _: &str) -> Result<(), StorageError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn get(&self, _: &str) -> Result<Option<StoredObject>, StorageError> {
            Ok(None)
        }
        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }
        async fn presigned_get(&self, _: &str, _: Duration) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn backend_name(&self) -> &'static str {
            "stalled"
        }
    }

    async fn handoff(
        dir: &tempfile::TempDir,
        repo: Arc<dyn DocumentRepository>,
        policy: UrlPolicy,
    ) -> (StorageHandoff, LocalStore) {
        let mut config = AppConfig::local(dir.path());
        config.url_policy = policy;
        let store = LocalStore::new(dir.path().join("artifacts")).await.unwrap();
        let handoff = StorageHandoff::new(Arc::new(store.clone()), repo, &config).unwrap();
        (handoff, store)
    }

    async fn read_all(object: StoredObject) -> Vec<u8> {
        object
            .body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn stored_bytes_come_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(MemoryDocumentRepository::new());
        let (handoff, _) = handoff(&dir, repo.clone(), UrlPolicy::Direct).await;

        let file_id = Uuid::new_v4();
        let stored = handoff
            .persist(Bytes::from_static(b"%PDF-1.5 body"), "a.pdf", file_id, false)
            .await
            .unwrap();

        assert!(stored.url.ends_with(&format!("/download/{}", stored.artifact.artifact_key)));
        assert_eq!(repo.artifacts_for(file_id).await.unwrap().len(), 1);

        let object = handoff.open_download(&stored.artifact.artifact_key, None).await.unwrap();
        assert_eq!(read_all(object).await, b"%PDF-1.5 body");
        let counted = repo.find_artifact(&stored.artifact.artifact_key).await.unwrap().unwrap();
        assert_eq!(counted.download_count, 1);
    }

    #[tokio::test]
    async fn same_name_twice_gives_two_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (handoff, _) = handoff(&dir, Arc::new(MemoryDocumentRepository::new()), UrlPolicy::Direct).await;

        let a = handoff.persist(Bytes::from_static(b"%PDF-a"), "x.pdf", Uuid::new_v4(), false).await.unwrap();
        let b = handoff.persist(Bytes::from_static(b"%PDF-b"), "x.pdf", Uuid::new_v4(), false).await.unwrap();
        assert_ne!(a.artifact.artifact_key, b.artifact.artifact_key);
        assert_ne!(a.url, b.url);
    }

    #[tokio::test]
    async fn metadata_failure_removes_the_object() {
        let dir = tempfile::tempdir().unwrap();
        let (handoff, store) =
            handoff(&dir, Arc::new(NoArtifacts(MemoryDocumentRepository::new())), UrlPolicy::Direct).await;

        let err = handoff
            .persist(Bytes::from_static(b"%PDF-x"), "x.pdf", Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Metadata(_)));

        let mut entries = tokio::fs::read_dir(store.root()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upload_timeout_removes_the_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StalledStore::default());
        let repo = Arc::new(MemoryDocumentRepository::new());
        let mut handoff =
            StorageHandoff::new(store.clone(), repo.clone(), &AppConfig::local(dir.path())).unwrap();
        handoff.timeout = Duration::from_millis(20);

        let file_id = Uuid::new_v4();
        let err = handoff
            .persist(Bytes::from_static(b"%PDF-t"), "t.pdf", file_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout(_)));

        let deleted = store.deleted.lock().unwrap().clone();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].ends_with("t.pdf"));
        assert!(repo.artifacts_for(file_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signed_policy_requires_matching_token() {
        let dir = tempfile::tempdir().unwrap();
        let (handoff, _) = handoff(&dir, Arc::new(MemoryDocumentRepository::new()), UrlPolicy::Signed).await;

        let stored = handoff
            .persist(Bytes::from_static(b"%PDF-s"), "s.pdf", Uuid::new_v4(), true)
            .await
            .unwrap();
        let key = &stored.artifact.artifact_key;
        let token = stored.url.split("token=").nth(1).unwrap().to_string();

        assert!(matches!(handoff.open_download(key, None).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            handoff.open_download(key, Some("garbage")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(handoff.open_download(key, Some(&token)).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (handoff, _) = handoff(&dir, Arc::new(MemoryDocumentRepository::new()), UrlPolicy::Direct).await;
        assert!(matches!(
            handoff.open_download("1-abc-missing.pdf", None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_key_is_not_found_under_signed_policy() {
        let dir = tempfile::tempdir().unwrap();
        let (handoff, _) = handoff(&dir, Arc::new(MemoryDocumentRepository::new()), UrlPolicy::Signed).await;
        assert!(matches!(
            handoff.open_download("1-abc-missing.pdf", None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            handoff.open_download("1-abc-missing.pdf", Some("garbage")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
