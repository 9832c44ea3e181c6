use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::{ObjectStore, StorageError, StoredObject, validate_key};
use crate::config::settings::S3Settings;

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(settings: &S3Settings) -> Self {
        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key) {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            builder = builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &settings.endpoint {
            // MinIO and other S3-compatible endpoints need path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %settings.bucket, endpoint = ?settings.endpoint, "✅ Configured S3 artifact storage");

        Self {
            client,
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("PutObject {}: {}", key, DisplayErrorContext(&e))))?;

        info!(key = %key, size_bytes = size, bucket = %self.bucket, "S3 upload successful");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        validate_key(key)?;

        let resp = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    return Ok(None);
                }
                return Err(StorageError::Backend(format!(
                    "GetObject {}: {}",
                    key,
                    DisplayErrorContext(&e)
                )));
            }
        };

        let content_length = resp.content_length().and_then(|len| u64::try_from(len).ok());
        let reader = resp.body.into_async_read();

        Ok(Some(StoredObject {
            content_length,
            body: Box::pin(ReaderStream::new(reader)),
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("DeleteObject {}: {}", key, DisplayErrorContext(&e))))?;

        Ok(())
    }

    async fn presigned_get(&self, key: &str, expires_in: Duration) -> Result<Option<String>, StorageError> {
        validate_key(key)?;

        let config = PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Url(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| StorageError::Url(format!("{}", DisplayErrorContext(&e))))?;

        Ok(Some(request.uri().to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
