use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::infrastructure::storage::StorageError;

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadClaims {
    pub sub: String,
    pub exp: u64,
}

#[derive(Clone)]
pub struct LinkBuilder {
    base: Url,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl LinkBuilder {
    pub fn new(public_base_url: &str, secret: &str) -> Result<Self, StorageError> {
        let base = Url::parse(public_base_url)
            .map_err(|e| StorageError::Url(format!("invalid public base url {:?}: {}", public_base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(StorageError::Url(format!("{:?} cannot be a base url", public_base_url)));
        }
        Ok(Self {
            base,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn direct(&self, key: &str) -> Result<String, StorageError> {
        Ok(self.download_url(key)?.to_string())
    }

    pub fn signed(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let claims = DownloadClaims {
            sub: key.to_string(),
            exp: get_current_timestamp() + expires_in.as_secs(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| StorageError::Url(format!("failed to sign download token: {}", e)))?;

        let mut url = self.download_url(key)?;
        url.query_pairs_mut().append_pair("token", &token);
        Ok(url.to_string())
    }

    pub fn verify(&self, key: &str, token: &str) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<DownloadClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims.sub == key,
            Err(_) => false,
        }
    }

    fn download_url(&self, key: &str) -> Result<Url, StorageError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Url("public base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("download")
            .push(key);
        Ok(url)
    }
}
