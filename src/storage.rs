use async_trait::async_trait;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Blob storage boundary: accepts image bytes under a stable path
/// reference; posts persist only the reference.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn save(&self, path: &str, mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError>;
    async fn load(&self, path: &str) -> Result<(Vec<u8>, String), MediaStoreError>;
    async fn delete(&self, path: &str) -> Result<(), MediaStoreError>;
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into())
}

// Paths arrive as "posts/<sha256>"; reject anything that could walk out of
// the media root.
fn path_is_safe(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
}

// ---------------- Filesystem backend (default / dev) ----------------

pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new() -> Self {
        let root = std::env::var("QUILL_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        Self { root }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, MediaStoreError> {
        if !path_is_safe(path) {
            return Err(MediaStoreError::NotFound);
        }
        Ok(self.root.join(path))
    }
}

impl Default for FsMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(&self, path: &str, _mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError> {
        let full = self.full_path(path)?;
        if full.exists() {
            return Err(MediaStoreError::Duplicate);
        }
        if let Some(dir) = full.parent() {
            std::fs::create_dir_all(dir).map_err(|e| MediaStoreError::Other(e.to_string()))?;
        }
        std::fs::write(&full, bytes).map_err(|e| MediaStoreError::Other(e.to_string()))
    }
    async fn load(&self, path: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let full = self.full_path(path)?;
        let bytes = std::fs::read(&full).map_err(|_| MediaStoreError::NotFound)?;
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
    async fn delete(&self, path: &str) -> Result<(), MediaStoreError> {
        let full = self.full_path(path)?;
        let _ = std::fs::remove_file(full); // absent is fine
        Ok(())
    }
}

// ---------------- S3 backend (MinIO compatible) ----------------

pub struct S3MediaStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3MediaStore {
    pub async fn new() -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "quill-media".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set for the S3 media backend"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing is required for MinIO-style endpoints
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);

        if client.head_bucket().bucket(&bucket).send().await.is_err() {
            warn!("bucket '{bucket}' missing, creating");
            client
                .create_bucket()
                .bucket(&bucket)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("failed to ensure bucket '{bucket}': {e}"))?;
        }
        info!("S3 media store ready (bucket '{bucket}')");

        Ok(Self { bucket, client })
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn save(&self, path: &str, mime: &str, bytes: &[u8]) -> Result<(), MediaStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        if !path_is_safe(path) {
            return Err(MediaStoreError::NotFound);
        }
        if self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .is_ok()
        {
            return Err(MediaStoreError::Duplicate);
        }
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(mime)
            .send()
            .await
            .map_err(|e| {
                error!("put_object failed key={path} bucket={}: {e:?}", self.bucket);
                MediaStoreError::Other(e.to_string())
            })?;
        Ok(())
    }
    async fn load(&self, path: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        if !path_is_safe(path) {
            return Err(MediaStoreError::NotFound);
        }
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|_| MediaStoreError::NotFound)?;
        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| MediaStoreError::Other(e.to_string()))?;
        let bytes = Vec::from(data.into_bytes().as_ref());
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
    async fn delete(&self, path: &str) -> Result<(), MediaStoreError> {
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;
        Ok(())
    }
}

/// S3 when an endpoint is configured, local filesystem otherwise.
pub async fn build_media_store() -> Arc<dyn MediaStore> {
    if std::env::var("S3_ENDPOINT").is_ok() {
        match S3MediaStore::new().await {
            Ok(store) => return Arc::new(store),
            Err(e) => panic!("failed to initialize S3 media store: {e}"),
        }
    }
    info!("using filesystem media store");
    Arc::new(FsMediaStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_paths() {
        assert!(!path_is_safe("../etc/passwd"));
        assert!(!path_is_safe("posts/../../x"));
        assert!(!path_is_safe("/abs"));
        assert!(!path_is_safe(""));
        assert!(path_is_safe("posts/abcdef"));
    }
}
