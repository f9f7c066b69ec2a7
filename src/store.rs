//! Durable key-value storage for pipeline messages.
//!
//! [`MessageStore`] is the seam between the pipeline and whatever holds its
//! messages. Keys are opaque strings of the form `"<stage>:<hashslug>"`.
//! Writes are last-writer-wins. Stages never read back what they wrote;
//! `TaskPipeline::run_stored` reads a stage's input key to resume a run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::error::{Result, SerapisError};
use crate::message::Message;

/// A durable message store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Write `message` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SerapisError`] if the message cannot be serialized or the
    /// backend rejects the write.
    async fn put(&self, key: &str, message: &Message) -> Result<()>;

    /// Read the message stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SerapisError`] if the backend fails or the stored value is
    /// not a message.
    async fn get(&self, key: &str) -> Result<Option<Message>>;
}

/// Receives the final message of a pipeline run.
#[async_trait]
pub trait ResultArchive: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SerapisError`] if the message could not be archived.
    async fn archive(&self, message: &Message) -> Result<()>;
}

/// Stores each message as a pretty-printed JSON file named after its key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(SerapisError::Storage(format!("invalid message key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl MessageStore for LocalStore {
    async fn put(&self, key: &str, message: &Message) -> Result<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(message)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "message written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Message>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stores messages in an HTTP object store bucket.
///
/// Objects live at `{endpoint}/{bucket}/{key}` and are written with `PUT`.
#[derive(Clone)]
pub struct ObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl ObjectStore {
    /// # Errors
    ///
    /// Returns [`SerapisError::Storage`] if the endpoint is empty or the HTTP
    /// client cannot be built.
    pub fn new(
        endpoint: &str,
        bucket: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(SerapisError::Storage("object store endpoint is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SerapisError::Storage(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            bucket: bucket.into(),
            token,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageStore for ObjectStore {
    async fn put(&self, key: &str, message: &Message) -> Result<()> {
        let body = serde_json::to_vec(message)?;
        let request = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SerapisError::Storage(format!("PUT {key} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SerapisError::Storage(format!(
                "PUT {key} returned HTTP {status}"
            )));
        }
        tracing::debug!(bucket = %self.bucket, key, "message uploaded");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Message>> {
        let request = self.client.get(self.object_url(key));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SerapisError::Storage(format!("GET {key} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SerapisError::Storage(format!(
                "GET {key} returned HTTP {status}"
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| SerapisError::Storage(format!("GET {key} read failed: {e}")))?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

/// In-process store that records every write in order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<(String, Message)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(key, message)` written so far, oldest first.
    pub fn writes(&self) -> Vec<(String, Message)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keys written so far, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.writes().into_iter().map(|(key, _)| key).collect()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn put(&self, key: &str, message: &Message) -> Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_owned(), message.clone()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Message>> {
        Ok(self
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, message)| message.clone()))
    }
}

/// Archives final messages into a store, keyed by hashslug.
pub struct StoreArchive {
    store: Arc<dyn MessageStore>,
}

impl StoreArchive {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResultArchive for StoreArchive {
    async fn archive(&self, message: &Message) -> Result<()> {
        self.store.put(&message.hashslug, message).await
    }
}

/// Build the message store selected by `config`.
///
/// # Errors
///
/// Returns [`SerapisError::Storage`] if the remote store cannot be set up.
pub fn message_store(config: &StorageConfig) -> Result<Arc<dyn MessageStore>> {
    if config.save_messages {
        Ok(Arc::new(ObjectStore::new(
            &config.endpoint,
            config.bucket.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?))
    } else {
        Ok(Arc::new(LocalStore::new(&config.local_s3)))
    }
}

/// Build the archive for final results: the result bucket, or a
/// subdirectory of `local_s3` named after it.
///
/// # Errors
///
/// Returns [`SerapisError::Storage`] if the remote store cannot be set up.
pub fn result_archive(config: &StorageConfig) -> Result<Arc<dyn ResultArchive>> {
    let store: Arc<dyn MessageStore> = if config.save_messages {
        Arc::new(ObjectStore::new(
            &config.endpoint,
            config.result_bucket.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?)
    } else {
        Arc::new(LocalStore::new(config.local_s3.join(&config.result_bucket)))
    };
    Ok(Arc::new(StoreArchive::new(store)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> Message {
        let mut message = Message::new("dither");
        message.hashslug = "dither:abc123".into();
        message
    }

    #[tokio::test]
    async fn local_store_writes_pretty_json_under_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("local_s3"));

        store.put("detect:dither:abc123", &message()).await.unwrap();

        let path = dir.path().join("local_s3").join("detect:dither:abc123");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"word\": \"dither\""));
        let back = store.get("detect:dither:abc123").await.unwrap();
        assert_eq!(back, Some(message()));
    }

    #[tokio::test]
    async fn local_store_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let mut updated = message();
        updated.crawl_date = Some("2015-11-20T00:00:00+00:00".into());
        store.put("rate:dither:abc123", &message()).await.unwrap();
        store.put("rate:dither:abc123", &updated).await.unwrap();

        assert_eq!(store.get("rate:dither:abc123").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn local_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.get("save:nothing:000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.put("../escape", &message()).await.unwrap_err();
        assert!(matches!(err, SerapisError::Storage(_)));
    }

    #[tokio::test]
    async fn object_store_puts_json_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/messages/detect:dither:abc123"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "Bearer s3cret"))
            .and(body_partial_json(serde_json::json!({
                "word": "dither",
                "hashslug": "dither:abc123"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = ObjectStore::new(
            &format!("{}/", server.uri()),
            "messages",
            Some("s3cret".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        store.put("detect:dither:abc123", &message()).await.unwrap();
    }

    #[tokio::test]
    async fn object_store_error_status_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store =
            ObjectStore::new(&server.uri(), "messages", None, Duration::from_secs(5)).unwrap();
        let err = store.put("save:x:000000", &message()).await.unwrap_err();
        assert!(matches!(err, SerapisError::Storage(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn object_store_get_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages/rate:dither:abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&message()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store =
            ObjectStore::new(&server.uri(), "messages", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.get("rate:dither:abc123").await.unwrap(),
            Some(message())
        );
        assert!(store.get("rate:other:000000").await.unwrap().is_none());
    }

    #[test]
    fn object_store_requires_endpoint() {
        assert!(ObjectStore::new("  ", "b", None, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn memory_store_records_in_order() {
        let store = MemoryStore::new();
        store.put("detect:a", &message()).await.unwrap();
        store.put("rate:a", &message()).await.unwrap();
        assert_eq!(store.keys(), vec!["detect:a", "rate:a"]);
        assert!(store.get("save:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_archive_writes_into_result_bucket_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            local_s3: dir.path().to_path_buf(),
            ..Default::default()
        };
        let archive = result_archive(&config).unwrap();
        archive.archive(&message()).await.unwrap();
        assert!(dir.path().join("serapis-results").join("dither:abc123").exists());
    }
}
