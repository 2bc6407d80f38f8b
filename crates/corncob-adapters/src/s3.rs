//! S3 (or S3-compatible) object storage adapter.
//!
//! Grounded on `original_source`'s `adapters/s3.py`: unconditional
//! `upload_overwrite` maps to a plain `PUT`, `upload_fresh` adds
//! `If-None-Match: *`, and `upload_if_match` adds `If-Match: <etag>`. A `412
//! Precondition Failed` response is reinterpreted the same way the Python
//! adapter reinterprets botocore's `PreconditionFailed`: as `AlreadyExists`
//! when the write was meant to be fresh, otherwise as `ETagMismatch`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;

use corncob_core::domain::errors::CorncobError;
use corncob_core::ports::storage_adapter::{ObjectContent, StorageAdapter};

use crate::sigv4::{uri_encode, SigV4Signer};

pub struct S3Adapter {
    client: reqwest::Client,
    bucket: String,
    region: String,
    signer: SigV4Signer,
    /// Overrides the virtual-hosted AWS URL, for S3-compatible services
    /// (MinIO, a local test double) that serve a single bucket at a plain
    /// base URL instead of `<bucket>.s3.<region>.amazonaws.com`.
    endpoint_override: Option<String>,
}

impl S3Adapter {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let region = region.into();
        Self {
            client: reqwest::Client::new(),
            signer: SigV4Signer::new(access_key_id, secret_access_key, region.clone()),
            bucket: bucket.into(),
            region,
            endpoint_override: None,
        }
    }

    pub fn with_endpoint_override(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint_override = Some(base_url.into());
        self
    }

    fn host(&self) -> String {
        match &self.endpoint_override {
            Some(base) => url::Url::parse(base)
                .ok()
                .and_then(|u| u.host_str().map(|h| match u.port() {
                    Some(port) => format!("{h}:{port}"),
                    None => h.to_string(),
                }))
                .unwrap_or_else(|| self.bucket.clone()),
            None => format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    fn object_url(&self, path: &str) -> String {
        match &self.endpoint_override {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => format!("https://{}/{}", self.host(), path),
        }
    }

    fn canonical_path(&self, path: &str) -> String {
        format!("/{}", uri_encode(path))
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        condition: PutCondition<'_>,
    ) -> Result<String, CorncobError> {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), self.host());
        headers.insert("content-type".to_string(), content_type.to_string());
        match condition {
            PutCondition::None => {}
            PutCondition::IfNoneMatchAny => {
                headers.insert("if-none-match".to_string(), "*".to_string());
            }
            PutCondition::IfMatch(etag) => {
                headers.insert("if-match".to_string(), etag.to_string());
            }
        }

        let signed = self.signer.sign(
            "PUT",
            &self.canonical_path(path),
            &headers,
            bytes,
            Utc::now(),
        );

        let mut request = self.client.put(self.object_url(path)).body(bytes.to_vec());
        for (name, value) in &signed.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("s3 put {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(match condition {
                PutCondition::IfNoneMatchAny => CorncobError::AlreadyExists(path.to_string()),
                PutCondition::IfMatch(etag) => CorncobError::ETagMismatch {
                    path: path.to_string(),
                    expected: etag.to_string(),
                },
                PutCondition::None => CorncobError::Transport(format!(
                    "s3 put {path}: unexpected precondition failure on unconditional write"
                )),
            });
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "s3 put {path}: status {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .ok_or_else(|| CorncobError::Transport(format!("s3 put {path}: no ETag returned")))?;
        Ok(etag)
    }
}

enum PutCondition<'a> {
    None,
    IfNoneMatchAny,
    IfMatch(&'a str),
}

#[async_trait]
impl StorageAdapter for S3Adapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), self.host());
        let signed = self
            .signer
            .sign("GET", &self.canonical_path(path), &headers, b"", Utc::now());

        let mut request = self.client.get(self.object_url(path));
        for (name, value) in &signed.headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("s3 get {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CorncobError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "s3 get {path}: status {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_default();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CorncobError::Transport(format!("s3 get {path} body: {e}")))?
            .to_vec();
        Ok(ObjectContent { bytes, etag })
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, PutCondition::None).await
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, PutCondition::IfNoneMatchAny).await
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, PutCondition::IfMatch(etag)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_against(server: &MockServer) -> S3Adapter {
        S3Adapter::new("corncob-team", "us-east-1", "AKIDEXAMPLE", "secret")
            .with_endpoint_override(server.uri())
    }

    #[tokio::test]
    async fn upload_fresh_sends_if_none_match_any_and_returns_the_new_etag() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/latest-link.yaml"))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc123\""))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let etag = adapter
            .upload_fresh("latest-link.yaml", b"body", "application/yaml")
            .await
            .unwrap();
        assert_eq!(etag, "abc123");
    }

    #[tokio::test]
    async fn precondition_failed_maps_to_already_exists_for_fresh_writes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/B-abc.bundle"))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter
            .upload_fresh("B-abc.bundle", b"data", "application/octet-stream")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn precondition_failed_maps_to_etag_mismatch_for_conditional_writes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/latest-link.yaml"))
            .and(header("if-match", "stale-etag"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter
            .upload_if_match("latest-link.yaml", b"data", "stale-etag", "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::ETagMismatch { .. }));
    }

    #[tokio::test]
    async fn download_missing_object_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest-link.yaml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter.download("latest-link.yaml").await.unwrap_err();
        assert!(matches!(err, CorncobError::NotFound(_)));
    }

    #[tokio::test]
    async fn download_returns_bytes_and_etag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/B-abc.bundle"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"def456\"")
                    .set_body_bytes(b"bundle-bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let content = adapter.download("B-abc.bundle").await.unwrap();
        assert_eq!(content.bytes, b"bundle-bytes");
        assert_eq!(content.etag, "def456");
    }
}
