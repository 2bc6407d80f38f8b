//! SmallSea hub-relay storage adapter.
//!
//! `original_source`'s hub (`small_sea_hub/server.py`) never actually
//! implements its `upload_to_cloud`/`download_from_cloud` routes — both are
//! `raise NotImplementedError` stubs — so there is no wire contract to
//! translate here. This adapter instead authors a small, self-consistent
//! REST contract for a hub that simply relays conditional object writes for
//! a session-scoped zone, in the same request/response shape the other
//! adapters use (bytes + etag in, `If-None-Match`/`If-Match` + `412` out),
//! bearer-authenticated by the session token handed out at `corncob clone`
//! time. See `DESIGN.md` for the rationale.
//!
//! Routes (this adapter's own contract, not a translation of anything in
//! `original_source`):
//! - `GET  /zones/{session_token}/objects/{path}`
//! - `PUT  /zones/{session_token}/objects/{path}` (`If-None-Match: *` / `If-Match: <etag>`)

use async_trait::async_trait;

use corncob_core::domain::errors::CorncobError;
use corncob_core::ports::storage_adapter::{ObjectContent, StorageAdapter};

pub struct SmallSeaAdapter {
    client: reqwest::Client,
    hub_base_url: String,
    session_token: String,
}

impl SmallSeaAdapter {
    pub fn new(hub_base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            hub_base_url: hub_base_url.into(),
            session_token: session_token.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/zones/{}/objects/{path}",
            self.hub_base_url.trim_end_matches('/'),
            self.session_token
        )
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        condition: Option<&str>,
        fresh: bool,
    ) -> Result<String, CorncobError> {
        let mut request = self
            .client
            .put(self.object_url(path))
            .bearer_auth(&self.session_token)
            .header("Content-Type", content_type)
            .body(bytes.to_vec());
        if fresh {
            request = request.header("If-None-Match", "*");
        } else if let Some(etag) = condition {
            request = request.header("If-Match", etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("smallsea put {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(if fresh {
                CorncobError::AlreadyExists(path.to_string())
            } else {
                CorncobError::ETagMismatch {
                    path: path.to_string(),
                    expected: condition.unwrap_or_default().to_string(),
                }
            });
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CorncobError::AuthExpired(format!(
                "smallsea session token rejected for {path}"
            )));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "smallsea put {path}: status {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .ok_or_else(|| CorncobError::Transport(format!("smallsea put {path}: no ETag returned")))?;
        Ok(etag)
    }
}

#[async_trait]
impl StorageAdapter for SmallSeaAdapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let response = self
            .client
            .get(self.object_url(path))
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("smallsea get {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CorncobError::NotFound(path.to_string()));
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CorncobError::AuthExpired(format!(
                "smallsea session token rejected for {path}"
            )));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "smallsea get {path}: status {}",
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
            .map_err(|e| CorncobError::Transport(format!("smallsea get {path} body: {e}")))?
            .to_vec();
        Ok(ObjectContent { bytes, etag })
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, None, false).await
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, None, true).await
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        content_type: &str,
    ) -> Result<String, CorncobError> {
        self.put(path, bytes, content_type, Some(etag), false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_against(server: &MockServer) -> SmallSeaAdapter {
        SmallSeaAdapter::new(server.uri(), "session-token-abc")
    }

    #[tokio::test]
    async fn upload_fresh_sends_if_none_match_any() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/zones/session-token-abc/objects/latest-link.yaml"))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"v1\""))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let etag = adapter
            .upload_fresh("latest-link.yaml", b"hello", "application/yaml")
            .await
            .unwrap();
        assert_eq!(etag, "v1");
    }

    #[tokio::test]
    async fn precondition_failed_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/zones/session-token-abc/objects/latest-link.yaml"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter
            .upload_fresh("latest-link.yaml", b"hello", "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones/session-token-abc/objects/latest-link.yaml"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter.download("latest-link.yaml").await.unwrap_err();
        assert!(matches!(err, CorncobError::AuthExpired(_)));
    }
}
