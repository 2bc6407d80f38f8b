//! Dropbox app-folder storage adapter.
//!
//! Grounded on `original_source`'s `adapters/dropbox.py`: Dropbox's path-based
//! API needs no id cache, and conditional writes ride on the upload `mode`
//! tag (`overwrite` / `add` / `update`) rather than a header. The Dropbox
//! `rev` field stands in for an etag everywhere `StorageAdapter` expects one.
//! A `409 Conflict` with `error..tag == "path"` is reinterpreted as
//! `AlreadyExists` (when the write was `add`) or `ETagMismatch` (when the
//! write was `update` and the reason is `conflict`), mirroring the Python
//! adapter's response inspection.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use corncob_core::domain::errors::CorncobError;
use corncob_core::ports::storage_adapter::{ObjectContent, StorageAdapter, Tokens, TOKEN_REFRESH_SKEW};

use crate::oauth::OAuthLoginFlow;

const DROPBOX_CONTENT: &str = "https://content.dropboxapi.com/2";

pub struct DropboxAdapter {
    client: reqwest::Client,
    tokens: RwLock<Tokens>,
    oauth: OAuthLoginFlow,
    content_base: String,
}

impl DropboxAdapter {
    pub fn new(tokens: Tokens, oauth: OAuthLoginFlow) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens: RwLock::new(tokens),
            oauth,
            content_base: DROPBOX_CONTENT.to_string(),
        }
    }

    #[cfg(test)]
    fn with_content_base(mut self, base: impl Into<String>) -> Self {
        self.content_base = base.into();
        self
    }

    async fn access_token(&self) -> Result<String, CorncobError> {
        {
            let tokens = self.tokens.read().await;
            if !tokens.expires_within(TOKEN_REFRESH_SKEW) {
                return Ok(tokens.access_token.clone());
            }
        }
        let Some(refresh_token) = self.tokens.read().await.refresh_token.clone() else {
            return Err(CorncobError::AuthExpired(
                "access token expired and no refresh token on file".to_string(),
            ));
        };
        let refreshed = self
            .oauth
            .refresh(&refresh_token)
            .await
            .map_err(|e| CorncobError::AuthExpired(format!("token refresh failed: {e}")))?;
        let access_token = refreshed.access_token.clone();
        *self.tokens.write().await = refreshed;
        Ok(access_token)
    }

    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        mode: serde_json::Value,
        fresh: bool,
    ) -> Result<String, CorncobError> {
        let token = self.access_token().await?;
        let api_arg = json!({
            "path": format!("/{path}"),
            "mode": mode,
            "autorename": false,
            "mute": true,
        })
        .to_string();

        let response = self
            .client
            .post(format!("{}/files/upload", self.content_base))
            .bearer_auth(&token)
            .header("Dropbox-API-Arg", api_arg)
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("dropbox upload {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            let body: serde_json::Value = response
                .json()
                .await
                .unwrap_or_else(|_| json!({}));
            let error_tag = body["error"][".tag"].as_str().unwrap_or("");
            if error_tag == "path" {
                if fresh {
                    return Err(CorncobError::AlreadyExists(path.to_string()));
                }
                let reason = body["error"]["reason"][".tag"].as_str().unwrap_or("");
                if reason == "conflict" {
                    return Err(CorncobError::ETagMismatch {
                        path: path.to_string(),
                        expected: String::new(),
                    });
                }
            }
            let summary = body["error_summary"].as_str().unwrap_or("unknown").to_string();
            return Err(CorncobError::Transport(format!("dropbox upload {path}: {summary}")));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "dropbox upload {path}: status {}",
                response.status()
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CorncobError::Transport(format!("dropbox upload {path} body: {e}")))?;
        Ok(result["rev"].as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl StorageAdapter for DropboxAdapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let token = self.access_token().await?;
        let api_arg = json!({ "path": format!("/{path}") }).to_string();

        let response = self
            .client
            .post(format!("{}/files/download", self.content_base))
            .bearer_auth(&token)
            .header("Dropbox-API-Arg", api_arg)
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("dropbox download {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(CorncobError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "dropbox download {path}: status {}",
                response.status()
            )));
        }

        let rev = response
            .headers()
            .get("Dropbox-API-Result")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|result| result["rev"].as_str().map(|s| s.to_string()))
            .unwrap_or_default();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CorncobError::Transport(format!("dropbox download {path} body: {e}")))?
            .to_vec();
        Ok(ObjectContent { bytes, etag: rev })
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        self.upload(path, bytes, json!({ ".tag": "overwrite" }), false).await
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        self.upload(path, bytes, json!({ ".tag": "add" }), true).await
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        self.upload(path, bytes, json!({ ".tag": "update", "update": etag }), false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuth2Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fresh_tokens() -> Tokens {
        Tokens {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn adapter_against(server: &MockServer) -> DropboxAdapter {
        let oauth = OAuthLoginFlow::new(OAuth2Config::dropbox("client"), 8402);
        DropboxAdapter::new(fresh_tokens(), oauth).with_content_base(server.uri())
    }

    #[tokio::test]
    async fn upload_fresh_sends_add_mode_and_returns_rev() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rev": "rev-1"})))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let rev = adapter
            .upload_fresh("latest-link.yaml", b"hello", "application/yaml")
            .await
            .unwrap();
        assert_eq!(rev, "rev-1");
    }

    #[tokio::test]
    async fn upload_fresh_conflict_on_existing_path_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {".tag": "path"},
                "error_summary": "path/conflict/"
            })))
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
    async fn upload_if_match_conflict_maps_to_etag_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {".tag": "path", "reason": {".tag": "conflict"}},
                "error_summary": "path/conflict/"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter
            .upload_if_match("latest-link.yaml", b"v2", "stale-rev", "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::ETagMismatch { .. }));
    }

    #[tokio::test]
    async fn download_conflict_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/download"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({})))
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let err = adapter.download("latest-link.yaml").await.unwrap_err();
        assert!(matches!(err, CorncobError::NotFound(_)));
    }
}
