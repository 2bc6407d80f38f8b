//! Google Drive app-folder storage adapter.
//!
//! Grounded on `original_source`'s `adapters/gdrive.py`: files live in the
//! hidden `appDataFolder`, Drive is id-based so a path→file_id cache is kept
//! (here a `dashmap::DashMap` instead of a plain dict, since the adapter is
//! `Send + Sync` and shared behind an `Arc`), `upload_fresh` refuses to
//! overwrite a cached id, and `upload_if_match` sends `If-Match` on the PATCH
//! and maps a `412` response to [`CorncobError::ETagMismatch`]. New files are
//! created with a multipart `metadata + content` body exactly as the Python
//! adapter builds it.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::RwLock;

use corncob_core::domain::errors::CorncobError;
use corncob_core::ports::storage_adapter::{ObjectContent, StorageAdapter, Tokens, TOKEN_REFRESH_SKEW};

use crate::oauth::OAuthLoginFlow;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD: &str = "https://www.googleapis.com/upload/drive/v3";
const MULTIPART_BOUNDARY: &str = "corncob_boundary";

pub struct GDriveAdapter {
    client: reqwest::Client,
    tokens: RwLock<Tokens>,
    oauth: OAuthLoginFlow,
    path_ids: DashMap<String, String>,
    api_base: String,
    upload_base: String,
}

impl GDriveAdapter {
    pub fn new(tokens: Tokens, oauth: OAuthLoginFlow, path_ids: std::collections::HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens: RwLock::new(tokens),
            oauth,
            path_ids: path_ids.into_iter().collect(),
            api_base: DRIVE_API.to_string(),
            upload_base: DRIVE_UPLOAD.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_bases(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
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

    async fn find_file_id(&self, path: &str) -> Result<Option<String>, CorncobError> {
        if let Some(id) = self.path_ids.get(path) {
            return Ok(Some(id.clone()));
        }
        let token = self.access_token().await?;
        let query = format!("name='{path}' and 'appDataFolder' in parents and trashed=false");
        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "appDataFolder"),
                ("fields", "files(id,name)"),
            ])
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive list {path}: {e}")))?;
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "drive list {path}: status {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive list {path} body: {e}")))?;
        let file_id = body["files"]
            .as_array()
            .and_then(|files| files.first())
            .and_then(|file| file["id"].as_str())
            .map(|s| s.to_string());
        if let Some(id) = &file_id {
            self.path_ids.insert(path.to_string(), id.clone());
        }
        Ok(file_id)
    }

    async fn create_file(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        let token = self.access_token().await?;
        let metadata = json!({ "name": path, "parents": ["appDataFolder"] }).to_string();
        let mut body = format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{MULTIPART_BOUNDARY}\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());

        let response = self
            .client
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .query(&[("uploadType", "multipart")])
            .body(body)
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive create {path}: {e}")))?;
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "drive create {path}: status {}",
                response.status()
            )));
        }
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_default();
        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive create {path} body: {e}")))?;
        if let Some(id) = result["id"].as_str() {
            self.path_ids.insert(path.to_string(), id.to_string());
        }
        Ok(etag)
    }
}

#[async_trait]
impl StorageAdapter for GDriveAdapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let Some(file_id) = self.find_file_id(path).await? else {
            return Err(CorncobError::NotFound(path.to_string()));
        };
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/files/{file_id}", self.api_base))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive download {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.path_ids.remove(path);
            return Err(CorncobError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "drive download {path}: status {}",
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
            .map_err(|e| CorncobError::Transport(format!("drive download {path} body: {e}")))?
            .to_vec();
        Ok(ObjectContent { bytes, etag })
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        match self.find_file_id(path).await? {
            None => self.create_file(path, bytes, content_type).await,
            Some(file_id) => self.patch_file(path, &file_id, bytes, content_type, None).await,
        }
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError> {
        if self.find_file_id(path).await?.is_some() {
            return Err(CorncobError::AlreadyExists(path.to_string()));
        }
        self.create_file(path, bytes, content_type).await
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        content_type: &str,
    ) -> Result<String, CorncobError> {
        let Some(file_id) = self.find_file_id(path).await? else {
            return Err(CorncobError::NotFound(path.to_string()));
        };
        self.patch_file(path, &file_id, bytes, content_type, Some(etag)).await
    }

    async fn serialize_state(&self) -> Option<String> {
        let snapshot: std::collections::HashMap<String, String> = self
            .path_ids
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        serde_json::to_string(&snapshot).ok()
    }
}

impl GDriveAdapter {
    async fn patch_file(
        &self,
        path: &str,
        file_id: &str,
        bytes: &[u8],
        content_type: &str,
        if_match: Option<&str>,
    ) -> Result<String, CorncobError> {
        let token = self.access_token().await?;
        let mut request = self
            .client
            .patch(format!("{}/files/{file_id}", self.upload_base))
            .bearer_auth(&token)
            .header("Content-Type", content_type)
            .query(&[("uploadType", "media")])
            .body(bytes.to_vec());
        if let Some(etag) = if_match {
            request = request.header("If-Match", etag);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CorncobError::Transport(format!("drive update {path}: {e}")))?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(CorncobError::ETagMismatch {
                path: path.to_string(),
                expected: if_match.unwrap_or_default().to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(CorncobError::Transport(format!(
                "drive update {path}: status {}",
                response.status()
            )));
        }
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .unwrap_or_default();
        Ok(etag)
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

    fn adapter_against(server: &MockServer) -> GDriveAdapter {
        let oauth = OAuthLoginFlow::new(OAuth2Config::google_drive("client"), 8401);
        GDriveAdapter::new(fresh_tokens(), oauth, Default::default())
            .with_api_bases(server.uri(), server.uri())
    }

    #[tokio::test]
    async fn upload_fresh_creates_a_new_file_when_none_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("ETag", "\"v1\"")
                    .set_body_json(json!({"id": "file-1"})),
            )
            .mount(&server)
            .await;

        let adapter = adapter_against(&server);
        let etag = adapter
            .upload_fresh("latest-link.yaml", b"hello", "application/yaml")
            .await
            .unwrap();
        assert_eq!(etag, "v1");
        assert_eq!(
            adapter.path_ids.get("latest-link.yaml").map(|e| e.clone()),
            Some("file-1".to_string())
        );
    }

    #[tokio::test]
    async fn upload_fresh_refuses_when_cache_already_has_an_id() {
        let server = MockServer::start().await;
        let adapter = adapter_against(&server);
        adapter.path_ids.insert("latest-link.yaml".to_string(), "existing".to_string());

        let err = adapter
            .upload_fresh("latest-link.yaml", b"hello", "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn upload_if_match_maps_412_to_etag_mismatch() {
        let server = MockServer::start().await;
        let adapter = adapter_against(&server);
        adapter.path_ids.insert("latest-link.yaml".to_string(), "file-1".to_string());
        Mock::given(method("PATCH"))
            .and(path("/files/file-1"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let err = adapter
            .upload_if_match("latest-link.yaml", b"v2", "stale", "application/yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::ETagMismatch { .. }));
    }
}
