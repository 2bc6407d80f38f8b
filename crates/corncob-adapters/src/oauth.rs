//! OAuth2 PKCE flow shared by the Google Drive and Dropbox adapters.
//!
//! Generalizes `lnxdrive-graph`'s `auth.rs` (Microsoft identity platform PKCE
//! flow) to an arbitrary provider's authorize/token endpoints, since Drive and
//! Dropbox both speak the same Authorization Code + PKCE dance with different
//! URLs and scopes.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};

use corncob_core::ports::storage_adapter::Tokens;

const KEYRING_SERVICE: &str = "corncob";

/// Provider-specific OAuth2 PKCE endpoints and scopes.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    pub fn google_drive(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uri: "http://127.0.0.1:8401/callback".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/drive.appdata".to_string()],
        }
    }

    pub fn dropbox(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: "https://www.dropbox.com/oauth2/authorize".to_string(),
            token_url: "https://api.dropboxapi.com/oauth2/token".to_string(),
            redirect_uri: "http://127.0.0.1:8402/callback".to_string(),
            scopes: vec!["files.content.write".to_string(), "files.content.read".to_string()],
        }
    }
}

/// Stores and retrieves OAuth tokens from the system keyring, keyed by a
/// short account reference (`SPEC_FULL.md`'s `account_ref`).
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    pub fn store(account_ref: &str, tokens: &Tokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account_ref)
            .context("failed to create keyring entry")?;
        let json = serde_json::to_string(tokens).context("failed to serialize tokens")?;
        entry
            .set_password(&json)
            .context("failed to store tokens in keyring")?;
        debug!(account_ref, "stored tokens in keyring");
        Ok(())
    }

    pub fn load(account_ref: &str) -> Result<Option<Tokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account_ref)
            .context("failed to create keyring entry")?;
        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens =
                    serde_json::from_str(&json).context("failed to deserialize tokens")?;
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("failed to read from keyring")),
        }
    }

    pub fn clear(account_ref: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account_ref)
            .context("failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("failed to delete from keyring")),
        }
    }
}

pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl PKCEFlow {
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("invalid authorization url")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("invalid token url")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("invalid redirect uri")?,
            );
        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }
        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("exchanging authorization code for tokens");
        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("failed to exchange authorization code")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
        })
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("refreshing access token");
        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .context("failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        })
    }
}

/// Minimal single-connection HTTP server for receiving the OAuth redirect,
/// same shape as `lnxdrive-graph`'s `LocalCallbackServer` but parameterized
/// over the port so Drive and Dropbox don't collide.
pub struct LocalCallbackServer;

#[derive(Debug)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

impl LocalCallbackServer {
    pub async fn start(port: u16) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        let addr = format!("127.0.0.1:{port}");
        info!(addr, "starting local oauth callback server");
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind callback server to {addr}"))?;

        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let (stream, _addr) = listener
            .accept()
            .await
            .context("failed to accept connection on callback server")?;
        let io = TokioIo::new(stream);
        let tx_clone = tx.clone();

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let tx_inner = tx_clone.clone();
            async move {
                let uri = req.uri().to_string();
                let params = parse_callback_params(&uri);
                match params {
                    Some(callback_params) => {
                        if let Some(sender) = tx_inner.lock().await.take() {
                            let _ = sender.send(callback_params);
                        }
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "text/html; charset=utf-8")
                                .body(Full::new(Bytes::from(success_html())))
                                .unwrap(),
                        )
                    }
                    None => Ok(Response::builder()
                        .status(StatusCode::BAD_REQUEST)
                        .header("Content-Type", "text/html; charset=utf-8")
                        .body(Full::new(Bytes::from(error_html(
                            "missing authorization code in callback",
                        ))))
                        .unwrap()),
                }
            }
        });

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %e, "callback server connection error");
            }
        });

        rx.await
            .context("callback server channel closed without receiving parameters")
    }
}

fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{uri}")).ok()?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }
    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

fn success_html() -> String {
    "<!DOCTYPE html><html><head><title>CornCob - Authentication Successful</title></head>\
     <body style=\"font-family: sans-serif; text-align: center; padding-top: 50px;\">\
     <h1>Authentication Successful</h1><p>You can close this window.</p>\
     <script>setTimeout(function() { window.close(); }, 3000);</script></body></html>"
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>CornCob - Authentication Error</title></head>\
         <body style=\"font-family: sans-serif; text-align: center; padding-top: 50px;\">\
         <h1>Authentication Error</h1><p>{message}</p></body></html>"
    )
}

/// Orchestrates the interactive login flow: auth URL, browser launch, local
/// callback, code exchange.
pub struct OAuthLoginFlow {
    config: OAuth2Config,
    callback_port: u16,
}

impl OAuthLoginFlow {
    pub fn new(config: OAuth2Config, callback_port: u16) -> Self {
        Self {
            config,
            callback_port,
        }
    }

    pub async fn login(&self) -> Result<Tokens> {
        let flow = PKCEFlow::new(&self.config)?;
        let (auth_url, _csrf_token, pkce_verifier) = flow.generate_auth_url();
        webbrowser::open(&auth_url).context("failed to open browser for authentication")?;
        let callback = LocalCallbackServer::start(self.callback_port).await?;
        flow.exchange_code(callback.code, pkce_verifier).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let flow = PKCEFlow::new(&self.config)?;
        flow.refresh_token(refresh_token).await
    }
}
