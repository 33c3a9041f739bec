use super::token::Credential;
use crate::config::Config;
use crate::error::{credential_error, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Read/write access to the user's calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Token lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// The two ways of obtaining a fresh credential
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    /// Exchange the refresh token for a new access token
    async fn refresh(&self, credential: &Credential) -> BotResult<Credential>;

    /// Run the interactive consent flow
    async fn authorize(&self) -> BotResult<Credential>;
}

/// OAuth client registration from the downloaded `credentials.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read the client registration; accepts both `installed` and `web` apps
    pub fn from_file(path: &Path) -> BotResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            credential_error(&format!(
                "Failed to read client secret file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: ClientSecretFile = serde_json::from_str(&content).map_err(|e| {
            credential_error(&format!("Invalid client secret file {}: {}", path.display(), e))
        })?;

        file.installed.or(file.web).ok_or_else(|| {
            credential_error("Client secret file has neither an 'installed' nor a 'web' section")
        })
    }
}

/// Absolute expiry for a token issued now with lifetime `expires_in`.
///
/// Lifetimes that are negative or too large to represent fall back to
/// [`DEFAULT_EXPIRES_IN`].
pub fn expiry_from(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let default = Duration::seconds(DEFAULT_EXPIRES_IN);
    let lifetime = match expires_in {
        Some(secs) if secs >= 0 => Duration::try_seconds(secs).unwrap_or(default),
        Some(secs) => {
            warn!("Token endpoint returned negative expires_in {}", secs);
            default
        }
        None => default,
    };

    now.checked_add_signed(lifetime)
        .or_else(|| now.checked_add_signed(default))
        .unwrap_or(now)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

/// What the loopback server saw on one incoming request
#[derive(Debug, PartialEq)]
pub enum RedirectOutcome {
    Code(String),
    Denied(String),
    Ignored,
}

/// Inspect a request path received on the loopback redirect server
pub fn parse_redirect(request_url: &str, expected_state: &str) -> RedirectOutcome {
    let url = match Url::parse("http://127.0.0.1").and_then(|base| base.join(request_url)) {
        Ok(url) => url,
        Err(_) => return RedirectOutcome::Ignored,
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return RedirectOutcome::Denied(error);
    }

    match code {
        Some(_) if state.as_deref() != Some(expected_state) => {
            RedirectOutcome::Denied("state mismatch in authorization response".to_string())
        }
        Some(code) => RedirectOutcome::Code(code),
        None => RedirectOutcome::Ignored,
    }
}

/// Google's installed-app flow with a loopback redirect
#[derive(Clone)]
pub struct GoogleOAuth {
    client: Client,
    client_secret_path: PathBuf,
    auth_timeout: std::time::Duration,
}

impl GoogleOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            client_secret_path: config.client_secret_path.clone(),
            auth_timeout: std::time::Duration::from_secs(config.auth_timeout_secs),
        }
    }

    /// Build the consent page URL
    pub fn consent_url(secret: &ClientSecret, redirect_uri: &str, state: &str) -> BotResult<Url> {
        let mut url = Url::parse(&secret.auth_uri)
            .map_err(|e| credential_error(&format!("Invalid auth_uri: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &secret.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", CALENDAR_SCOPE)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Exchange an authorization code for a credential
    pub async fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        redirect_uri: &str,
    ) -> BotResult<Credential> {
        let params = [
            ("code", code),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let token = self.post_token(&secret.token_uri, &params).await?;

        let scopes = token
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| vec![CALENDAR_SCOPE.to_string()]);

        Ok(Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes,
            expiry: Some(expiry_from(Utc::now(), token.expires_in)),
        })
    }

    async fn post_token(&self, token_uri: &str, params: &[(&str, &str)]) -> BotResult<TokenResponse> {
        let response = self
            .client
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| credential_error(&format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(credential_error(&format!(
                "Token endpoint returned HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| credential_error(&format!("Failed to parse token response: {}", e)))
    }

    /// Block until the browser lands on the loopback server or the timeout passes
    fn wait_for_code(
        server: tiny_http::Server,
        state: String,
        timeout: std::time::Duration,
    ) -> BotResult<String> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(credential_error("Timed out waiting for authorization"));
            }

            let request = match server.recv_timeout(remaining) {
                Ok(Some(request)) => request,
                Ok(None) => return Err(credential_error("Timed out waiting for authorization")),
                Err(e) => {
                    return Err(credential_error(&format!(
                        "Redirect server failed: {}",
                        e
                    )))
                }
            };

            match parse_redirect(request.url(), &state) {
                RedirectOutcome::Code(code) => {
                    let response = tiny_http::Response::from_string(
                        "Authorization successful! You can close this window.",
                    );
                    if let Err(e) = request.respond(response) {
                        warn!("Failed to answer authorization redirect: {}", e);
                    }
                    return Ok(code);
                }
                RedirectOutcome::Denied(reason) => {
                    let response = tiny_http::Response::from_string(
                        "Authorization failed. You can close this window.",
                    )
                    .with_status_code(400);
                    if let Err(e) = request.respond(response) {
                        warn!("Failed to answer authorization redirect: {}", e);
                    }
                    return Err(credential_error(&format!("Authorization denied: {}", reason)));
                }
                RedirectOutcome::Ignored => {
                    debug!("Ignoring unrelated request on redirect server: {}", request.url());
                    if let Err(e) = request.respond(tiny_http::Response::empty(404)) {
                        warn!("Failed to answer unrelated request: {}", e);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl OAuthFlow for GoogleOAuth {
    async fn refresh(&self, credential: &Credential) -> BotResult<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| credential_error("No refresh token in token data"))?;

        let params = [
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token = self.post_token(&credential.token_uri, &params).await?;

        // Combine new access token with existing refresh token
        let mut refreshed = credential.clone();
        refreshed.access_token = token.access_token;
        if let Some(rotated) = token.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        refreshed.expiry = Some(expiry_from(Utc::now(), token.expires_in));

        info!("Refreshed access token");
        Ok(refreshed)
    }

    async fn authorize(&self) -> BotResult<Credential> {
        let secret = ClientSecret::from_file(&self.client_secret_path)?;

        let server = tiny_http::Server::http("127.0.0.1:0").map_err(|e| {
            credential_error(&format!("Failed to start local redirect server: {}", e))
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| credential_error("Redirect server has no TCP address"))?;
        let redirect_uri = format!("http://127.0.0.1:{}/", port);

        // Generate random state for security
        let state = uuid::Uuid::new_v4().to_string();
        let consent_url = Self::consent_url(&secret, &redirect_uri, &state)?;

        eprintln!(
            "Please visit this URL to authorize this application: {}",
            consent_url
        );
        if let Err(e) = webbrowser::open(consent_url.as_str()) {
            warn!("Could not open a browser: {}", e);
        }

        let timeout = self.auth_timeout;
        let code = tokio::task::spawn_blocking(move || Self::wait_for_code(server, state, timeout))
            .await
            .map_err(|e| credential_error(&format!("Authorization task failed: {}", e)))??;

        let credential = self.exchange_code(&secret, &code, &redirect_uri).await?;
        info!("Interactive authorization completed");
        Ok(credential)
    }
}
