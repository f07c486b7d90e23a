//! Google OAuth2 credential handling
//!
//! Client credentials live in `~/.gdoc2md/config.json` (written by
//! `gdoc2md configure`); granted tokens are cached in `~/.gdoc2md/token.json`
//! and refreshed when expired. First use runs the browser consent flow
//! against a loopback redirect.

use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

const CONFIG_DIR: &str = ".gdoc2md";
const CONFIG_FILE: &str = "config.json";
const TOKEN_FILE: &str = "token.json";

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DOCS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/documents.readonly";

const FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for credential handling
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials found, run 'gdoc2md configure' first")]
    MissingConfig,

    #[error("invalid config file: {0}")]
    InvalidConfig(String),

    #[error("config missing client_id or client_secret")]
    IncompleteConfig,

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("authorization failed: {0}")]
    Flow(String),

    #[error("token endpoint returned HTTP {0}")]
    TokenStatus(reqwest::StatusCode),

    #[error("timed out waiting for authorization (5 minutes)")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User-supplied OAuth2 client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Cached grant, persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Expired (with a one-minute safety margin). Tokens without an expiry
    /// are treated as still valid.
    fn is_expired(&self) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - chrono::Duration::seconds(60) <= Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        let expiry = self
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry,
        }
    }
}

fn config_dir() -> Result<PathBuf, AuthError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .ok_or(AuthError::NoHomeDir)
}

/// Read client credentials from the config directory.
pub fn load_app_config() -> Result<AppConfig, AuthError> {
    let path = config_dir()?.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).map_err(|_| AuthError::MissingConfig)?;
    let config: AppConfig =
        serde_json::from_str(&data).map_err(|e| AuthError::InvalidConfig(e.to_string()))?;
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(AuthError::IncompleteConfig);
    }
    Ok(config)
}

/// Write client credentials to the config directory.
pub fn save_app_config(config: &AppConfig) -> Result<(), AuthError> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(CONFIG_FILE);
    write_private(&path, &serde_json::to_vec_pretty(config)?)?;
    Ok(())
}

fn load_token() -> Result<StoredToken, AuthError> {
    let path = config_dir()?.join(TOKEN_FILE);
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn save_token(token: &StoredToken) -> Result<(), AuthError> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    write_private(&dir.join(TOKEN_FILE), &serde_json::to_vec_pretty(token)?)
}

/// Write a file readable only by the current user.
fn write_private(path: &std::path::Path, data: &[u8]) -> Result<(), AuthError> {
    std::fs::write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Interactive `configure` subcommand: prompt for and store credentials.
pub fn configure() -> Result<(), AuthError> {
    let client_id = prompt("Enter your Google OAuth2 Client ID: ")?;
    let client_secret = prompt("Enter your OAuth2 Client Secret: ")?;

    if client_id.is_empty() || client_secret.is_empty() {
        return Err(AuthError::IncompleteConfig);
    }

    save_app_config(&AppConfig {
        client_id,
        client_secret,
    })?;
    println!(
        "Credentials saved to {}",
        config_dir()?.join(CONFIG_FILE).display()
    );
    Ok(())
}

fn prompt(message: &str) -> Result<String, AuthError> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Build an HTTP client whose requests carry a valid bearer token.
///
/// Loads the cached token when present, refreshing it if expired; runs the
/// browser consent flow on first use. The refreshed or newly granted token
/// is persisted before returning.
pub async fn get_authenticated_client() -> Result<reqwest::Client, AuthError> {
    let config = load_app_config()?;

    let token = match load_token() {
        Ok(token) if !token.is_expired() => token,
        Ok(token) => match token.refresh_token.clone() {
            Some(refresh) => refresh_access_token(&config, &refresh).await?,
            None => run_browser_flow(&config).await?,
        },
        Err(_) => run_browser_flow(&config).await?,
    };
    save_token(&token)?;

    let mut bearer =
        reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|_| AuthError::Flow("access token is not a valid header value".into()))?;
    bearer.set_sensitive(true);
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(reqwest::header::AUTHORIZATION, bearer);

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

async fn refresh_access_token(
    config: &AppConfig,
    refresh_token: &str,
) -> Result<StoredToken, AuthError> {
    tracing::debug!("refreshing expired access token");
    let response = reqwest::Client::new()
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::TokenStatus(status));
    }
    let granted: TokenResponse = response.json().await?;
    Ok(granted.into_stored(Some(refresh_token.to_string())))
}

/// Run the loopback-redirect consent flow: start a local listener, send the
/// user's browser to the consent page, and exchange the returned code.
async fn run_browser_flow(config: &AppConfig) -> Result<StoredToken, AuthError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{port}/callback");
    let state = Uuid::new_v4().simple().to_string();

    let mut auth_url = reqwest::Url::parse(AUTH_ENDPOINT)
        .map_err(|e| AuthError::Flow(format!("bad auth endpoint: {e}")))?;
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", DOCS_READONLY_SCOPE)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("state", &state);

    println!("Opening browser for authorization...");
    println!("If the browser does not open, visit:\n  {auth_url}\n");
    open_browser(auth_url.as_str());

    let code = tokio::time::timeout(FLOW_TIMEOUT, wait_for_callback(&listener, &state))
        .await
        .map_err(|_| AuthError::Timeout)??;

    let response = reqwest::Client::new()
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::TokenStatus(status));
    }
    let granted: TokenResponse = response.json().await?;
    Ok(granted.into_stored(None))
}

/// Accept connections until the OAuth callback arrives, then return the
/// authorization code.
async fn wait_for_callback(listener: &TcpListener, state: &str) -> Result<String, AuthError> {
    loop {
        let (mut stream, _) = listener.accept().await?;

        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);

        // Request line: "GET /callback?... HTTP/1.1"
        let Some(path) = request.split_whitespace().nth(1) else {
            continue;
        };
        if !path.starts_with("/callback") {
            respond(&mut stream, "404 Not Found", "not found").await;
            continue;
        }

        let url = match reqwest::Url::parse(&format!("http://127.0.0.1{path}")) {
            Ok(url) => url,
            Err(_) => {
                respond(&mut stream, "400 Bad Request", "bad request").await;
                continue;
            }
        };
        let query: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        if query.get("state").map(String::as_str) != Some(state) {
            respond(&mut stream, "400 Bad Request", "invalid state").await;
            return Err(AuthError::Flow("state mismatch".into()));
        }

        match query.get("code") {
            Some(code) if !code.is_empty() => {
                respond(
                    &mut stream,
                    "200 OK",
                    "<html><body><h2>Authorization successful!</h2>\
                     <p>You can close this tab and return to the terminal.</p></body></html>",
                )
                .await;
                return Ok(code.clone());
            }
            _ => {
                let reason = query.get("error").cloned().unwrap_or_default();
                respond(&mut stream, "400 Bad Request", "authorization failed").await;
                return Err(AuthError::Flow(format!("no auth code received: {reason}")));
            }
        }
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await.ok();
    stream.shutdown().await.ok();
}

fn open_browser(url: &str) {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/c", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };
    if let Err(e) = result {
        tracing::debug!("could not open browser: {e}");
    }
}
