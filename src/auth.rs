// OAuth 2.0 for an installed application: cached tokens on disk, refresh
// when they expire, and a loopback consent flow the first time.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tiny_http::{Header, Response, Server, StatusCode};

/// Read/write access to spreadsheets. Changing this invalidates cached
/// tokens, which are then re-requested through the consent flow.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

const SUCCESS_PAGE: &str = "The authentication flow has completed. You may close this window.";

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.into()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

/// OAuth client identity from the console-issued `credentials.json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// The file wraps the secrets in an `installed` or `web` object.
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretsFile =
            serde_json::from_str(json).context("Parsing client secrets json")?;
        match file.installed.or(file.web) {
            Some(secrets) => Ok(secrets),
            None => bail!("Client secrets must contain an \"installed\" or \"web\" section"),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets {}", path.display()))?;
        Self::from_json(&data)
    }
}

/// Contents of the token cache file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

/// Token endpoint response for both code exchange and refresh.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file {}", path.display()))?;
        serde_json::from_str(&data).context("Parsing token file json")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write token file {}", path.display()))?;
        Ok(())
    }

    /// Build the cache entry from a token endpoint response. Google omits
    /// the refresh token on refresh, so the previous one is carried over.
    pub fn from_response(
        resp: TokenResponse,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = match resp.scope {
            Some(s) => s.split_whitespace().map(str::to_string).collect(),
            None => SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        StoredToken {
            token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh),
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes,
            expiry: resp.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub fn has_scopes(&self, wanted: &[&str]) -> bool {
        self.scopes.is_empty() || wanted.iter().all(|w| self.scopes.iter().any(|s| s == w))
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && !self.is_expired(now) && self.has_scopes(SCOPES)
    }
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        Self::from_verifier(random_token())
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Pkce {
            verifier,
            challenge,
        }
    }
}

/// 32 random bytes, URL-safe base64 without padding (43 chars).
fn random_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> Result<Url> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .context("Invalid auth_uri in client secrets")
}

/// What the browser sent to the loopback listener.
#[derive(Debug, PartialEq, Eq)]
pub enum Redirect {
    Code(String),
    /// A request that is not the OAuth redirect (e.g. `/favicon.ico`).
    Ignored,
}

/// Extract the authorization code from the request target of the
/// redirect, checking `state` and surfacing a denied consent.
pub fn parse_redirect(target: &str, expected_state: &str) -> Result<Redirect> {
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .context("Malformed redirect request")?;
    let mut code = None;
    let mut state = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => bail!("Authorization was denied: {}", v),
            _ => {}
        }
    }
    let Some(code) = code else {
        return Ok(Redirect::Ignored);
    };
    if state.as_deref() != Some(expected_state) {
        bail!("Authorization response state does not match the request");
    }
    Ok(Redirect::Code(code))
}

fn html(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_string(body);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Loopback listener on an ephemeral port of 127.0.0.1.
pub fn loopback_server() -> Result<(Server, u16)> {
    let server = Server::http("127.0.0.1:0")
        .map_err(|e| anyhow::anyhow!("Failed to start loopback listener: {}", e))?;
    let port = match server.server_addr().to_ip() {
        Some(addr) => addr.port(),
        None => bail!("Loopback listener has no IP address"),
    };
    Ok((server, port))
}

/// Serve requests on the loopback listener until the OAuth redirect
/// arrives, and return its code.
pub fn wait_for_code(server: &Server, expected_state: &str) -> Result<String> {
    loop {
        let req = server.recv().context("Failed to receive redirect")?;
        let target = req.url().to_string();
        match parse_redirect(&target, expected_state) {
            Ok(Redirect::Code(code)) => {
                if let Err(e) = req.respond(html(SUCCESS_PAGE)) {
                    log::debug!("could not answer redirect: {}", e);
                }
                return Ok(code);
            }
            Ok(Redirect::Ignored) => {
                log::debug!("ignoring loopback request for {}", target);
                let _ = req.respond(Response::empty(StatusCode(404)));
            }
            Err(e) => {
                let _ = req.respond(html(&e.to_string()).with_status_code(StatusCode(400)));
                return Err(e);
            }
        }
    }
}

/// Hands out a valid access token, refreshing or asking for consent when
/// the cached one cannot be used.
pub struct Authenticator {
    client: Client,
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl Authenticator {
    pub fn new(client: Client, credentials_path: PathBuf, token_path: PathBuf) -> Self {
        Authenticator {
            client,
            credentials_path,
            token_path,
        }
    }

    fn load_cached(&self) -> Option<StoredToken> {
        if !self.token_path.exists() {
            return None;
        }
        match StoredToken::load(&self.token_path) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("ignoring unusable token cache: {:#}", e);
                None
            }
        }
    }

    pub fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        let fresh = match self.load_cached() {
            Some(cached) if cached.is_valid(now) => {
                log::debug!("using cached access token");
                return Ok(cached.token);
            }
            Some(cached) if cached.refresh_token.is_some() && cached.has_scopes(SCOPES) => {
                log::info!("access token expired, refreshing");
                match self.refresh(&cached) {
                    Ok(token) => token,
                    Err(e) => {
                        log::warn!("token refresh failed: {:#}", e);
                        self.consent()?
                    }
                }
            }
            _ => self.consent()?,
        };
        fresh.save(&self.token_path)?;
        Ok(fresh.token)
    }

    fn post_token(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let res = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .context("Failed to send token request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("Token request failed: {} - {}", status, txt);
        }
        res.json().context("Parsing token response json")
    }

    pub fn refresh(&self, cached: &StoredToken) -> Result<StoredToken> {
        let refresh_token = match &cached.refresh_token {
            Some(t) => t.as_str(),
            None => bail!("No refresh token cached"),
        };
        let resp = self.post_token(
            &cached.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", cached.client_id.as_str()),
                ("client_secret", cached.client_secret.as_str()),
            ],
        )?;
        Ok(StoredToken::from_response(
            resp,
            &cached.client_id,
            &cached.client_secret,
            &cached.token_uri,
            cached.refresh_token.clone(),
            Utc::now(),
        ))
    }

    /// Interactive first-run flow: the user approves access in a browser
    /// and Google redirects back to a listener on localhost.
    pub fn consent(&self) -> Result<StoredToken> {
        let secrets = ClientSecrets::load(&self.credentials_path)?;
        let (server, port) = loopback_server()?;
        let redirect_uri = format!("http://127.0.0.1:{}/", port);
        let pkce = Pkce::generate();
        let state = random_token();
        let url = authorization_url(&secrets, &redirect_uri, &pkce.challenge, &state)?;

        println!("Please visit this URL to authorize this application:\n{}", url);
        let code = wait_for_code(&server, &state)?;

        let resp = self.post_token(
            &secrets.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("code_verifier", pkce.verifier.as_str()),
            ],
        )?;
        log::info!("authorization granted");
        Ok(StoredToken::from_response(
            resp,
            &secrets.client_id,
            &secrets.client_secret,
            &secrets.token_uri,
            None,
            Utc::now(),
        ))
    }
}
