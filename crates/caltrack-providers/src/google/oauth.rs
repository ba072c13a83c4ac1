//! OAuth 2.0 authorization-code flow with PKCE and a loopback redirect.
//!
//! The user approves access in the browser; Google redirects to a listener
//! on `127.0.0.1`, which hands the code back for the token exchange.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes; 43 characters once encoded.
const CODE_VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// How long the user has to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const PAGE_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n\
    <html><body><h1>caltrack is authorized</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";
const PAGE_FAILED: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\n\r\n\
    <html><body><h1>Authorization failed</h1>\
    <p>Check the terminal for details.</p></body></html>";

/// Token endpoint client.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to build HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the browser consent flow and returns fresh tokens.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow on port {}", port);
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser to authorize caltrack:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener)?;
        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, refusing the authorization code",
            ));
        }

        info!("received authorization code");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let response = self.post_token(&params, "token exchange").await?;

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Trades a refresh token for a new access token and its lifetime.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    async fn post_token(&self, params: &[(&str, &str)], what: &str) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed", what)).with_source(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read {} response", what)).with_source(e))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {} response: {}", what, e))
        })
    }
}

fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    (port_range.0..=port_range.1)
        .find_map(|port| {
            TcpListener::bind(("127.0.0.1", port))
                .ok()
                .map(|listener| (listener, port))
        })
        .ok_or_else(|| {
            ProviderError::configuration(format!(
                "no free port in {}-{} for the OAuth redirect",
                port_range.0, port_range.1
            ))
        })
}

/// Accepts connections on a helper thread until one carries the callback,
/// giving up after [`CALLBACK_TIMEOUT`].
fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_connection(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => warn!("failed to accept OAuth callback connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authentication(
            "timed out waiting for the OAuth callback",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("OAuth callback listener stopped"))
        }
    }
}

/// Reads one request. Returns `None` for requests that are not the callback
/// (favicon fetches and the like).
fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let query = target.strip_prefix("/callback")?;

    let result = parse_callback_query(query.trim_start_matches('?'));
    let page = if result.is_ok() { PAGE_OK } else { PAGE_FAILED };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Code and state from the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

fn parse_callback_query(query: &str) -> ProviderResult<Callback> {
    let mut code = None;
    let mut state = String::new();
    let mut error = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = value,
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        )));
    }
    code.map(|code| Callback { code, state })
        .ok_or_else(|| ProviderError::authentication("OAuth callback carried no code"))
}

/// PKCE verifier, challenge and CSRF state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_BYTES);
        Self {
            challenge: Self::challenge_for(&verifier),
            verifier,
            state: random_token(STATE_BYTES),
        }
    }

    fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Consent URL asking for offline access, so a refresh token is issued.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pkce {
        use super::*;

        #[test]
        fn verifier_is_43_chars() {
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc_example() {
            // RFC 7636, appendix B.
            assert_eq!(
                PkceFlow::challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn flows_are_random() {
            let a = PkceFlow::new();
            let b = PkceFlow::new();
            assert_ne!(a.verifier, b.verifier);
            assert_ne!(a.state, b.state);
        }

        #[test]
        fn auth_url() {
            let flow = PkceFlow::new();
            let url = flow.build_auth_url(
                "id.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &["https://www.googleapis.com/auth/calendar.readonly".to_string()],
            );
            assert!(url.starts_with(GOOGLE_AUTH_URL));
            assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
            assert!(url.contains("code_challenge_method=S256"));
            assert!(url.contains("access_type=offline"));
            assert!(url.contains(&format!("state={}", urlencoding::encode(&flow.state))));
        }
    }

    mod callback {
        use super::*;

        #[test]
        fn code_and_state() {
            let cb = parse_callback_query("state=abc&code=4%2F0Ab&scope=x").unwrap();
            assert_eq!(cb.code, "4/0Ab");
            assert_eq!(cb.state, "abc");
        }

        #[test]
        fn denied() {
            let err = parse_callback_query("error=access_denied&state=abc").unwrap_err();
            assert!(err.message().contains("access_denied"));
        }

        #[test]
        fn no_code() {
            assert!(parse_callback_query("state=abc").is_err());
            assert!(parse_callback_query("").is_err());
        }
    }

    #[test]
    fn bind_picks_a_port_in_range() {
        let (listener, port) = bind_loopback((0, 0)).unwrap();
        assert_eq!(port, 0);
        drop(listener);
    }
}
