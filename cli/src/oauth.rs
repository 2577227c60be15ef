//! One-time Twitch authorization
//!
//! Implicit-flow bootstrap: open the authorize page in a browser, catch the
//! redirect on a localhost listener, then look up the account id and login
//! on the users endpoint. The token only ever lives in process memory, so
//! the browser popup happens once per run of `chatfx run`.
//!
//! The redirect lands with the token in the URL fragment, which never
//! reaches the server. The first response therefore serves a page whose
//! script bounces the fragment back as a query string; the second request
//! is the one that carries the token.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

const REDIRECT_ADDR: &str = "127.0.0.1:3000";
const REDIRECT_URI: &str = "http://localhost:3000/";
const AUTHORIZE_URL: &str = "https://id.twitch.tv/oauth2/authorize";
const USERS_URL: &str = "https://api.twitch.tv/helix/users";

/// Everything the chat and pub/sub sessions need
const SCOPES: &str = "bits:read channel:read:hype_train channel:read:redemptions channel:read:subscriptions chat:read chat:edit";

const LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

const RELAY_PAGE: &str = "<!DOCTYPE html>\
<html>\
<head><title>chatfx login</title></head>\
<body>Please wait while the response is processed.\
<script>const o=window.location.hash;window.location.href='http://localhost:3000/?'+o.substring(1);</script>\
</body>\
</html>";

const DONE_PAGE: &str = "<!DOCTYPE html><html><head><title>chatfx login</title></head>\
<body><b>DONE!</b><br>(Please close this tab/window)</body></html>";

const DENIED_PAGE: &str = "<!DOCTYPE html><html><head><title>chatfx login</title></head>\
<body><b>Access denied.</b><br>(You can close this tab/window)</body></html>";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client_id is empty; set it in the config file before logging in")]
    MissingClientId,

    #[error("could not listen on {address}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("redirect handling failed")]
    Redirect {
        #[source]
        source: std::io::Error,
    },

    #[error("authorization timed out after three minutes")]
    TimedOut,

    #[error("authorization was denied")]
    AccessDenied,

    #[error("users lookup failed")]
    UsersRequest {
        #[source]
        source: reqwest::Error,
    },

    #[error("users lookup returned no entries")]
    NoUser,
}

/// The authorized session identity. Never written to disk.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: String,
    pub login: String,
}

/// Run the full browser round trip and return the session credentials.
pub async fn login(client_id: &str) -> Result<Credentials, AuthError> {
    if client_id.trim().is_empty() {
        return Err(AuthError::MissingClientId);
    }

    let state = rand::thread_rng().gen_range(0..100_000).to_string();
    let authorize_url = authorize_url(client_id, &state);

    let listener =
        TcpListener::bind(REDIRECT_ADDR)
            .await
            .map_err(|source| AuthError::Listen {
                address: REDIRECT_ADDR.to_string(),
                source,
            })?;

    info!(uri = REDIRECT_URI, "waiting for the authorization redirect");
    if let Err(error) = open::that(&authorize_url) {
        warn!(%error, "could not open a browser");
        println!("Open this URL to authorize: {authorize_url}");
    }

    let access_token = timeout(LOGIN_TIMEOUT, wait_for_token(&listener, &state))
        .await
        .map_err(|_| AuthError::TimedOut)??;

    fetch_user(client_id, access_token).await
}

fn authorize_url(client_id: &str, state: &str) -> String {
    let scope = SCOPES.replace(':', "%3A").replace(' ', "%20");
    format!(
        "{AUTHORIZE_URL}?response_type=token&client_id={client_id}\
         &redirect_uri={REDIRECT_URI}&scope={scope}&state={state}"
    )
}

/// Serve redirect requests until one carries a token with the right state.
async fn wait_for_token(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|source| AuthError::Redirect { source })?;

        match answer_request(&mut stream, expected_state).await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {}
            // Browsers open speculative connections and abandon them
            Err(AuthError::Redirect { source }) => {
                debug!(error = %source, "redirect request failed")
            }
            Err(other) => return Err(other),
        }
    }
}

async fn answer_request(
    stream: &mut TcpStream,
    expected_state: &str,
) -> Result<Option<String>, AuthError> {
    let target = read_request_target(stream)
        .await
        .map_err(|source| AuthError::Redirect { source })?;

    if target.starts_with("/favicon") {
        respond(stream, "404 Not Found", "")
            .await
            .map_err(|source| AuthError::Redirect { source })?;
        return Ok(None);
    }

    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");

    if let Some(token) = query_value(query, "access_token") {
        let token = token.to_string();
        match query_value(query, "state") {
            Some(state) if state == expected_state => {
                respond(stream, "200 OK", DONE_PAGE)
                    .await
                    .map_err(|source| AuthError::Redirect { source })?;
                Ok(Some(token))
            }
            state => {
                warn!(?state, "authorization redirect carried the wrong state");
                respond(stream, "400 Bad Request", "")
                    .await
                    .map_err(|source| AuthError::Redirect { source })?;
                Ok(None)
            }
        }
    } else if query_value(query, "error") == Some("access_denied") {
        respond(stream, "200 OK", DENIED_PAGE)
            .await
            .map_err(|source| AuthError::Redirect { source })?;
        Err(AuthError::AccessDenied)
    } else {
        // First visit: the token rides in the fragment, bounce it back
        respond(stream, "200 OK", RELAY_PAGE)
            .await
            .map_err(|source| AuthError::Redirect { source })?;
        Ok(None)
    }
}

async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(&mut *stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(line.split_whitespace().nth(1).unwrap_or("/").to_string())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await
}

fn query_value<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, value) = pair.split_once('=')?;
        (k == key).then_some(value)
    })
}

async fn fetch_user(client_id: &str, access_token: String) -> Result<Credentials, AuthError> {
    let response = reqwest::Client::new()
        .get(USERS_URL)
        .header("Authorization", format!("Bearer {access_token}"))
        .header("Client-Id", client_id)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|source| AuthError::UsersRequest { source })?;

    let users: UsersResponse = response
        .json()
        .await
        .map_err(|source| AuthError::UsersRequest { source })?;
    let user = users.data.into_iter().next().ok_or(AuthError::NoUser)?;

    info!(login = %user.login, id = %user.id, "authorized");
    Ok(Credentials {
        access_token,
        user_id: user.id,
        login: user.login,
    })
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_query_values_parse_by_key() {
        let query = "access_token=tok123&scope=chat%3Aread&state=42&token_type=bearer";
        assert_eq!(query_value(query, "access_token"), Some("tok123"));
        assert_eq!(query_value(query, "state"), Some("42"));
        assert_eq!(query_value(query, "missing"), None);
    }

    #[test]
    fn test_authorize_url_carries_scopes_and_state() {
        let url = authorize_url("abc123", "777");
        assert!(url.starts_with("https://id.twitch.tv/oauth2/authorize?response_type=token"));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("redirect_uri=http://localhost:3000/"));
        assert!(url.contains("state=777"));
        // Scopes arrive percent-encoded
        assert!(url.contains("chat%3Aread%20chat%3Aedit"));
    }

    async fn get(addr: std::net::SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut page = String::new();
        stream.read_to_string(&mut page).await.unwrap();
        page
    }

    #[tokio::test]
    async fn test_redirect_flow_extracts_the_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            // First visit has the token hidden in the fragment
            let page = get(addr, "/").await;
            assert!(page.contains("window.location.hash"));

            // The relay script turns it into a query string
            let page = get(
                addr,
                "/?access_token=tok123&scope=chat%3Aread&state=42&token_type=bearer",
            )
            .await;
            assert!(page.contains("DONE!"));
        });

        let token = wait_for_token(&listener, "42").await.unwrap();
        assert_eq!(token, "tok123");
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_state_keeps_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            let page = get(addr, "/?access_token=forged&state=999").await;
            assert!(page.starts_with("HTTP/1.1 400"));

            let page = get(addr, "/?access_token=real&state=42").await;
            assert!(page.contains("DONE!"));
        });

        let token = wait_for_token(&listener, "42").await.unwrap();
        assert_eq!(token, "real");
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn test_denied_authorization_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            let page = get(addr, "/?error=access_denied&error_description=denied&state=42").await;
            assert!(page.contains("Access denied"));
        });

        let result = wait_for_token(&listener, "42").await;
        assert!(matches!(result, Err(AuthError::AccessDenied)));
        browser.await.unwrap();
    }
}
