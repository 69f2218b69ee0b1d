//! OAuth callback server for the browser redirect.
//!
//! The provider sends the browser back to `http://localhost:<port>/callback`
//! with either `?code=` (PKCE authorization code) or `?error=`.

use crate::{ProviderError, ProviderResult};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};
use url::Url;

/// What the redirect carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    /// Authorization code (if consent was granted).
    pub code: Option<String>,
    /// Error message (if it failed).
    pub error: Option<String>,
}

impl OAuthCallback {
    /// Create a result carrying an authorization code.
    pub fn authorized(code: String) -> Self {
        Self {
            code: Some(code),
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failure(error: String) -> Self {
        Self {
            code: None,
            error: Some(error),
        }
    }

    /// Turn the callback into the code or an OAuth error.
    pub fn into_code(self) -> ProviderResult<String> {
        match (self.code, self.error) {
            (Some(code), None) => Ok(code),
            (_, Some(error)) => Err(ProviderError::OAuth(error)),
            (None, None) => Err(ProviderError::OAuth(
                "Missing required parameters".to_string(),
            )),
        }
    }
}

/// Parse the request target of a callback request.
fn parse_callback(path: &str) -> OAuthCallback {
    let url = match Url::parse(&format!("http://localhost{}", path)) {
        Ok(url) => url,
        Err(_) => return OAuthCallback::failure("Malformed callback".to_string()),
    };

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(err) = error {
        return OAuthCallback::failure(description.unwrap_or(err));
    }
    match code {
        Some(code) if !code.is_empty() => OAuthCallback::authorized(code),
        _ => OAuthCallback::failure("Missing required parameters".to_string()),
    }
}

/// OAuth callback server that listens for the authentication redirect.
pub struct OAuthCallbackServer {
    port: u16,
    timeout_secs: u64,
}

impl OAuthCallbackServer {
    /// Create a new OAuth callback server. Port 0 picks a free port.
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self { port, timeout_secs }
    }

    /// Bind the listener without waiting yet.
    ///
    /// Binding before the browser is opened guarantees the redirect cannot
    /// arrive ahead of the listener.
    pub async fn bind(&self) -> ProviderResult<CallbackListener> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ProviderError::OAuth(format!("Failed to bind to {}: {}", addr, e)))?;

        let port = listener
            .local_addr()
            .map_err(|e| ProviderError::OAuth(format!("Failed to read bound address: {}", e)))?
            .port();

        info!(port, "OAuth callback server listening");

        Ok(CallbackListener {
            listener,
            port,
            timeout_secs: self.timeout_secs,
        })
    }
}

/// A bound callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
    timeout_secs: u64,
}

impl CallbackListener {
    /// Port actually bound.
    pub fn local_port(&self) -> u16 {
        self.port
    }

    /// Redirect target for the provider, on the port actually bound.
    pub fn callback_url(&self) -> String {
        format!("http://localhost:{}/callback", self.local_port())
    }

    /// Wait for the callback request, then shut down.
    ///
    /// A timeout is reported as a failed callback, not as an error.
    pub async fn wait(self) -> ProviderResult<OAuthCallback> {
        let listener = self.listener;
        let (tx, rx) = oneshot::channel::<OAuthCallback>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));

        let server_handle = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((mut socket, _)) => {
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(&mut socket, tx).await {
                                    error!("Error handling connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);
        let result = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => OAuthCallback::failure("Internal error: channel closed".to_string()),
            Err(_) => OAuthCallback::failure("OAuth timeout".to_string()),
        };

        server_handle.abort();

        Ok(result)
    }
}

/// Handle an incoming HTTP connection.
async fn handle_connection(
    socket: &mut tokio::net::TcpStream,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<OAuthCallback>>>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Request line only; the query may hold the authorization code.
    debug!(bytes = request_line.len(), "Received callback request");

    let Some(rest) = request_line.strip_prefix("GET ") else {
        send_response(&mut writer, 405, "Method Not Allowed", "Method Not Allowed").await?;
        return Ok(());
    };

    let path = rest.split_whitespace().next().unwrap_or("");
    if !path.starts_with("/callback") {
        send_response(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    }

    let result = parse_callback(path);
    match &result.error {
        Some(err) => send_response(&mut writer, 200, "OK", &error_page(err)).await?,
        None => send_response(&mut writer, 200, "OK", &success_page()).await?,
    }

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(result);
    }

    Ok(())
}

/// Send an HTTP response.
async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Auth Portal - Signed in</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Signed in with Google</h1>
<p>You can close this window and return to the terminal.</p>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
        .to_string()
}

fn error_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Auth Portal - Sign-in failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Google sign-in failed</h1>
<p>{}</p>
<p>You can close this window and try again.</p>
</body>
</html>"#,
        escape_html(error)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
