//! Request/response exchange with the SSO broker
//!
//! A [`TicketFetcher`] performs exactly one GET and decodes the JSON body. It
//! never retries; retry policy belongs to the caller.

use crate::error::SsoError;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;

/// Single request/response exchange against the broker
#[async_trait]
pub trait TicketFetcher: Send + Sync {
    /// Fetch and decode `url`
    ///
    /// Returns `Ok(None)` when the broker answers with a non-success status.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the body is not JSON.
    async fn fetch(&self, url: &str) -> Result<Option<Value>, SsoError>;
}

/// Session registration endpoint for `client_id`
#[must_use]
pub fn registration_url(base_url: &str, client_id: &str) -> String {
    format!(
        "{base_url}/api/3rdService/register/session/{}",
        urlencoding::encode(client_id)
    )
}

/// Status endpoint for `session_id`
#[must_use]
pub fn status_url(base_url: &str, session_id: &str) -> String {
    format!(
        "{base_url}/api/3rdService/register/status/{}",
        urlencoding::encode(session_id)
    )
}

/// [`TicketFetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct HttpTicketFetcher {
    http_client: reqwest::Client,
}

impl HttpTicketFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing client (connection pool, proxy settings, timeouts)
    #[must_use]
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl TicketFetcher for HttpTicketFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Value>, SsoError> {
        debug!("Fetching {url}");

        let response = self
            .http_client
            .get(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("Request to {url} failed with status: {}", response.status());
            return Ok(None);
        }

        let body: Value = response.json().await?;
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response on loopback
    ///
    /// Returns the base URL and a receiver for the raw request head.
    async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = request_tx.send(String::from_utf8_lossy(&head).into_owned());
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        (base_url, request_rx)
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn local_fetcher() -> HttpTicketFetcher {
        HttpTicketFetcher::with_client(reqwest::Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_registration_url() {
        assert_eq!(
            registration_url("https://sandbox-api.blockpass.org", "svc1"),
            "https://sandbox-api.blockpass.org/api/3rdService/register/session/svc1"
        );
    }

    #[test]
    fn test_status_url() {
        assert_eq!(
            status_url("http://localhost:1337", "abc-123"),
            "http://localhost:1337/api/3rdService/register/status/abc-123"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        assert_eq!(
            status_url("http://localhost", "a b/c"),
            "http://localhost/api/3rdService/register/status/a%20b%2Fc"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        // Port 9 (discard) on loopback refuses connections on test machines
        let result = local_fetcher()
            .fetch(&status_url("http://127.0.0.1:9", "abc-123"))
            .await;
        assert!(matches!(result, Err(SsoError::Http(_))));
    }

    #[tokio::test]
    async fn test_json_body_is_returned() {
        let (base_url, request_rx) =
            serve_once(http_response("200 OK", r#"{"data":{"status":"processing"}}"#)).await;

        let body = local_fetcher()
            .fetch(&status_url(&base_url, "abc-123"))
            .await
            .unwrap();
        assert_eq!(body, Some(serde_json::json!({ "data": { "status": "processing" } })));

        let request = request_rx.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /api/3rdservice/register/status/abc-123 http/1.1\r\n"));
        assert!(request.contains("content-type: application/json\r\n"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_no_data() {
        let (base_url, _request_rx) =
            serve_once(http_response("404 Not Found", r#"{"error":"unknown session"}"#)).await;

        let body = local_fetcher()
            .fetch(&status_url(&base_url, "abc-123"))
            .await
            .unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_error() {
        let (base_url, _request_rx) = serve_once(http_response("200 OK", "not json!")).await;

        let result = local_fetcher()
            .fetch(&registration_url(&base_url, "svc1"))
            .await;
        assert!(matches!(result, Err(SsoError::Http(_))));
    }
}
