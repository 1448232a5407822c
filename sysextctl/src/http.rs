//! HTTP client abstraction for testability.
//!
//! Everything that touches the network goes through [`HttpClient`], a single
//! `send` operation. Production code uses [`ReqwestClient`]; tests plug in an
//! in-memory implementation and never open a socket.

use std::io::{self, Read};
use std::time::Duration;

use crate::config::SysextConfig;
use crate::context::OpContext;
use crate::error::{SysextError, SysextResult};

/// Maximum number of body bytes kept for error diagnostics.
pub const ERROR_BODY_LIMIT: u64 = 4096;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub user_agent: String,
}

impl HttpRequest {
    /// Build a GET request using the configured user agent.
    pub fn get(url: impl Into<String>, config: &SysextConfig) -> Self {
        Self {
            url: url.into(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// HTTP method, always GET.
    pub fn method(&self) -> &'static str {
        "GET"
    }
}

/// A response with a streaming body.
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Response backed by an in-memory body.
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            content_length: Some(body.len() as u64),
            body: Box::new(io::Cursor::new(body)),
        }
    }

    /// Whether the status is exactly 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Read the whole body of a response to `url`, checking `ctx` between
    /// chunks.
    pub fn read_all(mut self, url: &str, ctx: &OpContext) -> SysextResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            ctx.check()?;
            match self.body.read(&mut chunk) {
                Ok(0) => return Ok(buf),
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(SysextError::FetchFailed {
                        url: url.to_string(),
                        status: Some(self.status),
                        body: format!("failed to read response: {}", e),
                    })
                }
            }
        }
    }

    /// Read at most `limit` bytes of the body as lossy UTF-8.
    ///
    /// The result never exceeds `limit` bytes. A character cut by the limit
    /// is dropped.
    pub fn excerpt(self, limit: u64) -> String {
        let mut buf = Vec::new();
        // Diagnostics only; a failed read just yields what we have.
        let _ = self.body.take(limit).read_to_end(&mut buf);
        if let Err(e) = std::str::from_utf8(&buf) {
            if e.error_len().is_none() {
                buf.truncate(e.valid_up_to());
            }
        }

        let mut text = String::from_utf8_lossy(&buf).into_owned();
        let mut end = text.len().min(limit as usize);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.trim().to_string()
    }
}

/// Trait for HTTP client operations.
pub trait HttpClient: Send + Sync {
    /// Perform the request. Non-2xx statuses are returned as responses, not
    /// errors; only transport failures are `Err`.
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse> {
        (**self).send(request)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse> {
        (**self).send(request)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Create a client with the timeout from the configuration.
    pub fn new(config: &SysextConfig) -> SysextResult<Self> {
        Self::with_timeout(config.timeout)
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> SysextResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SysextError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse> {
        let response = self
            .client
            .get(&request.url)
            .header(reqwest::header::USER_AGENT, &request.user_agent)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SysextError::Http(format!(
                        "request to {} timed out after {}s",
                        request.url,
                        self.timeout.as_secs()
                    ))
                } else {
                    SysextError::Http(format!("request to {} failed: {}", request.url, e))
                }
            })?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

/// Decorator that logs every request at debug level.
#[derive(Debug, Clone)]
pub struct LoggingHttpClient<C> {
    inner: C,
}

impl<C: HttpClient> LoggingHttpClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: HttpClient> HttpClient for LoggingHttpClient<C> {
    fn send(&self, request: &HttpRequest) -> SysextResult<HttpResponse> {
        tracing::debug!(method = request.method(), url = %request.url, "HTTP request");
        let response = self.inner.send(request);
        match &response {
            Ok(r) => tracing::debug!(url = %request.url, status = r.status, "HTTP response"),
            Err(e) => tracing::debug!(url = %request.url, error = %e, "HTTP transport error"),
        }
        response
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockHttpClient;
    use super::*;

    #[test]
    fn test_request_uses_configured_agent() {
        let config = SysextConfig::default().with_user_agent("tester/1.0");
        let request = HttpRequest::get("https://example.com", &config);
        assert_eq!(request.user_agent, "tester/1.0");
        assert_eq!(request.method(), "GET");
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let response = HttpResponse::from_bytes(500, vec![b'x'; 10_000]);
        assert_eq!(response.excerpt(ERROR_BODY_LIMIT).len(), 4096);
    }

    #[test]
    fn test_excerpt_drops_split_character() {
        let mut body = vec![b'x'; 4095];
        body.extend_from_slice("é".as_bytes());
        let response = HttpResponse::from_bytes(500, body);
        let excerpt = response.excerpt(ERROR_BODY_LIMIT);
        assert_eq!(excerpt.len(), 4095);
        assert!(excerpt.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_excerpt_with_invalid_bytes_stays_within_limit() {
        let response = HttpResponse::from_bytes(500, vec![0xFF; 10]);
        assert!(response.excerpt(8).len() <= 8);
    }

    #[test]
    fn test_read_all_stops_when_cancelled() {
        let ctx = OpContext::new();
        ctx.cancel();
        let response = HttpResponse::from_bytes(200, "hello");
        let err = response.read_all("http://a", &ctx).unwrap_err();
        assert!(matches!(err, SysextError::Cancelled));
    }

    #[test]
    fn test_read_all() {
        let response = HttpResponse::from_bytes(200, "hello");
        assert!(response.is_ok());
        assert_eq!(response.read_all("http://a", &OpContext::new()).unwrap(), b"hello");
    }

    #[test]
    fn test_mock_client_records_requests() {
        let mock = MockHttpClient::new().with_response("http://a", 200, "body");
        let config = SysextConfig::default();
        let ok = mock.send(&HttpRequest::get("http://a", &config)).unwrap();
        let missing = mock.send(&HttpRequest::get("http://b", &config)).unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(missing.status, 404);
        assert_eq!(mock.requests(), vec!["http://a", "http://b"]);
    }

    #[test]
    fn test_logging_client_passes_through() {
        let mock = MockHttpClient::new().with_response("http://a", 200, "body");
        let client = LoggingHttpClient::new(&mock);
        let response = client
            .send(&HttpRequest::get("http://a", &SysextConfig::default()))
            .unwrap();
        assert_eq!(response.read_all("http://a", &OpContext::new()).unwrap(), b"body");
        assert_eq!(mock.request_count("http://a"), 1);
    }

    #[test]
    fn test_reqwest_client_timeout() {
        let client = ReqwestClient::with_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(client.timeout().as_secs(), 60);
    }
}
