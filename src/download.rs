//! HTTP transport for the observation service.
//!
//! Requests carry a timeout and transient failures are retried with
//! exponential backoff. A 404 is how the service says "no sites found" and
//! is reported separately from other statuses.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::FetchError;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        self.base_backoff
            .saturating_mul(1 << shift)
            .min(MAX_BACKOFF)
    }
}

/// A response body, or the service's "nothing here".
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Body(String),
    NotFound,
}

pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpFetcher { client, retry })
    }

    /// GETs `url` as text, retrying transient failures.
    pub async fn get_text(&self, url: &str) -> Result<Fetched, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.get_once(url).await {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient fetch failure, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Fetched, FetchError> {
        debug!(url, "GET");

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Fetched::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;

        Ok(Fetched::Body(body))
    }
}

/// A local HTTP/1.1 server that answers every request with one canned
/// response and counts the requests it saw.
#[cfg(test)]
pub(crate) mod canned {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    pub struct CannedServer {
        pub url: String,
        hits: Arc<AtomicUsize>,
    }

    impl CannedServer {
        pub async fn start(status: u16, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let hits = Arc::new(AtomicUsize::new(0));

            let counter = Arc::clone(&hits);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);

                    let response = format!(
                        "HTTP/1.1 {status} CANNED\r\ncontent-type: text/plain\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            CannedServer { url, hits }
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    /// A fetcher that ignores proxy settings and barely waits between
    /// attempts.
    pub fn local_fetcher(max_attempts: u32) -> HttpFetcher {
        HttpFetcher {
            client: Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            retry: RetryPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(1),
            },
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::canned::{local_fetcher, CannedServer};
    use super::*;

    #[test]
    fn should_double_backoff_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(500),
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn should_cap_backoff_at_one_minute() {
        let policy = RetryPolicy {
            max_attempts: 50,
            base_backoff: Duration::from_secs(5),
        };

        assert_eq!(policy.backoff(5), Duration::from_secs(60));
        assert_eq!(policy.backoff(40), Duration::from_secs(60));
    }

    #[test]
    fn should_build_client() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5), RetryPolicy::default());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn should_return_body_on_success() {
        let server = CannedServer::start(200, "agency_cd\tsite_no\n").await;

        let fetched = local_fetcher(3).get_text(&server.url).await.unwrap();

        assert_eq!(fetched, Fetched::Body("agency_cd\tsite_no\n".to_string()));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn should_map_not_found_without_retrying() {
        let server = CannedServer::start(404, "No sites found").await;

        let fetched = local_fetcher(3).get_text(&server.url).await.unwrap();

        assert_eq!(fetched, Fetched::NotFound);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn should_retry_server_errors_up_to_max_attempts() {
        let server = CannedServer::start(503, "busy").await;

        let err = local_fetcher(3).get_text(&server.url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn should_retry_rate_limiting() {
        let server = CannedServer::start(429, "slow down").await;

        let err = local_fetcher(2).get_text(&server.url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 429, .. }));
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn should_not_retry_client_errors() {
        let server = CannedServer::start(400, "bad parameterCd").await;

        let err = local_fetcher(3).get_text(&server.url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 400, .. }));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn should_make_one_attempt_when_max_attempts_is_zero() {
        let server = CannedServer::start(500, "").await;

        let err = local_fetcher(0).get_text(&server.url).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(server.hits(), 1);
    }
}
