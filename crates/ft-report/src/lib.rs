//! HTTP delivery of completed focus sessions.
//!
//! Each session is `POST`ed as JSON to the collector endpoint. Delivery is
//! best-effort: failures are logged and the report is dropped, never retried.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ft_core::{ReportSink, SessionReport};
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

/// Request timeout for a single report.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the collector listens unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/";

/// Report delivery errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The endpoint is not an absolute http(s) URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        endpoint: String,
        reason: String,
    },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The collector answered with a non-success status.
    #[error("collector returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Collector HTTP client.
///
/// Clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client posting to `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self, ReportError> {
        let invalid = |reason: String| ReportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let endpoint = Url::parse(endpoint).map_err(|err| invalid(err.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", endpoint.scheme())));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ReportError::ClientBuild)?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one report and waits for the collector's answer.
    pub async fn send(&self, report: &SessionReport) -> Result<(), ReportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(report)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status { status, body });
        }
        Ok(())
    }
}

/// A [`ReportSink`] that delivers each report on its own task.
///
/// [`submit`](ReportSink::submit) must be called from within a tokio runtime.
/// Call [`drain`](HttpSink::drain) before shutting down so in-flight
/// deliveries are not cut off.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl HttpSink {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Waits for every delivery started so far. Returns how many finished.
    pub async fn drain(&self) -> usize {
        let mut pending = mem::take(
            &mut *self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let mut finished = 0;
        while let Some(result) = pending.join_next().await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "report delivery task failed");
            }
            finished += 1;
        }
        finished
    }
}

impl ReportSink for HttpSink {
    fn submit(&self, report: SessionReport) {
        let client = self.client.clone();
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Reap finished deliveries so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            match client.send(&report).await {
                Ok(()) => tracing::debug!(
                    tab_id = %report.tab_id,
                    target = %report.target.as_str(),
                    "report delivered"
                ),
                Err(err) => tracing::error!(
                    tab_id = %report.tab_id,
                    error = %err,
                    "error sending data"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ft_core::{ReportTarget, TabId};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn report() -> SessionReport {
        SessionReport::new(
            TabId::new(1),
            ReportTarget::Domain("a.com".to_string()),
            1000,
            9000,
        )
    }

    /// Accepts one connection, captures the request and answers with `status_line`.
    async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}/"), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn client_rejects_relative_endpoint() {
        assert!(matches!(
            Client::new("localhost:8080"),
            Err(ReportError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Client::new("/reports"),
            Err(ReportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn client_rejects_non_http_scheme() {
        assert!(matches!(
            Client::new("ftp://localhost/"),
            Err(ReportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn client_accepts_default_endpoint() {
        let client = Client::new(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:8080/");
        assert!(format!("{client:?}").contains("localhost:8080"));
    }

    #[tokio::test]
    async fn send_posts_json_report() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let client = Client::new(&endpoint).unwrap();

        client.send(&report()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST / HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(
            r#"{"tabId":1,"domain":"a.com","openTime":1000,"closeTime":9000,"activeDuration":8000}"#
        ));
    }

    #[tokio::test]
    async fn send_surfaces_error_status() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let client = Client::new(&endpoint).unwrap();

        let err = client.send(&report()).await.unwrap_err();
        assert!(matches!(err, ReportError::Status { status, .. } if status.as_u16() == 500));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn send_to_closed_port_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::new(&format!("http://{addr}/")).unwrap();
        assert!(matches!(
            client.send(&report()).await,
            Err(ReportError::Request(_))
        ));
    }

    #[tokio::test]
    async fn sink_delivers_in_background_and_drains() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let sink = HttpSink::new(Client::new(&endpoint).unwrap());

        sink.submit(report());
        assert_eq!(sink.drain().await, 1);

        let request = server.await.unwrap();
        assert!(request.contains(r#""domain":"a.com""#));
        assert_eq!(sink.drain().await, 0);
    }

    #[tokio::test]
    async fn sink_swallows_delivery_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpSink::new(Client::new(&format!("http://{addr}/")).unwrap());
        sink.submit(report());
        sink.submit(report());
        assert_eq!(sink.drain().await, 2);
    }
}
