//! HTTP download of remote trip files.

mod client;

pub use client::{HttpClient, TripFileClient};

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Downloads `url` with `client` and returns the body.
///
/// # Errors
///
/// Fails on a malformed URL, a transport error, or a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed = reqwest::Url::parse(url).map_err(|e| PipelineError::InvalidSource {
        source_name: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    debug!(url, bytes = bytes.len(), "Fetched remote file");
    Ok(bytes.to_vec())
}

/// True if `source` should be fetched over HTTP rather than read from disk.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::{Request, Response};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/trips.csv")
    }

    struct RecordingClient {
        inner: TripFileClient,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} {}", req.method(), req.url().path()));
            self.inner.execute(req).await
        }
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://d37ci6vzurychx.cloudfront.net/trip-data/yellow.csv"));
        assert!(is_remote("http://localhost:8080/trips.csv"));
        assert!(!is_remote("processed_data/trips.csv"));
        assert!(!is_remote("httpdocs/trips.csv"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_rejects_malformed_url() {
        let client = TripFileClient::new().unwrap();
        let err = fetch_bytes(&client, "http://").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSource { .. }));
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\nVendorID\r\n1",
        )
        .await;
        let client = RecordingClient {
            inner: TripFileClient::new().unwrap(),
            seen: Mutex::new(Vec::new()),
        };

        let body = fetch_bytes(&client, &url).await.unwrap();

        assert_eq!(body, b"VendorID\r\n1");
        assert_eq!(*client.seen.lock().unwrap(), vec!["GET /trips.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_bytes_error_status() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let client = TripFileClient::new().unwrap();

        let err = fetch_bytes(&client, &url).await.unwrap_err();
        match err {
            PipelineError::Http(e) => assert_eq!(e.status(), Some(reqwest::StatusCode::NOT_FOUND)),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }
}
