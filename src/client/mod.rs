//! HTTP transport used by the measurement phases
//!
//! The executor talks to the server through [`SpeedTestTransport`] so that
//! phases can be driven by a fake in tests. [`HttpTransport`] is the real
//! implementation on top of a shared `reqwest` client: every request gets a
//! fresh cache-busting query value and asks intermediaries not to store it.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::server::PingResponse;

/// Body of a download response, yielded as it arrives. Dropping the stream
/// aborts the underlying transfer.
pub type DownloadBody = BoxStream<'static, Result<Bytes>>;

/// What the server reported after an upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Bytes the server counted, when it said so
    #[serde(default)]
    pub received: Option<u64>,
}

/// Request primitives a speed test needs from the server
#[async_trait]
pub trait SpeedTestTransport: Send + Sync {
    /// One latency probe
    async fn ping(&self) -> Result<PingResponse>;

    /// Start a download of `size` bytes and return the body stream once
    /// response headers are in
    async fn download(&self, size: u64) -> Result<DownloadBody>;

    /// Send `payload` and wait for the server's receipt
    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt>;
}

/// [`SpeedTestTransport`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    probe_timeout: Duration,
}

impl HttpTransport {
    /// Transport for the server at `base_url`. `probe_timeout` bounds each
    /// latency probe and connection setup; transfers are bounded by the
    /// phase deadline instead.
    pub fn new(base_url: &str, probe_timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(probe_timeout)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            probe_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.server_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `path` with `params` plus a unique `cb` value
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("cb", &Uuid::new_v4().simple().to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl SpeedTestTransport for HttpTransport {
    async fn ping(&self) -> Result<PingResponse> {
        let url = self.endpoint("api/ping", &[])?;
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_request(format!("Ping HTTP {}", status.as_u16())));
        }

        Ok(response.json::<PingResponse>().await?)
    }

    async fn download(&self, size: u64) -> Result<DownloadBody> {
        let url = self.endpoint("api/download", &[("size", size.to_string())])?;
        let response = self.client.get(url).header(CACHE_CONTROL, "no-store").send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_request(format!("Download HTTP {}", status.as_u16())));
        }

        Ok(response.bytes_stream().map(|chunk| chunk.map_err(AppError::from)).boxed())
    }

    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt> {
        let url = self.endpoint("api/upload", &[])?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CACHE_CONTROL, "no-store")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upload_rejected(status.as_u16(), &body));
        }

        Ok(response.json::<UploadReceipt>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let transport = HttpTransport::new("http://example.com/speed", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url().as_str(), "http://example.com/speed/");

        let url = transport.endpoint("api/ping", &[]).unwrap();
        assert_eq!(url.path(), "/speed/api/ping");
    }

    #[test]
    fn test_cache_buster_is_unique() {
        let transport = HttpTransport::new("http://example.com", Duration::from_secs(1)).unwrap();
        let first = transport.endpoint("api/ping", &[]).unwrap();
        let second = transport.endpoint("api/ping", &[]).unwrap();
        assert!(first.query().unwrap().starts_with("cb="));
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_ping_parses_server_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .and(header("cache-control", "no-store"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "t": 1_700_000_000_000i64 })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server).await.ping().await.unwrap();
        assert_eq!(reply.t, 1_700_000_000_000);

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].url.query_pairs().any(|(k, _)| k == "cb"));
    }

    #[tokio::test]
    async fn test_download_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/download"))
            .and(query_param("size", "4096"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 4096]))
            .mount(&server)
            .await;

        let body = transport(&server).await.download(4096).await.unwrap();
        let total: usize = body.map(|chunk| chunk.unwrap().len()).collect::<Vec<_>>().await.iter().sum();
        assert_eq!(total, 4096);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/download"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = match transport(&server).await.download(1024).await {
            Ok(_) => panic!("download should fail"),
            Err(error) => error,
        };
        assert_eq!(error.category(), "HTTP");
        assert!(error.to_string().contains("Download HTTP 503"));
    }

    #[tokio::test]
    async fn test_upload_sends_payload_and_reads_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(vec![9u8; 2048]))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "received": 2048 })))
            .mount(&server)
            .await;

        let receipt = transport(&server).await.upload(Bytes::from(vec![9u8; 2048])).await.unwrap();
        assert_eq!(receipt.received, Some(2048));
    }

    #[tokio::test]
    async fn test_upload_receipt_without_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let receipt = transport(&server).await.upload(Bytes::from_static(b"abc")).await.unwrap();
        assert_eq!(receipt.received, None);
    }

    #[tokio::test]
    async fn test_upload_rejection_carries_status_and_excerpt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(413).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let error = transport(&server).await.upload(Bytes::from_static(b"abc")).await.unwrap_err();
        let message = error.to_string();
        assert_eq!(error.category(), "UPLOAD");
        assert!(message.contains("Upload HTTP 413"));
        assert!(message.contains(&"x".repeat(200)));
        assert!(!message.contains(&"x".repeat(201)));
    }
}
