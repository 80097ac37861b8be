//! HTTP handlers for the probe and traffic endpoints
//!
//! Every handler is stateless apart from the shared logger. Payload bytes are
//! produced and consumed as streams so that memory stays bounded regardless
//! of the transfer size.

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::logging::Logger;
use crate::traffic;

/// State shared by all handlers
#[derive(Clone)]
pub struct ServerState {
    pub logger: Logger,
}

/// Body of a `/api/ping` response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server wall clock in milliseconds since the Unix epoch
    pub t: i64,
}

/// Body of a successful `/api/upload` response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub received: u64,
}

/// Query string accepted by `/api/download`. Unknown keys such as the
/// client cache-buster are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    pub size: Option<u64>,
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        t: Utc::now().timestamp_millis(),
    })
}

/// Streams `size` random bytes (20 MiB when absent) as an octet stream
pub async fn download(State(state): State<ServerState>, Query(params): Query<DownloadParams>) -> Response {
    let size = traffic::effective_download_size(params.size);

    state
        .logger
        .debug(&format!("Download requested: {} bytes", size))
        .field("size", size)
        .log()
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));

    (StatusCode::OK, headers, Body::from_stream(traffic::generate_stream(size))).into_response()
}

/// Drains the request body and reports how many bytes arrived
pub async fn upload(State(state): State<ServerState>, body: Body) -> Response {
    match traffic::count_stream(body.into_data_stream()).await {
        Ok(received) => {
            state
                .logger
                .info(&format!("Upload received {} bytes", received))
                .field("received", received)
                .log()
                .await;
            Json(UploadResponse { received }).into_response()
        },
        // The client is usually gone by now; whatever is written here is
        // never a receipt.
        Err(aborted) => {
            state
                .logger
                .warn(&format!("Upload aborted at {} bytes", aborted.received))
                .field("received", aborted.received)
                .field("reason", aborted.source.to_string())
                .log()
                .await;
            (StatusCode::BAD_REQUEST, format!("Error reading body: {}", aborted.source)).into_response()
        },
    }
}
