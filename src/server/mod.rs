//! Transform endpoint
//!
//! Serves `POST /transform`: takes strokes plus a crop box as JSON and
//! answers with the rasterized, model-sized PNG.

use anyhow::{Context, Result};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::vision::transform::{self, TransformError, TransformOptions, TransformRequest};

/// Largest accepted request body
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// A fully formed HTTP answer, independent of the server library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body,
        }
    }

    fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: message.into().into_bytes(),
        }
    }
}

/// Dispatch one request
pub fn route(method: &Method, url: &str, body: &[u8], options: &TransformOptions) -> Reply {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (Method::Post, "/transform") => handle_transform(body, options),
        (_, "/transform") => Reply::text(405, "method not allowed"),
        _ => Reply::text(404, "not found"),
    }
}

fn handle_transform(body: &[u8], options: &TransformOptions) -> Reply {
    let request: TransformRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return Reply::text(400, format!("invalid request body: {}", e)),
    };

    match transform::transform_to_png(&request, options) {
        Ok(png) => Reply::png(png),
        Err(e @ (TransformError::EmptyBox(_) | TransformError::BoxTooLarge { .. })) => Reply::text(422, e.to_string()),
        Err(e @ TransformError::Encode(_)) => Reply::text(500, e.to_string()),
    }
}

/// Blocking HTTP server for the transform endpoint
pub struct TransformServer {
    server: Arc<Server>,
    options: TransformOptions,
}

impl TransformServer {
    pub fn bind(address: &str, options: TransformOptions) -> Result<Self> {
        let server = Server::http(address)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| format!("Failed to bind transform server on {}", address))?;

        Ok(Self {
            server: Arc::new(server),
            options,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Handle requests until the server is unblocked
    pub fn serve(&self) {
        if let Some(addr) = self.local_addr() {
            info!("Transform endpoint listening on http://{}/transform", addr);
        }

        for request in self.server.incoming_requests() {
            self.handle(request);
        }
    }

    /// Run `serve` on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let server = self.server.clone();
        let address = self.local_addr();

        let thread = std::thread::Builder::new()
            .name("transform-server".to_string())
            .spawn(move || self.serve())
            .context("Failed to spawn transform server thread")?;

        Ok(ServerHandle {
            server,
            address,
            thread: Some(thread),
        })
    }

    fn handle(&self, mut request: Request) {
        let request_id = Uuid::new_v4();
        let method = request.method().clone();
        let url = request.url().to_string();

        let mut body = Vec::new();
        let reply = match request.as_reader().take(MAX_BODY_BYTES).read_to_end(&mut body) {
            Ok(_) => route(&method, &url, &body, &self.options),
            Err(e) => Reply::text(400, format!("failed to read body: {}", e)),
        };

        debug!(%request_id, "{} {} -> {} ({} bytes)", method, url, reply.status, reply.body.len());
        if reply.status >= 400 {
            warn!(%request_id, "{} {} failed: {}", method, url, String::from_utf8_lossy(&reply.body));
        }

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }

        if let Err(e) = request.respond(response) {
            warn!(%request_id, "Failed to send response: {}", e);
        }
    }
}

/// A running server thread; stops the server when dropped
pub struct ServerHandle {
    server: Arc<Server>,
    address: Option<SocketAddr>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"strokes":[[[2,30,30],[2,2,30]]],"box":[0,0,34,34]}"#;

    #[test]
    fn test_route_transform_ok() {
        let reply = route(&Method::Post, "/transform", VALID.as_bytes(), &TransformOptions::default());

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "image/png");
        let image = transform::decode_png(&reply.body).unwrap();
        assert_eq!(image.dimensions(), (28, 28));
    }

    #[test]
    fn test_route_rejects_bad_input() {
        let options = TransformOptions::default();

        let reply = route(&Method::Post, "/transform", b"not json", &options);
        assert_eq!(reply.status, 400);

        let mismatched = r#"{"strokes":[[[1,2],[1]]],"box":[0,0,10,10]}"#;
        assert_eq!(route(&Method::Post, "/transform", mismatched.as_bytes(), &options).status, 400);

        let empty_box = r#"{"strokes":[[[1],[1]]],"box":[4,4,4,10]}"#;
        assert_eq!(route(&Method::Post, "/transform", empty_box.as_bytes(), &options).status, 422);

        let huge_box = r#"{"strokes":[[[2],[2]]],"box":[0,0,4294967295,4294967295]}"#;
        let reply = route(&Method::Post, "/transform", huge_box.as_bytes(), &options);
        assert_eq!(reply.status, 422);
        assert!(String::from_utf8_lossy(&reply.body).contains("limit"));
    }

    #[test]
    fn test_route_far_off_stroke_answers_quickly() {
        let far = r#"{"strokes":[[[0,40000000],[0,40000000]]],"box":[0,0,28,28]}"#;

        let start = std::time::Instant::now();
        let reply = route(&Method::Post, "/transform", far.as_bytes(), &TransformOptions::default());

        assert_eq!(reply.status, 200);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_route_unknown_paths_and_methods() {
        let options = TransformOptions::default();

        assert_eq!(route(&Method::Get, "/transform", b"", &options).status, 405);
        assert_eq!(route(&Method::Post, "/predict", b"", &options).status, 404);
        assert_eq!(route(&Method::Post, "/transform?x=1", VALID.as_bytes(), &options).status, 200);
    }

    #[tokio::test]
    async fn test_server_over_http() {
        let server = TransformServer::bind("127.0.0.1:0", TransformOptions::default()).unwrap();
        let handle = server.spawn().unwrap();
        let addr = handle.address().unwrap();

        let response = reqwest::Client::new()
            .post(format!("http://{}/transform", addr))
            .header("Content-Type", "application/json")
            .body(VALID)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.headers()["content-type"], "image/png");
        let bytes = response.bytes().await.unwrap();
        assert_eq!(transform::decode_png(&bytes).unwrap().dimensions(), (28, 28));

        // Remote client against the same endpoint
        let client = transform::TransformClient::remote(format!("http://{}/transform", addr)).unwrap();
        let request: TransformRequest = serde_json::from_str(VALID).unwrap();
        assert_eq!(client.transform(&request).await.unwrap().dimensions(), (28, 28));

        // Non-2xx replies surface as errors
        let missing = transform::TransformClient::remote(format!("http://{}/nope", addr)).unwrap();
        let err = missing.transform(&request).await.unwrap_err();
        assert!(err.to_string().contains("404"), "{}", err);

        drop(handle);
    }
}
