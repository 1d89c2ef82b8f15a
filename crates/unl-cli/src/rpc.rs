//! WebSocket manifest source
//!
//! Sends `manifest` commands to a network node over one lazily opened
//! WebSocket connection. Every request is bounded by the configured timeout;
//! a failed or timed out exchange drops the connection so the next request
//! reconnects.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use unl_core::{Result, UnlError};
use unl_publisher::{ManifestResponse, ManifestSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Manifest lookups over a node's WebSocket API
pub struct WebSocketManifestSource {
    url: String,
    request_timeout: Duration,
    connection: Mutex<Option<WsStream>>,
    next_id: AtomicU64,
}

impl WebSocketManifestSource {
    /// Create a source for `url`; nothing is opened until the first lookup
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            connection: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<WsStream> {
        let (stream, response) = timeout(self.request_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| UnlError::network(format!("connect to {} timed out", self.url)))?
            .map_err(|e| UnlError::network(format!("connect to {} failed: {e}", self.url)))?;
        tracing::debug!(url = %self.url, status = %response.status(), "Connected");
        Ok(stream)
    }

    /// Send `request` and wait for the reply carrying the same `id`
    pub async fn request(&self, request: Value, id: u64) -> Result<Value> {
        let mut connection = self.connection.lock().await;
        if connection.is_none() {
            *connection = Some(self.connect().await?);
        }
        let stream = connection
            .as_mut()
            .ok_or_else(|| UnlError::network("connection unavailable"))?;

        let outcome =
            timeout(self.request_timeout, exchange(stream, request.to_string(), id)).await;
        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                *connection = None;
                Err(e)
            }
            Err(_) => {
                *connection = None;
                Err(UnlError::network(format!(
                    "request {id} timed out after {}s",
                    self.request_timeout.as_secs()
                )))
            }
        }
    }

    /// Close the connection if open
    pub async fn close(&self) -> Result<()> {
        if let Some(mut stream) = self.connection.lock().await.take() {
            stream
                .close(None)
                .await
                .map_err(|e| UnlError::network(format!("close failed: {e}")))?;
        }
        Ok(())
    }
}

/// Build a `manifest` command
pub fn manifest_request(id: u64, public_key: &str) -> Value {
    json!({
        "id": id,
        "command": "manifest",
        "public_key": public_key,
    })
}

async fn exchange(stream: &mut WsStream, text: String, id: u64) -> Result<Value> {
    stream
        .send(Message::Text(text))
        .await
        .map_err(|e| UnlError::network(format!("send failed: {e}")))?;

    loop {
        let message = stream
            .next()
            .await
            .ok_or_else(|| UnlError::network("connection closed"))?
            .map_err(|e| UnlError::network(format!("receive failed: {e}")))?;

        let reply: Value = match message {
            Message::Text(text) => serde_json::from_str(&text)?,
            Message::Binary(data) => serde_json::from_slice(&data)?,
            Message::Ping(data) => {
                stream
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| UnlError::network(format!("pong failed: {e}")))?;
                continue;
            }
            Message::Pong(_) | Message::Frame(_) => continue,
            Message::Close(_) => return Err(UnlError::network("connection closed by peer")),
        };

        if reply.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(reply);
        }
        tracing::trace!(?reply, "Skipping unrelated message");
    }
}

#[async_trait]
impl ManifestSource for WebSocketManifestSource {
    async fn fetch_manifest(&self, public_key: &str) -> Result<ManifestResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reply = self.request(manifest_request(id, public_key), id).await?;
        ManifestResponse::from_json(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use unl_publisher::ManifestInfo;

    /// Answers `manifest` commands: keys starting with "slow" are rate
    /// limited, "silent" gets no reply, everything else gets a manifest.
    async fn spawn_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).unwrap();
                let key = request["public_key"].as_str().unwrap_or_default().to_string();
                if key == "silent" {
                    continue;
                }
                // Unsolicited message first, to exercise id matching
                ws.send(Message::Text(json!({"type": "serverStatus"}).to_string()))
                    .await
                    .unwrap();
                let reply = if key.starts_with("slow") {
                    json!({"id": request["id"], "error": "slowDown", "status": "error"})
                } else {
                    json!({
                        "id": request["id"],
                        "result": {"manifest": "TUFOAA==", "requested": key},
                        "status": "success",
                    })
                };
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
        });
        format!("ws://{addr}")
    }

    #[test]
    fn test_manifest_request_shape() {
        assert_eq!(
            manifest_request(7, "nHabc"),
            json!({"id": 7, "command": "manifest", "public_key": "nHabc"})
        );
    }

    #[tokio::test]
    async fn test_fetch_over_websocket() {
        let url = spawn_node().await;
        let source = WebSocketManifestSource::new(url, Duration::from_secs(5));

        assert_eq!(
            source.fetch_manifest("nHvalidator").await.unwrap(),
            ManifestResponse::Found(ManifestInfo {
                manifest: "TUFOAA==".into(),
                requested: "nHvalidator".into(),
            })
        );
        assert!(source.fetch_manifest("slow").await.unwrap().is_rate_limited());
        source.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_request_timeout_is_network_error() {
        let url = spawn_node().await;
        let source = WebSocketManifestSource::new(url, Duration::from_millis(200));

        let err = source.fetch_manifest("silent").await.unwrap_err();
        assert!(matches!(err, UnlError::Network { .. }));
    }

    #[tokio::test]
    async fn test_connect_failure_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = WebSocketManifestSource::new(format!("ws://{addr}"), Duration::from_secs(2));
        let err = source.fetch_manifest("nHvalidator").await.unwrap_err();
        assert!(matches!(err, UnlError::Network { .. }));
    }
}
