use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::decode::StreamDecoder;

/// Response header carrying the server-issued session token.
pub const THREAD_ID_HEADER: &str = "x-thread-id";

/// Events emitted while a response streams in.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Next decoded chunk of assistant text, in arrival order.
    Delta(String),
    /// Stream ended normally; carries the session token from the response
    /// header, if the server sent one.
    Done { thread_id: Option<String> },
    /// Transport or read failure; the exchange is over.
    Error(String),
}

/// Request body for `POST /stream`.
///
/// `thread_id` serializes as JSON `null` until the server has issued a
/// token, which is how a new conversation thread is requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub content: String,
    pub thread_id: Option<String>,
}

/// HTTP client for the streaming chat endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    server_url: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send one request and stream the response back over a channel.
    ///
    /// The receiver yields zero or more `Delta`s followed by exactly one
    /// terminal event (`Done` or `Error`). Any failure along the way is
    /// collapsed into a single `Error`.
    pub async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let (tx, rx) = mpsc::channel(1000);

        let client = self.client.clone();
        let url = format!("{}/stream", self.server_url);

        let tx_clone = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::run_exchange(client, url, request, tx).await {
                warn!(error = %e, "exchange failed");
                let _ = tx_clone.send(StreamEvent::Error(e.to_string())).await;
            }
        });

        Ok(rx)
    }

    async fn run_exchange(
        client: reqwest::Client,
        url: String,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<()> {
        debug!(url = %url, has_thread = request.thread_id.is_some(), "sending request");

        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("server returned {}: {}", status, body);
        }

        let thread_id = response
            .headers()
            .get(THREAD_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        forward_chunks(Box::pin(response.bytes_stream()), &tx).await?;

        debug!(?thread_id, "stream complete");
        let _ = tx.send(StreamEvent::Done { thread_id }).await;
        Ok(())
    }
}

/// Pump a byte stream through the incremental decoder, forwarding each
/// decoded chunk as a `Delta` in arrival order.
async fn forward_chunks<S, E>(mut stream: S, tx: &mpsc::Sender<StreamEvent>) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("error reading response stream")?;
        let text = decoder.push(&chunk);
        if !text.is_empty() {
            let _ = tx.send(StreamEvent::Delta(text)).await;
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(StreamEvent::Delta(rest)).await;
    }

    Ok(())
}
