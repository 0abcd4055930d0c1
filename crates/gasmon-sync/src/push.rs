//! WebSocket implementation of the push channel.
//!
//! Each subscription owns one background task that connects to the
//! service's `/api/ws` endpoint, forwards `inserted` events and reconnects
//! with capped exponential delay until the subscription is cancelled.

use std::time::Duration;

use futures::StreamExt;
use gasmon_types::ReadingEvent;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::client::ServiceClient;
use crate::error::SyncError;
use crate::source::{PushChannel, PushSender, Subscription};

/// Events buffered between the socket task and the engine.
const DEFAULT_BUFFER: usize = 64;

/// Push channel backed by the service WebSocket.
#[derive(Debug, Clone)]
pub struct WsPushChannel {
    url: String,
    reconnect: BackoffPolicy,
    buffer: usize,
}

impl WsPushChannel {
    /// Create a push channel for a `ws://` or `wss://` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30)),
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Push channel for the service a [`ServiceClient`] talks to.
    pub fn for_client(client: &ServiceClient) -> Self {
        Self::new(client.ws_url())
    }

    /// Override the reconnect delays.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: BackoffPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// The WebSocket URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushChannel for WsPushChannel {
    fn subscribe(&self) -> Subscription {
        let (sender, subscription) = Subscription::channel(self.buffer);
        tokio::spawn(run_socket(self.url.clone(), self.reconnect, sender));
        subscription
    }
}

/// Why a connected session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    Disconnected,
}

async fn run_socket(url: String, reconnect: BackoffPolicy, sender: PushSender) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = sender.cancelled() => break,
            result = connect(&url) => result,
        };

        match connected {
            Ok(stream) => {
                info!("Push channel connected to {}", url);
                attempt = 0;
                match forward_events(stream, &sender).await {
                    Ok(SessionEnd::Cancelled) => break,
                    Ok(SessionEnd::Disconnected) => {}
                    Err(e) => warn!("{}", e),
                }
            }
            Err(e) => warn!("Connecting to {} failed: {}", url, e),
        }

        attempt = attempt.saturating_add(1);
        let delay = reconnect.interval_for(attempt);
        debug!("Reconnecting push channel in {:?}", delay);

        tokio::select! {
            _ = sender.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("Push channel task stopped");
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Result<Socket, SyncError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| SyncError::Push(e.to_string()))?;
    Ok(stream)
}

async fn forward_events<S>(mut stream: S, sender: &PushSender) -> Result<SessionEnd, SyncError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = tokio::select! {
            _ = sender.cancelled() => return Ok(SessionEnd::Cancelled),
            message = stream.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ReadingEvent>(text.as_str()) {
                    Ok(event) => {
                        if !sender.send(event).await {
                            return Ok(SessionEnd::Cancelled);
                        }
                    }
                    Err(e) => warn!("Ignoring malformed push message: {}", e),
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("Push channel closed by server");
                return Ok(SessionEnd::Disconnected);
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(SyncError::Push(e.to_string())),
        }
    }
}
