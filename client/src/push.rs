//! Realtime inventory updates over a WebSocket.
//!
//! The subscriber task owns the connection and reconnects on its own with
//! exponential backoff. Whoever holds the [`PushSubscription`] only ever sees
//! a stream of [`PushNotice`]s; a dropped connection is a notice, not an error.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use lastcall_common::event::RealtimeEvent;

/// Buffered notices before the subscriber waits for the session to catch up.
const NOTICE_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum PushNotice {
    Connected,
    Event(RealtimeEvent),
    Disconnected,
}

/// Receiving end of a push channel. Dropping it stops the subscriber task.
#[derive(Debug)]
pub struct PushSubscription {
    notices: mpsc::Receiver<PushNotice>,
    task: Option<JoinHandle<()>>,
}

impl PushSubscription {
    /// Spawn a subscriber for `url`. Must be called inside a Tokio runtime.
    pub fn connect(
        url: impl Into<String>,
        reconnect_min: Duration,
        reconnect_max: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(NOTICE_BUFFER);
        let url = url.into();
        let task = tokio::spawn(run_subscriber(url, tx, reconnect_min, reconnect_max));
        Self {
            notices: rx,
            task: Some(task),
        }
    }

    /// Wrap notices produced elsewhere (another transport, or a test).
    pub fn from_channel(notices: mpsc::Receiver<PushNotice>) -> Self {
        Self {
            notices,
            task: None,
        }
    }

    /// Next notice, or `None` once the producer is gone for good.
    pub async fn recv(&mut self) -> Option<PushNotice> {
        self.notices.recv().await
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Decode one text frame. Unknown or malformed frames yield `None`.
pub fn decode_frame(text: &str) -> Option<RealtimeEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Push channel: skipping frame ({e}): {text}");
            None
        }
    }
}

async fn run_subscriber(
    url: String,
    tx: mpsc::Sender<PushNotice>,
    reconnect_min: Duration,
    reconnect_max: Duration,
) {
    let mut backoff = reconnect_min;

    loop {
        info!("Push channel: connecting to {url} ...");

        let mut ws = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                warn!("Push channel: connect failed: {e} (retrying in {backoff:?})");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(reconnect_max);
                continue;
            }
        };

        backoff = reconnect_min;
        info!("Push channel: connected");
        if tx.send(PushNotice::Connected).await.is_err() {
            return;
        }

        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(event) = decode_frame(text.as_str()) {
                        if tx.send(PushNotice::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("Push channel: closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Push channel: connection error: {e}");
                    break;
                }
            }
        }

        if tx.send(PushNotice::Disconnected).await.is_err() {
            return;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(reconnect_max);
    }
}
