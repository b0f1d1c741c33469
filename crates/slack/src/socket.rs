//! Socket Mode transport for Slack.
//!
//! Opens a WebSocket through `apps.connections.open` so no public HTTP
//! endpoint is needed. Envelopes are handled one at a time: each is
//! normalized, routed, and awaited before the next frame is read.
//! Acknowledgements go through an outbound queue drained by a writer task, so
//! an ack is on the wire before the router produces any other side effect.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    recall_channels::{Error as ChannelError, EventAck, Result as ChannelResult},
    secrecy::Secret,
    tokio::sync::mpsc,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    api::SlackWebClient,
    error::Result,
    event::{Envelope, normalize},
    router::EventRouter,
};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Acknowledges one envelope through the connection's outbound queue.
pub struct SocketAck {
    envelope_id: Option<String>,
    outbound: mpsc::UnboundedSender<Message>,
    sent: AtomicBool,
}

impl SocketAck {
    pub fn new(envelope_id: Option<String>, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            envelope_id,
            outbound,
            sent: AtomicBool::new(false),
        }
    }

    pub fn was_sent(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventAck for SocketAck {
    /// Queue `{"envelope_id": ...}`. Acknowledging twice sends once.
    async fn ack(&self) -> ChannelResult<()> {
        let Some(envelope_id) = &self.envelope_id else {
            return Ok(());
        };
        if self.sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let payload = serde_json::json!({ "envelope_id": envelope_id }).to_string();
        self.outbound
            .send(Message::Text(payload.into()))
            .map_err(|_| ChannelError::unavailable("socket mode writer has shut down"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Cancelled,
    /// Slack sent a `disconnect` frame ahead of rotating the connection.
    Refresh,
    /// The stream ended or the server closed it.
    Dropped,
}

impl ConnectionEnd {
    /// How long to wait before reopening. `None` stops the client.
    fn pause(self, reconnect_delay: Duration) -> Option<Duration> {
        match self {
            Self::Cancelled => None,
            Self::Refresh => Some(Duration::ZERO),
            Self::Dropped => Some(reconnect_delay),
        }
    }
}

pub struct SocketModeClient {
    web: Arc<SlackWebClient>,
    app_token: Secret<String>,
    router: EventRouter,
    reconnect_delay: Duration,
}

impl SocketModeClient {
    pub fn new(web: Arc<SlackWebClient>, app_token: Secret<String>, router: EventRouter) -> Self {
        Self {
            web,
            app_token,
            router,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Receive and route events until `cancel` fires. A server-requested
    /// refresh reconnects at once; dropped or failed connections are reopened
    /// after a fixed delay.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        loop {
            let pause = match self.run_connection(&cancel).await {
                Ok(end) => end.pause(self.reconnect_delay),
                Err(e) => {
                    warn!(error = %e, "socket mode connection failed");
                    Some(self.reconnect_delay)
                },
            };
            let Some(pause) = pause else {
                info!("socket mode cancelled");
                return Ok(());
            };
            if pause.is_zero() {
                continue;
            }

            info!(delay_secs = pause.as_secs(), "socket mode connection lost, reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(pause) => {},
            }
        }
    }

    async fn run_connection(&self, cancel: &CancellationToken) -> Result<ConnectionEnd> {
        let url = self.web.open_socket_url(&self.app_token).await?;
        let (stream, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut frames) = stream.split();
        debug!("socket mode stream opened");

        let (outbound, mut queue) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "failed to write socket mode frame");
                    break;
                }
            }
        });

        let end = loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break ConnectionEnd::Cancelled,
                frame = frames.next() => frame,
            };
            let Some(frame) = frame else {
                break ConnectionEnd::Dropped;
            };
            match frame? {
                Message::Text(text) => {
                    if let Some(end) = handle_frame(&self.router, text.as_str(), &outbound).await {
                        break end;
                    }
                },
                Message::Close(close) => {
                    info!(?close, "socket mode closed by server");
                    break ConnectionEnd::Dropped;
                },
                _ => {},
            }
        };

        drop(outbound);
        if let Err(e) = writer.await {
            warn!(error = %e, "socket mode writer task failed");
        }
        Ok(end)
    }
}

/// Handle one text frame. Returns `Some` when the connection should end.
async fn handle_frame(
    router: &EventRouter,
    text: &str,
    outbound: &mpsc::UnboundedSender<Message>,
) -> Option<ConnectionEnd> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "ignoring unparseable socket mode frame");
            return None;
        },
    };

    match envelope.kind.as_str() {
        "hello" => {
            info!("socket mode connected");
            return None;
        },
        "disconnect" => {
            info!(reason = ?envelope.reason, "slack asked to reconnect");
            return Some(ConnectionEnd::Refresh);
        },
        _ => {},
    }

    let ack = SocketAck::new(envelope.envelope_id.clone(), outbound.clone());
    match normalize(&envelope) {
        Ok(Some(event)) => {
            if let Err(e) = router.handle(&event, &ack).await {
                warn!(kind = event.kind(), code = ?e.code(), "event was not handled");
            }
        },
        Ok(None) => debug!(envelope = %envelope.kind, "nothing to route"),
        Err(e) => warn!(envelope = %envelope.kind, error = %e, "malformed event payload"),
    }

    // unrouted and malformed envelopes are acknowledged too, or Slack redelivers them
    if !ack.was_sent()
        && let Err(e) = ack.ack().await
    {
        warn!(error = %e, "failed to acknowledge envelope");
    }
    None
}
