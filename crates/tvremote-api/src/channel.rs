//! The `samsung.remote.control` WebSocket channel.
//!
//! [`open`] spawns one background task per connection. The task owns
//! both halves of the socket: outbound [`RemoteRequest`]s arrive over
//! the [`CommanderHandle`], inbound frames are translated into
//! [`CommanderEvent`]s. There is no reconnect loop; a dropped socket is
//! reported once as [`CommanderEvent::Disconnected`] and the task ends.
//!
//! ```rust,ignore
//! let url = channel_url("192.168.1.20", "TV Remote", None, true)?;
//! let (handle, mut events) = channel::open(url, &TransportConfig::default(), cancel)?;
//! while let Some(event) = events.recv().await {
//!     if let CommanderEvent::Auth(AuthStatus::Allowed { .. }) = event {
//!         handle.send_key("KEY_VOLUP")?;
//!     }
//! }
//! ```

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::protocol::{ChannelEvent, RemoteRequest};
use crate::transport::TransportConfig;

const EVENT_CHANNEL_SIZE: usize = 32;

// ── Events ───────────────────────────────────────────────────────────

/// Outcome of the TV's pairing prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// The user approved; the TV may hand out a token for next time.
    Allowed { token: Option<String> },
    /// The user rejected the prompt.
    Denied,
    /// The prompt expired with no answer.
    None,
}

/// Something that happened on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommanderEvent {
    Auth(AuthStatus),
    /// Connect or write failure; always followed by `Disconnected`.
    Error(String),
    /// The socket is gone. Emitted at most once, never after `close()`.
    Disconnected,
}

// ── CommanderHandle ──────────────────────────────────────────────────

/// Write side of an open channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommanderHandle {
    tx: mpsc::UnboundedSender<RemoteRequest>,
    cancel: CancellationToken,
}

impl CommanderHandle {
    /// Build a handle around an existing request queue.
    ///
    /// `open` uses this for the real socket; test doubles use it to
    /// capture what would have been written.
    pub fn from_parts(tx: mpsc::UnboundedSender<RemoteRequest>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Queue a frame for the writer.
    pub fn send(&self, request: RemoteRequest) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::ChannelClosed);
        }
        self.tx.send(request).map_err(|_| Error::ChannelClosed)
    }

    pub fn send_key(&self, key_code: &str) -> Result<(), Error> {
        self.send(RemoteRequest::key_click(key_code))
    }

    pub fn send_text(&self, text: &str) -> Result<(), Error> {
        self.send(RemoteRequest::input_text(text))
    }

    /// Close the socket. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

// ── open ─────────────────────────────────────────────────────────────

/// Open the remote channel at `url`.
///
/// Returns as soon as the connection task is spawned. TLS setup errors
/// surface here; connect failures arrive as events.
pub fn open(
    url: Url,
    transport: &TransportConfig,
    cancel: CancellationToken,
) -> Result<(CommanderHandle, mpsc::Receiver<CommanderEvent>), Error> {
    let connector = if url.scheme() == "wss" {
        transport.websocket_connector()?
    } else {
        None
    };

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let handle = CommanderHandle::from_parts(request_tx, cancel.clone());

    tokio::spawn(async move {
        let result = connect_and_serve(&url, connector, request_rx, &event_tx, &cancel).await;
        if cancel.is_cancelled() {
            debug!("remote channel closed by owner");
            return;
        }
        if let Err(e) = result {
            warn!(error = %e, "remote channel failed");
            let _ = event_tx.send(CommanderEvent::Error(e.to_string())).await;
        }
        let _ = event_tx.send(CommanderEvent::Disconnected).await;
    });

    Ok((handle, event_rx))
}

// ── Connection lifecycle ─────────────────────────────────────────────

async fn connect_and_serve(
    url: &Url,
    connector: Option<tokio_tungstenite::Connector>,
    mut requests: mpsc::UnboundedReceiver<RemoteRequest>,
    event_tx: &mpsc::Sender<CommanderEvent>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    info!(host = url.host_str().unwrap_or_default(), "connecting to remote channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;
    let request = ClientRequestBuilder::new(uri);

    let connecting = tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);
    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        connected = connecting => connected.map_err(|e| Error::WebSocketConnect(e.to_string()))?,
    };
    debug!("remote channel socket open, awaiting pairing");

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Frames queued before close() still go out.
                while let Ok(request) = requests.try_recv() {
                    if write
                        .send(tungstenite::Message::Text(request.to_json().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            request = requests.recv() => {
                let Some(request) = request else {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                };
                trace!(cmd = %request.params.data_of_cmd, "writing remote frame");
                write
                    .send(tungstenite::Message::Text(request.to_json().into()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(event) = translate(&text) {
                            if event_tx.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        return Err(match frame {
                            Some(cf) => Error::WebSocketClosed {
                                code: cf.code.into(),
                                reason: cf.reason.to_string(),
                            },
                            None => Error::WebSocketClosed {
                                code: 1005,
                                reason: "no close payload".into(),
                            },
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        info!("remote channel stream ended");
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn translate(text: &str) -> Option<CommanderEvent> {
    match ChannelEvent::parse(text)? {
        ChannelEvent::Connected { token } => {
            Some(CommanderEvent::Auth(AuthStatus::Allowed { token }))
        }
        ChannelEvent::Unauthorized => Some(CommanderEvent::Auth(AuthStatus::Denied)),
        ChannelEvent::TimedOut => Some(CommanderEvent::Auth(AuthStatus::None)),
        ChannelEvent::Other { event } => {
            trace!(event, "ignoring channel event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_pairing_events() {
        assert_eq!(
            translate(r#"{"event":"ms.channel.connect","data":{"token":"42"}}"#),
            Some(CommanderEvent::Auth(AuthStatus::Allowed {
                token: Some("42".into())
            }))
        );
        assert_eq!(
            translate(r#"{"event":"ms.channel.unauthorized"}"#),
            Some(CommanderEvent::Auth(AuthStatus::Denied))
        );
        assert_eq!(
            translate(r#"{"event":"ms.channel.timeOut"}"#),
            Some(CommanderEvent::Auth(AuthStatus::None))
        );
        assert_eq!(translate(r#"{"event":"ms.channel.clientConnect"}"#), None);
        assert_eq!(translate("garbage"), None);
    }

    #[test]
    fn handle_rejects_writes_after_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = CommanderHandle::from_parts(tx, CancellationToken::new());

        handle.send_key("KEY_MUTE").expect("queued");
        assert_eq!(rx.try_recv().expect("frame").params.data_of_cmd, "KEY_MUTE");

        handle.close();
        assert!(handle.is_closed());
        assert!(matches!(handle.send_key("KEY_MUTE"), Err(Error::ChannelClosed)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn handle_reports_closed_when_writer_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = CommanderHandle::from_parts(tx, CancellationToken::new());
        drop(rx);
        assert!(handle.is_closed());
        assert!(matches!(handle.send_text("hi"), Err(Error::ChannelClosed)));
    }
}
