// ── Connection session ──
//
// One authenticated remote channel to one TV. The registry owns at most
// one `Session`; nothing else ever holds it. Dropping a session closes
// its channel.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use tvremote_api::{AuthStatus, CommanderEvent, CommanderHandle};

use crate::command::RemoteKey;
use crate::error::CoreError;
use crate::model::Device;
use crate::traits::TvConnector;

/// Identifies one session for its whole life. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of the TV-side pairing prompt.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Approved; the TV may have issued a token for next time.
    Allowed { token: Option<SecretString> },
    Denied,
    /// The prompt expired or the TV answered with something unknown.
    None,
}

/// What a session reports to its owner.
#[derive(Debug)]
pub enum SessionEvent {
    Auth(AuthOutcome),
    /// The transport is gone. Reported once.
    Dropped { reason: String },
}

/// A live remote channel to one TV.
pub struct Session {
    handle: SessionHandle,
    device: Arc<Device>,
    commander: CommanderHandle,
    events: mpsc::Receiver<CommanderEvent>,
    last_error: Option<String>,
    dropped: bool,
    /// Set by `disconnect`; sends after it are `NotConnected`.
    closed: AtomicBool,
}

impl Session {
    /// Open the channel and start the pairing handshake.
    ///
    /// Returns as soon as the transport task is running; the outcome
    /// arrives through [`next_event`](Self::next_event).
    pub fn connect(
        connector: &dyn TvConnector,
        device: Arc<Device>,
        app_name: &str,
        token: Option<&SecretString>,
    ) -> Result<Self, CoreError> {
        let (commander, events) = connector.open(&device, app_name, token)?;
        let handle = SessionHandle::new();
        debug!(session = %handle, device = %device.id, "session opened");
        Ok(Self {
            handle,
            device,
            commander,
            events,
            last_error: None,
            dropped: false,
            closed: AtomicBool::new(false),
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Queue one key click on the channel.
    pub fn send_command(&self, key: RemoteKey) -> Result<(), CoreError> {
        self.ensure_open()?;
        trace!(session = %self.handle, key = %key, "send key");
        self.commander.send_key(key.code()).map_err(CoreError::from)
    }

    /// Queue a text-input payload. No length check.
    pub fn send_text(&self, text: &str) -> Result<(), CoreError> {
        self.ensure_open()?;
        trace!(session = %self.handle, len = text.len(), "send text");
        self.commander.send_text(text).map_err(CoreError::from)
    }

    /// Close the channel. Later sends fail with `NotConnected`.
    pub fn disconnect(&self) {
        debug!(session = %self.handle, "session closed");
        self.closed.store(true, Ordering::Release);
        self.commander.close();
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(CoreError::NotConnected)
        } else {
            Ok(())
        }
    }

    /// Wait for the next handshake or transport event.
    ///
    /// Pends forever once the transport has been reported dropped.
    pub async fn next_event(&mut self) -> SessionEvent {
        if self.dropped {
            return std::future::pending().await;
        }
        loop {
            match self.events.recv().await {
                Some(CommanderEvent::Auth(status)) => {
                    return SessionEvent::Auth(match status {
                        AuthStatus::Allowed { token } => AuthOutcome::Allowed {
                            token: token.map(SecretString::from),
                        },
                        AuthStatus::Denied => AuthOutcome::Denied,
                        AuthStatus::None => AuthOutcome::None,
                    });
                }
                Some(CommanderEvent::Error(reason)) => self.last_error = Some(reason),
                Some(CommanderEvent::Disconnected) | None => {
                    self.dropped = true;
                    return SessionEvent::Dropped {
                        reason: self
                            .last_error
                            .take()
                            .unwrap_or_else(|| "connection closed by TV".into()),
                    };
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.commander.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("device", &self.device.id)
            .finish_non_exhaustive()
    }
}
