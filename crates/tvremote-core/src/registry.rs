// ── Connection registry ──
//
// The process-wide authority for "which TV is connected". Construct one
// at startup and hand clones to every consumer. A single actor task owns
// the active `Session` and is the only writer of `ConnectionState`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::RemoteKey;
use crate::config::RemoteConfig;
use crate::error::CoreError;
use crate::model::Device;
use crate::session::{AuthOutcome, Session, SessionEvent, SessionHandle};
use crate::traits::{
    MemoryTokenStore, PairingTokenStore, PersistenceGateway, TvConnector, WebSocketConnector,
};

const COMMAND_CHANNEL_SIZE: usize = 64;
const STATUS_CHANNEL_SIZE: usize = 32;

// ── ConnectionState ──────────────────────────────────────────────

/// Why a connection attempt ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The user rejected the prompt, or the TV answered `none`.
    AuthDenied,
    /// Nobody answered the prompt in time.
    AuthTimedOut,
    /// The channel never came up.
    Unreachable(String),
}

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting {
        target: Arc<Device>,
    },
    AuthPending {
        target: Arc<Device>,
    },
    Connected {
        target: Arc<Device>,
        session: SessionHandle,
    },
    Failed {
        target: Arc<Device>,
        reason: FailureReason,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn target(&self) -> Option<&Arc<Device>> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { target }
            | Self::AuthPending { target }
            | Self::Connected { target, .. }
            | Self::Failed { target, .. } => Some(target),
        }
    }
}

// ── Services ─────────────────────────────────────────────────────

/// Collaborators the registry depends on.
#[derive(Clone)]
pub struct RegistryServices {
    pub connector: Arc<dyn TvConnector>,
    pub persistence: Arc<dyn PersistenceGateway>,
    pub tokens: Arc<dyn PairingTokenStore>,
}

impl RegistryServices {
    /// Pairing tokens are kept in memory unless replaced with
    /// [`with_tokens`](Self::with_tokens).
    pub fn new(connector: Arc<dyn TvConnector>, persistence: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            connector,
            persistence,
            tokens: Arc::new(MemoryTokenStore::default()),
        }
    }

    /// WebSocket connector configured from `config`.
    pub fn websocket(config: &RemoteConfig, persistence: Arc<dyn PersistenceGateway>) -> Self {
        let connector = WebSocketConnector::new(config.transport(), config.secure_channel);
        Self::new(Arc::new(connector), persistence)
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<dyn PairingTokenStore>) -> Self {
        self.tokens = tokens;
        self
    }
}

// ── Commands ─────────────────────────────────────────────────────

enum RegistryCommand {
    Connect(Arc<Device>),
    Disconnect,
    SendKey(RemoteKey),
    SendText(String),
}

struct RegistryEnvelope {
    command: RegistryCommand,
    response_tx: oneshot::Sender<Result<(), CoreError>>,
}

// ── Registry ─────────────────────────────────────────────────────

/// Cheaply cloneable handle to the connection registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    persistence: Arc<dyn PersistenceGateway>,
    pairing_timeout: Option<Duration>,
    state: watch::Sender<ConnectionState>,
    status: broadcast::Sender<bool>,
    command_tx: mpsc::Sender<RegistryEnvelope>,
    cancel: CancellationToken,
}

impl Registry {
    /// Spawn the registry actor. Does not connect; see
    /// [`start`](Self::start) for restore-on-launch. Must be called
    /// inside a Tokio runtime.
    pub fn new(config: RemoteConfig, services: RegistryServices) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (status, _) = broadcast::channel(STATUS_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let pairing_timeout = config.pairing_timeout;

        let actor = RegistryActor {
            app_name: config.app_name,
            pairing_timeout,
            services: services.clone(),
            state: state.clone(),
            status: status.clone(),
            connected: false,
            cancel: cancel.clone(),
            active: None,
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            inner: Arc::new(RegistryInner {
                persistence: services.persistence,
                pairing_timeout,
                state,
                status,
                command_tx,
                cancel,
            }),
        }
    }

    /// Create the registry and reconnect to the last paired TV, if any.
    ///
    /// A failed restore is logged and otherwise invisible: the registry
    /// simply ends up `Failed` or `Disconnected`.
    pub async fn start(config: RemoteConfig, services: RegistryServices) -> Self {
        let registry = Self::new(config, services);
        match registry.restore().await {
            Ok(Some(device)) => info!(device = %device.id, "reconnecting to last TV"),
            Ok(None) => debug!("no saved TV"),
            Err(e) => warn!(error = %e, "could not restore last TV"),
        }
        registry
    }

    /// Read the persisted TV and connect to it.
    pub async fn restore(&self) -> Result<Option<Arc<Device>>, CoreError> {
        let Some(device) = self.inner.persistence.restore_connected_device()? else {
            return Ok(None);
        };
        let device = Arc::new(device);
        self.connect(Arc::clone(&device)).await?;
        Ok(Some(device))
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Start connecting to `device`, replacing any existing session.
    ///
    /// Returns once the channel is opening; the state is then
    /// `AuthPending` and the handshake result arrives on the state
    /// stream.
    pub async fn connect(&self, device: Arc<Device>) -> Result<(), CoreError> {
        self.execute(RegistryCommand::Connect(device)).await
    }

    /// Tear down the active session. Idempotent.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        self.execute(RegistryCommand::Disconnect).await
    }

    /// Send one key. Fails with `NotConnected`, writing nothing, unless
    /// the state is `Connected`.
    pub async fn send_command(&self, key: RemoteKey) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.execute(RegistryCommand::SendKey(key)).await
    }

    /// Send a text-input payload.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_connected()?;
        self.execute(RegistryCommand::SendText(text.into())).await
    }

    /// Stop the actor, closing any session.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    fn ensure_connected(&self) -> Result<(), CoreError> {
        if self.inner.state.borrow().is_connected() {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    async fn execute(&self, command: RegistryCommand) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(RegistryEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Internal("connection registry stopped".into()))?;
        rx.await
            .map_err(|_| CoreError::Internal("connection registry stopped".into()))?
    }

    /// Wait until the current attempt settles.
    ///
    /// Resolves with the TV on `Connected`; maps `Failed` and
    /// `Disconnected` to the matching error.
    pub async fn wait_settled(&self) -> Result<Arc<Device>, CoreError> {
        let mut rx = self.inner.state.subscribe();
        let settled = rx
            .wait_for(|s| {
                !matches!(
                    s,
                    ConnectionState::Connecting { .. } | ConnectionState::AuthPending { .. }
                )
            })
            .await
            .map_err(|_| CoreError::Internal("connection registry stopped".into()))?
            .clone();

        match settled {
            ConnectionState::Connected { target, .. } => Ok(target),
            ConnectionState::Failed { target, reason } => Err(self.failure_error(&target, reason)),
            _ => Err(CoreError::NotConnected),
        }
    }

    fn failure_error(&self, target: &Device, reason: FailureReason) -> CoreError {
        match reason {
            FailureReason::AuthDenied => CoreError::AuthDenied {
                device: target.display_name(),
            },
            FailureReason::AuthTimedOut => CoreError::AuthTimedOut {
                device: target.display_name(),
                timeout_secs: self.inner.pairing_timeout.map_or(0, |t| t.as_secs()),
            },
            FailureReason::Unreachable(reason) => CoreError::ConnectionFailed {
                address: target.address.to_string(),
                reason,
            },
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// Subscribe to the full state.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Connected/disconnected edges. Never repeats a value.
    pub fn connection_status(&self) -> broadcast::Receiver<bool> {
        self.inner.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    /// The connected TV, if any.
    pub fn current_device(&self) -> Option<Arc<Device>> {
        match &*self.inner.state.borrow() {
            ConnectionState::Connected { target, .. } => Some(Arc::clone(target)),
            _ => None,
        }
    }
}

// ── Actor ────────────────────────────────────────────────────────

struct ActiveSession {
    session: Session,
    /// Set while the pairing prompt is open.
    pairing_deadline: Option<Instant>,
    authorized: bool,
}

struct RegistryActor {
    app_name: String,
    pairing_timeout: Option<Duration>,
    services: RegistryServices,
    state: watch::Sender<ConnectionState>,
    status: broadcast::Sender<bool>,
    /// Last value published on `status`.
    connected: bool,
    cancel: CancellationToken,
    active: Option<ActiveSession>,
}

impl RegistryActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RegistryEnvelope>) {
        loop {
            let deadline = self.active.as_ref().and_then(|a| a.pairing_deadline);
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    let result = self.handle(envelope.command);
                    let _ = envelope.response_tx.send(result);
                }
                event = next_session_event(&mut self.active) => self.on_session_event(event),
                () = sleep_until_opt(deadline) => self.on_pairing_timeout(),
            }
        }

        if let Some(active) = self.active.take() {
            active.session.disconnect();
        }
        debug!("connection registry exiting");
    }

    fn handle(&mut self, command: RegistryCommand) -> Result<(), CoreError> {
        match command {
            RegistryCommand::Connect(device) => self.connect(device),
            RegistryCommand::Disconnect => {
                self.teardown();
                Ok(())
            }
            RegistryCommand::SendKey(key) => self.authorized_session()?.send_command(key),
            RegistryCommand::SendText(text) => self.authorized_session()?.send_text(&text),
        }
    }

    fn connect(&mut self, device: Arc<Device>) -> Result<(), CoreError> {
        self.teardown();

        info!(device = %device.id, address = %device.address, "connecting");
        self.set_state(ConnectionState::Connecting {
            target: Arc::clone(&device),
        });

        let token = match self.services.tokens.load(&device.id) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "pairing token unavailable, TV will prompt");
                None
            }
        };

        let session = match Session::connect(
            self.services.connector.as_ref(),
            Arc::clone(&device),
            &self.app_name,
            token.as_ref(),
        ) {
            Ok(session) => session,
            Err(e) => {
                warn!(device = %device.id, error = %e, "could not open remote channel");
                self.set_state(ConnectionState::Failed {
                    target: device,
                    reason: FailureReason::Unreachable(e.to_string()),
                });
                return Err(e);
            }
        };

        self.active = Some(ActiveSession {
            session,
            pairing_deadline: self.pairing_timeout.map(|t| Instant::now() + t),
            authorized: false,
        });
        self.set_state(ConnectionState::AuthPending { target: device });
        Ok(())
    }

    /// Close any session and land in `Disconnected`.
    fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            active.session.disconnect();
        }
        self.set_state(ConnectionState::Disconnected);
        self.publish_connected(false);
    }

    fn authorized_session(&self) -> Result<&Session, CoreError> {
        match &self.active {
            Some(active) if active.authorized => Ok(&active.session),
            _ => Err(CoreError::NotConnected),
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let device = Arc::clone(active.session.device());

        match event {
            SessionEvent::Auth(AuthOutcome::Allowed { token }) => {
                if active.authorized {
                    debug!("duplicate pairing approval ignored");
                    return;
                }
                active.authorized = true;
                active.pairing_deadline = None;
                let handle = active.session.handle().clone();

                if let Err(e) = self.services.persistence.save_connected_device(&device) {
                    warn!(error = %e, "could not persist connected TV");
                }
                if let Some(token) = token {
                    if let Err(e) = self.services.tokens.save(&device.id, &token) {
                        warn!(error = %e, "could not store pairing token");
                    }
                }

                info!(device = %device.id, session = %handle, "connected");
                self.set_state(ConnectionState::Connected {
                    target: device,
                    session: handle,
                });
                self.publish_connected(true);
            }
            SessionEvent::Auth(outcome @ (AuthOutcome::Denied | AuthOutcome::None)) => {
                if active.authorized {
                    debug!(?outcome, "late pairing answer ignored");
                    return;
                }
                warn!(device = %device.id, ?outcome, "pairing not approved");
                self.drop_active();
                self.set_state(ConnectionState::Failed {
                    target: device,
                    reason: FailureReason::AuthDenied,
                });
            }
            SessionEvent::Dropped { reason } => {
                let was_authorized = active.authorized;
                self.active = None;
                if was_authorized {
                    warn!(device = %device.id, %reason, "connection dropped");
                    self.set_state(ConnectionState::Disconnected);
                    self.publish_connected(false);
                } else {
                    warn!(device = %device.id, %reason, "channel failed before pairing");
                    self.set_state(ConnectionState::Failed {
                        target: device,
                        reason: FailureReason::Unreachable(reason),
                    });
                }
            }
        }
    }

    fn on_pairing_timeout(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let device = Arc::clone(active.session.device());
        warn!(device = %device.id, "pairing prompt timed out");
        active.session.disconnect();
        self.set_state(ConnectionState::Failed {
            target: device,
            reason: FailureReason::AuthTimedOut,
        });
    }

    fn drop_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.session.disconnect();
        }
    }

    fn set_state(&self, state: ConnectionState) {
        debug!(?state, "connection state");
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn publish_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        let _ = self.status.send(connected);
    }
}

async fn next_session_event(active: &mut Option<ActiveSession>) -> SessionEvent {
    match active {
        Some(active) => active.session.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
