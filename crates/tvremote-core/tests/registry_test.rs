// Connection registry behavior against a scripted remote channel.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use tvremote_api::{AuthStatus, CommanderEvent, CommanderHandle, RemoteRequest};
use tvremote_core::{
    ConnectionState, CoreError, Device, DeviceId, FailureReason, MemoryPersistence,
    MemoryTokenStore, PairingTokenStore, PersistenceGateway, Registry, RegistryServices,
    RemoteConfig, RemoteKey, TvConnector,
};

// ── Fakes ───────────────────────────────────────────────────────────

struct FakeChannel {
    device: DeviceId,
    token: Option<String>,
    requests: mpsc::UnboundedReceiver<RemoteRequest>,
    events: mpsc::Sender<CommanderEvent>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct FakeConnector {
    refuse: bool,
    channels: Mutex<Vec<FakeChannel>>,
}

impl FakeConnector {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    fn opens(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    fn device(&self, idx: usize) -> DeviceId {
        self.channels.lock().unwrap()[idx].device.clone()
    }

    fn token(&self, idx: usize) -> Option<String> {
        self.channels.lock().unwrap()[idx].token.clone()
    }

    fn is_closed(&self, idx: usize) -> bool {
        self.channels.lock().unwrap()[idx].cancel.is_cancelled()
    }

    fn emit(&self, idx: usize, event: CommanderEvent) {
        self.channels.lock().unwrap()[idx]
            .events
            .try_send(event)
            .unwrap();
    }

    /// Like `emit`, for a channel the registry may already have dropped.
    fn emit_late(&self, idx: usize, event: CommanderEvent) {
        let _ = self.channels.lock().unwrap()[idx].events.try_send(event);
    }

    fn written(&self, idx: usize) -> Vec<RemoteRequest> {
        let mut channels = self.channels.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(req) = channels[idx].requests.try_recv() {
            out.push(req);
        }
        out
    }

    fn total_written(&self) -> usize {
        (0..self.opens()).map(|i| self.written(i).len()).sum()
    }
}

impl TvConnector for FakeConnector {
    fn open(
        &self,
        device: &Device,
        _app_name: &str,
        token: Option<&SecretString>,
    ) -> Result<(CommanderHandle, mpsc::Receiver<CommanderEvent>), CoreError> {
        if self.refuse {
            return Err(CoreError::ConnectionFailed {
                address: device.address.to_string(),
                reason: "connection refused".into(),
            });
        }
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        self.channels.lock().unwrap().push(FakeChannel {
            device: device.id.clone(),
            token: token.map(|t| t.expose_secret().to_owned()),
            requests: req_rx,
            events: evt_tx,
            cancel: cancel.clone(),
        });
        Ok((CommanderHandle::from_parts(req_tx, cancel), evt_rx))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    registry: Registry,
    connector: Arc<FakeConnector>,
    persistence: Arc<MemoryPersistence>,
    tokens: Arc<MemoryTokenStore>,
    status: broadcast::Receiver<bool>,
}

fn services(
    connector: &Arc<FakeConnector>,
    persistence: &Arc<MemoryPersistence>,
    tokens: &Arc<MemoryTokenStore>,
) -> RegistryServices {
    RegistryServices::new(
        Arc::clone(connector) as Arc<dyn TvConnector>,
        Arc::clone(persistence) as Arc<dyn PersistenceGateway>,
    )
    .with_tokens(Arc::clone(tokens) as Arc<dyn PairingTokenStore>)
}

fn harness_with(connector: FakeConnector) -> Harness {
    let connector = Arc::new(connector);
    let persistence = Arc::new(MemoryPersistence::default());
    let tokens = Arc::new(MemoryTokenStore::default());
    let registry = Registry::new(
        RemoteConfig::default(),
        services(&connector, &persistence, &tokens),
    );
    let status = registry.connection_status();
    Harness {
        registry,
        connector,
        persistence,
        tokens,
        status,
    }
}

fn harness() -> Harness {
    harness_with(FakeConnector::default())
}

fn tv(id: &str, last: u8) -> Arc<Device> {
    Arc::new(Device::new(
        id,
        format!("TV {last}"),
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last)),
    ))
}

fn allow(token: Option<&str>) -> CommanderEvent {
    CommanderEvent::Auth(AuthStatus::Allowed {
        token: token.map(str::to_owned),
    })
}

async fn wait_for_state(registry: &Registry, f: impl Fn(&ConnectionState) -> bool) {
    let mut rx = registry.connection_state();
    rx.wait_for(|s| f(s)).await.unwrap();
}

fn drain(status: &mut broadcast::Receiver<bool>) -> Vec<bool> {
    let mut out = Vec::new();
    while let Ok(v) = status.try_recv() {
        out.push(v);
    }
    out
}

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_allowed_persists_then_connects() {
    let mut h = harness();
    let tv1 = tv("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73", 20);

    h.registry.connect(Arc::clone(&tv1)).await.unwrap();
    assert!(matches!(
        h.registry.current_state(),
        ConnectionState::AuthPending { ref target } if target.id == tv1.id
    ));
    assert!(h.registry.current_device().is_none());

    h.connector.emit(0, allow(Some("token-1")));
    let connected = h.registry.wait_settled().await.unwrap();
    assert_eq!(connected.id, tv1.id);

    assert_eq!(drain(&mut h.status), vec![true]);
    assert_eq!(
        h.persistence.restore_connected_device().unwrap().unwrap().id,
        tv1.id
    );
    assert_eq!(
        h.tokens.load(&tv1.id).unwrap().unwrap().expose_secret(),
        "token-1"
    );
    assert!(h.registry.is_connected());
    assert_eq!(h.registry.current_device().unwrap().id, tv1.id);
}

#[tokio::test]
async fn test_denied_never_connects() {
    let mut h = harness();
    let tv1 = tv("tv-1", 20);

    h.registry.connect(Arc::clone(&tv1)).await.unwrap();
    h.connector.emit(0, CommanderEvent::Auth(AuthStatus::Denied));

    let err = h.registry.wait_settled().await.unwrap_err();
    assert!(matches!(err, CoreError::AuthDenied { .. }));
    assert!(matches!(
        h.registry.current_state(),
        ConnectionState::Failed { reason: FailureReason::AuthDenied, .. }
    ));
    assert!(drain(&mut h.status).is_empty());
    assert!(h.connector.is_closed(0));
    assert!(h.persistence.restore_connected_device().unwrap().is_none());
}

#[tokio::test]
async fn test_none_outcome_counts_as_denial() {
    let h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector.emit(0, CommanderEvent::Auth(AuthStatus::None));

    assert!(matches!(
        h.registry.wait_settled().await,
        Err(CoreError::AuthDenied { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_prompt_times_out() {
    let mut h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();

    tokio::time::advance(Duration::from_secs(29)).await;
    tokio::task::yield_now().await;
    assert!(matches!(
        h.registry.current_state(),
        ConnectionState::AuthPending { .. }
    ));

    tokio::time::advance(Duration::from_secs(2)).await;
    match h.registry.wait_settled().await {
        Err(CoreError::AuthTimedOut { timeout_secs, .. }) => assert_eq!(timeout_secs, 30),
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.connector.is_closed(0));
    assert!(drain(&mut h.status).is_empty());
}

#[tokio::test]
async fn test_unreachable_tv_fails_attempt() {
    let h = harness_with(FakeConnector::refusing());
    let err = h.registry.connect(tv("tv-1", 20)).await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    assert!(matches!(
        h.registry.current_state(),
        ConnectionState::Failed {
            reason: FailureReason::Unreachable(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_channel_error_before_pairing_fails_attempt() {
    let h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector
        .emit(0, CommanderEvent::Error("connection refused".into()));
    h.connector.emit(0, CommanderEvent::Disconnected);

    match h.registry.wait_settled().await {
        Err(CoreError::ConnectionFailed { reason, .. }) => {
            assert_eq!(reason, "connection refused");
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ── Single active session ───────────────────────────────────────────

#[tokio::test]
async fn test_back_to_back_connects_leave_one_session() {
    let h = harness();
    let a = tv("tv-a", 20);
    let b = tv("tv-b", 21);

    h.registry.connect(Arc::clone(&a)).await.unwrap();
    h.registry.connect(Arc::clone(&b)).await.unwrap();

    assert_eq!(h.connector.opens(), 2);
    assert_eq!(h.connector.device(0), a.id);
    assert_eq!(h.connector.device(1), b.id);
    assert!(h.connector.is_closed(0));
    assert!(!h.connector.is_closed(1));

    // A late answer from the replaced TV is ignored.
    h.connector.emit_late(0, allow(None));
    tokio::task::yield_now().await;
    assert_eq!(h.registry.current_state().target().unwrap().id, b.id);
    assert!(!h.registry.is_connected());
}

#[tokio::test]
async fn test_switching_tvs_emits_false_then_true() {
    let mut h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector.emit(0, allow(None));
    h.registry.wait_settled().await.unwrap();
    assert_eq!(drain(&mut h.status), vec![true]);

    let tv2 = tv("tv-2", 21);
    h.registry.connect(Arc::clone(&tv2)).await.unwrap();
    assert!(h.connector.is_closed(0));
    h.connector.emit(1, allow(None));
    assert_eq!(h.registry.wait_settled().await.unwrap().id, tv2.id);

    assert_eq!(drain(&mut h.status), vec![false, true]);
    assert_eq!(
        h.persistence.restore_connected_device().unwrap().unwrap().id,
        tv2.id
    );
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_while_disconnected_writes_nothing() {
    let h = harness();
    let err = h.registry.send_command(RemoteKey::VolumeUp).await.unwrap_err();
    assert!(matches!(err, CoreError::NotConnected));
    assert!(matches!(
        h.registry.send_text("hi").await,
        Err(CoreError::NotConnected)
    ));
    assert_eq!(h.connector.opens(), 0);
}

#[tokio::test]
async fn test_send_while_pairing_writes_nothing() {
    let h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    assert!(matches!(
        h.registry.send_command(RemoteKey::VolumeUp).await,
        Err(CoreError::NotConnected)
    ));
    assert_eq!(h.connector.total_written(), 0);
}

#[tokio::test]
async fn test_send_text_and_keys_while_connected() {
    let h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector.emit(0, allow(None));
    h.registry.wait_settled().await.unwrap();

    h.registry.send_text("hello").await.unwrap();
    h.registry.send_command(RemoteKey::VolumeUp).await.unwrap();

    let written = h.connector.written(0);
    assert_eq!(written.len(), 2);
    assert_eq!(written[0], RemoteRequest::input_text("hello"));
    assert_eq!(written[1], RemoteRequest::key_click("KEY_VOLUP"));
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_drop_disconnects_without_retry() {
    let mut h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector.emit(0, allow(None));
    h.registry.wait_settled().await.unwrap();

    h.connector.emit(0, CommanderEvent::Disconnected);
    wait_for_state(&h.registry, |s| *s == ConnectionState::Disconnected).await;

    assert_eq!(drain(&mut h.status), vec![true, false]);
    assert_eq!(h.connector.opens(), 1);
    assert!(matches!(
        h.registry.send_command(RemoteKey::Mute).await,
        Err(CoreError::NotConnected)
    ));
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let mut h = harness();
    h.registry.connect(tv("tv-1", 20)).await.unwrap();
    h.connector.emit(0, allow(None));
    h.registry.wait_settled().await.unwrap();

    h.registry.disconnect().await.unwrap();
    h.registry.disconnect().await.unwrap();

    assert!(h.connector.is_closed(0));
    assert_eq!(h.registry.current_state(), ConnectionState::Disconnected);
    assert_eq!(drain(&mut h.status), vec![true, false]);
}

// ── Restore on launch ───────────────────────────────────────────────

#[tokio::test]
async fn test_restart_reconnects_with_saved_device_and_token() {
    let connector = Arc::new(FakeConnector::default());
    let persistence = Arc::new(MemoryPersistence::default());
    let tokens = Arc::new(MemoryTokenStore::default());

    // First run: pair with tv1.
    let first = Registry::new(
        RemoteConfig::default(),
        services(&connector, &persistence, &tokens),
    );
    let tv1 = tv("tv-1", 20);
    first.connect(Arc::clone(&tv1)).await.unwrap();
    connector.emit(0, allow(Some("paired")));
    first.wait_settled().await.unwrap();
    first.shutdown();

    // Second run: nothing but startup.
    let second = Registry::start(
        RemoteConfig::default(),
        services(&connector, &persistence, &tokens),
    )
    .await;
    assert_eq!(connector.opens(), 2);
    assert_eq!(connector.device(1), tv1.id);
    assert_eq!(connector.token(1).as_deref(), Some("paired"));

    connector.emit(1, allow(None));
    assert_eq!(second.wait_settled().await.unwrap().id, tv1.id);
}

#[tokio::test]
async fn test_start_without_saved_device_stays_disconnected() {
    let h = harness();
    let registry = Registry::start(
        RemoteConfig::default(),
        services(&h.connector, &h.persistence, &h.tokens),
    )
    .await;
    assert_eq!(registry.current_state(), ConnectionState::Disconnected);
    assert_eq!(h.connector.opens(), 0);
}
