// ── Discovery engine ──
//
// Runs one bounded search sweep at a time. A single actor task owns the
// sweep, so every write to the device set and to `DiscoveryState`
// happens on one context. Callers talk to it through a command channel
// and observe it through watch/broadcast channels.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tvremote_api::{SearchConfig, SearchEvent, SsdpSearcher, info};

use crate::config::RemoteConfig;
use crate::error::CoreError;
use crate::model::{Device, DeviceId};
use crate::store::{DeviceSet, DeviceSnapshot};
use crate::stream::DeviceStream;
use crate::traits::{AlwaysGranted, DeviceSearch, NetworkPermission};

const COMMAND_CHANNEL_SIZE: usize = 16;
const SIGNAL_CHANNEL_SIZE: usize = 16;

// ── Observable types ─────────────────────────────────────────────

/// What the engine is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Searching,
    /// The last sweep ended with at least one TV.
    DevicesFound(DeviceSnapshot),
    /// The last sweep ran its full window and found nothing.
    TimedOutEmpty,
    /// Listening could not start; the host denied local network access.
    Unavailable { reason: String },
}

/// Terminal outcome of a sweep. At most one per sweep; exactly one when
/// the search window elapses or listening fails to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySignal {
    DevicesFound(DeviceSnapshot),
    NotFound,
    Unavailable { reason: String },
}

// ── Commands ─────────────────────────────────────────────────────

enum EngineCommand {
    StartSearch,
    StopSearch,
    Reload,
}

struct EngineEnvelope {
    command: EngineCommand,
    response_tx: oneshot::Sender<Result<(), CoreError>>,
}

// ── DiscoveryEngine ──────────────────────────────────────────────

/// Handle to the discovery actor. Cheap to clone.
#[derive(Clone)]
pub struct DiscoveryEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    devices: Arc<DeviceSet>,
    state: watch::Sender<DiscoveryState>,
    signals: broadcast::Sender<DiscoverySignal>,
    command_tx: mpsc::Sender<EngineEnvelope>,
    cancel: CancellationToken,
}

impl DiscoveryEngine {
    /// Spawn the engine actor. Must be called inside a Tokio runtime.
    pub fn new(
        config: &RemoteConfig,
        search: Arc<dyn DeviceSearch>,
        permission: Arc<dyn NetworkPermission>,
    ) -> Self {
        let devices = Arc::new(DeviceSet::new());
        let (state, _) = watch::channel(DiscoveryState::Idle);
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let actor = EngineActor {
            search,
            permission,
            search_timeout: config.search_timeout,
            devices: Arc::clone(&devices),
            state: state.clone(),
            signals: signals.clone(),
            cancel: cancel.clone(),
            pending: None,
            sweep: None,
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            inner: Arc::new(EngineInner {
                devices,
                state,
                signals,
                command_tx,
                cancel,
            }),
        }
    }

    /// Engine backed by SSDP with no permission prompt.
    pub fn ssdp(config: &RemoteConfig) -> Result<Self, CoreError> {
        let searcher = SsdpSearcher::new(&config.transport(), SearchConfig::default())?;
        Ok(Self::new(config, Arc::new(searcher), Arc::new(AlwaysGranted)))
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Begin a sweep. A no-op while one is already running: the result
    /// set and the timer are left alone.
    pub async fn start_search(&self) -> Result<(), CoreError> {
        self.execute(EngineCommand::StartSearch).await
    }

    /// Stop listening. The accumulated set is kept.
    pub async fn stop_search(&self) -> Result<(), CoreError> {
        self.execute(EngineCommand::StopSearch).await
    }

    /// Drop everything and start a fresh sweep.
    pub async fn reload(&self) -> Result<(), CoreError> {
        self.execute(EngineCommand::Reload).await
    }

    /// Stop the actor for good.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    async fn execute(&self, command: EngineCommand) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(EngineEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Internal("discovery engine stopped".into()))?;
        rx.await
            .map_err(|_| CoreError::Internal("discovery engine stopped".into()))?
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> watch::Receiver<DiscoveryState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> DiscoveryState {
        self.inner.state.borrow().clone()
    }

    /// Terminal sweep signals (`deviceNotFound` and friends).
    pub fn signals(&self) -> broadcast::Receiver<DiscoverySignal> {
        self.inner.signals.subscribe()
    }

    pub fn devices(&self) -> DeviceStream {
        DeviceStream::new(self.inner.devices.subscribe())
    }

    pub fn devices_snapshot(&self) -> DeviceSnapshot {
        self.inner.devices.snapshot()
    }

    pub fn device(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.inner.devices.get(id)
    }
}

/// Look up a TV at a known address without running a sweep.
pub async fn probe_device(config: &RemoteConfig, address: IpAddr) -> Result<Device, CoreError> {
    let http = config.transport().build_client()?;
    let tv = info::fetch_tv_info(&http, address).await?;
    debug!(%address, "probed TV directly");
    Ok(Device::from_info(address, tv))
}

// ── Actor ────────────────────────────────────────────────────────

type Responder = oneshot::Sender<Result<(), CoreError>>;

struct Sweep {
    cancel: CancellationToken,
    events: Option<mpsc::Receiver<SearchEvent>>,
    deadline: Instant,
}

/// A permission prompt that has not been answered yet. Every caller
/// asking to start while it is open waits on the same answer.
struct PendingPermission {
    reply: oneshot::Receiver<bool>,
    waiters: Vec<Responder>,
}

struct EngineActor {
    search: Arc<dyn DeviceSearch>,
    permission: Arc<dyn NetworkPermission>,
    search_timeout: Duration,
    devices: Arc<DeviceSet>,
    state: watch::Sender<DiscoveryState>,
    signals: broadcast::Sender<DiscoverySignal>,
    cancel: CancellationToken,
    pending: Option<PendingPermission>,
    sweep: Option<Sweep>,
}

impl EngineActor {
    async fn run(mut self, mut rx: mpsc::Receiver<EngineEnvelope>) {
        loop {
            let deadline = self.sweep.as_ref().map(|s| s.deadline);
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                granted = permission_reply(&mut self.pending) => self.on_permission(granted),
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    self.handle(envelope);
                }
                () = sleep_until_opt(deadline) => self.finish_sweep(),
                event = next_search_event(&mut self.sweep) => match event {
                    Some(event) => self.apply(event),
                    None => {
                        // Searcher ended early; keep the window open until the deadline.
                        if let Some(sweep) = self.sweep.as_mut() {
                            sweep.events = None;
                        }
                    }
                },
            }
        }

        if let Some(sweep) = self.sweep.take() {
            sweep.cancel.cancel();
        }
        debug!("discovery engine exiting");
    }

    fn handle(&mut self, envelope: EngineEnvelope) {
        let EngineEnvelope {
            command,
            response_tx,
        } = envelope;
        match command {
            EngineCommand::StartSearch => self.request_start(response_tx),
            EngineCommand::StopSearch => {
                self.stop_sweep();
                let _ = response_tx.send(Ok(()));
            }
            EngineCommand::Reload => {
                if let Some(sweep) = self.sweep.take() {
                    sweep.cancel.cancel();
                }
                self.devices.clear();
                self.set_state(DiscoveryState::Idle);
                self.request_start(response_tx);
            }
        }
    }

    /// Ask the host for network access. The caller is answered once the
    /// prompt resolves, so the actor keeps serving other commands meanwhile.
    fn request_start(&mut self, responder: Responder) {
        if self.sweep.is_some() {
            trace!("search already running");
            let _ = responder.send(Ok(()));
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            trace!("permission prompt already open");
            pending.waiters.push(responder);
            return;
        }

        let (tx, rx) = oneshot::channel();
        self.permission.request_authorization(tx);
        self.pending = Some(PendingPermission {
            reply: rx,
            waiters: vec![responder],
        });
    }

    fn on_permission(&mut self, granted: bool) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let outcome = if granted {
            self.begin_sweep()
        } else {
            Err("local network permission denied".to_owned())
        };
        if let Err(ref reason) = outcome {
            self.mark_unavailable(reason);
        }

        for waiter in pending.waiters {
            let result = outcome
                .clone()
                .map_err(|reason| CoreError::DiscoveryUnavailable { reason });
            let _ = waiter.send(result);
        }
    }

    fn begin_sweep(&mut self) -> Result<(), String> {
        self.devices.clear();
        let cancel = self.cancel.child_token();
        let events = self.search.start(cancel.clone()).map_err(|e| e.to_string())?;

        self.sweep = Some(Sweep {
            cancel,
            events: Some(events),
            deadline: Instant::now() + self.search_timeout,
        });
        self.set_state(DiscoveryState::Searching);
        info!(timeout_secs = self.search_timeout.as_secs(), "search started");
        Ok(())
    }

    /// Stopping while the prompt is open abandons it; a late answer is ignored.
    fn stop_sweep(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("search stopped before permission was answered");
            for waiter in pending.waiters {
                let _ = waiter.send(Ok(()));
            }
        }

        let Some(sweep) = self.sweep.take() else {
            return;
        };
        sweep.cancel.cancel();
        let snapshot = self.devices.snapshot();
        debug!(found = snapshot.len(), "search stopped");
        if snapshot.is_empty() {
            self.set_state(DiscoveryState::Idle);
        } else {
            self.set_state(DiscoveryState::DevicesFound(snapshot));
        }
    }

    fn finish_sweep(&mut self) {
        let Some(sweep) = self.sweep.take() else {
            return;
        };
        sweep.cancel.cancel();

        let snapshot = self.devices.snapshot();
        if snapshot.is_empty() {
            info!("search window elapsed, no TV found");
            self.set_state(DiscoveryState::TimedOutEmpty);
            let _ = self.signals.send(DiscoverySignal::NotFound);
        } else {
            info!(found = snapshot.len(), "search window elapsed");
            self.set_state(DiscoveryState::DevicesFound(Arc::clone(&snapshot)));
            let _ = self.signals.send(DiscoverySignal::DevicesFound(snapshot));
        }
    }

    fn apply(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Found { address, info } => {
                let device = Device::from_info(address, *info);
                debug!(id = %device.id, %address, "TV found");
                self.devices.upsert(device);
            }
            SearchEvent::Lost { id } => {
                let id = DeviceId::from(id);
                if self.devices.remove(&id).is_some() {
                    debug!(%id, "TV left the network");
                }
            }
        }
    }

    fn mark_unavailable(&mut self, reason: &str) {
        warn!(%reason, "discovery unavailable");
        self.set_state(DiscoveryState::Unavailable {
            reason: reason.to_owned(),
        });
        let _ = self.signals.send(DiscoverySignal::Unavailable {
            reason: reason.to_owned(),
        });
    }

    fn set_state(&self, state: DiscoveryState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

/// Resolves with the host's answer; a dropped sender counts as "denied".
async fn permission_reply(pending: &mut Option<PendingPermission>) -> bool {
    match pending.as_mut() {
        Some(p) => (&mut p.reply).await.unwrap_or(false),
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_search_event(sweep: &mut Option<Sweep>) -> Option<SearchEvent> {
    match sweep.as_mut().and_then(|s| s.events.as_mut()) {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
