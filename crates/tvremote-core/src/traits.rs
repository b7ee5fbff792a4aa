// ── Collaborator seams ──
//
// Everything the core needs from the outside world sits behind an
// object-safe trait so the engine and registry can be driven by fakes.
// Implementations that start I/O spawn their own tasks and hand back a
// channel; none of these methods block.

use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tvremote_api::channel;
use tvremote_api::{CommanderEvent, CommanderHandle, SearchEvent, SsdpSearcher, TransportConfig};

use crate::error::CoreError;
use crate::model::{Device, DeviceId};

// ── Discovery ───────────────────────────────────────────────────────

/// Starts a network search. Events flow until `cancel` fires.
pub trait DeviceSearch: Send + Sync {
    /// Errors mean listening could not begin at all.
    fn start(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<SearchEvent>, CoreError>;
}

impl DeviceSearch for SsdpSearcher {
    fn start(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<SearchEvent>, CoreError> {
        SsdpSearcher::start(self, cancel).map_err(CoreError::from)
    }
}

/// Host-side local network permission prompt.
pub trait NetworkPermission: Send + Sync {
    /// Answer on `reply`; dropping it counts as "denied".
    fn request_authorization(&self, reply: oneshot::Sender<bool>);
}

/// Hosts without a permission prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl NetworkPermission for AlwaysGranted {
    fn request_authorization(&self, reply: oneshot::Sender<bool>) {
        let _ = reply.send(true);
    }
}

// ── Remote channel ──────────────────────────────────────────────────

/// Opens the remote-control channel to a TV.
pub trait TvConnector: Send + Sync {
    fn open(
        &self,
        device: &Device,
        app_name: &str,
        token: Option<&SecretString>,
    ) -> Result<(CommanderHandle, mpsc::Receiver<CommanderEvent>), CoreError>;
}

/// WebSocket connector for real TVs.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    transport: TransportConfig,
    prefer_secure: bool,
}

impl WebSocketConnector {
    pub fn new(transport: TransportConfig, prefer_secure: bool) -> Self {
        Self {
            transport,
            prefer_secure,
        }
    }
}

impl TvConnector for WebSocketConnector {
    fn open(
        &self,
        device: &Device,
        app_name: &str,
        token: Option<&SecretString>,
    ) -> Result<(CommanderHandle, mpsc::Receiver<CommanderEvent>), CoreError> {
        // Older sets without token auth only listen on the plain port.
        let secure = self.prefer_secure && device.supports_token_auth();
        let url = tvremote_api::channel_url(
            &device.host(),
            app_name,
            token.map(|t| t.expose_secret()),
            secure,
        )
        .map_err(tvremote_api::Error::from)?;
        debug!(device = %device.id, secure, "opening remote channel");
        Ok(channel::open(url, &self.transport, CancellationToken::new())?)
    }
}

// ── Persistence ─────────────────────────────────────────────────────

/// Single-slot store for the last connected TV. Last write wins.
pub trait PersistenceGateway: Send + Sync {
    fn save_connected_device(&self, device: &Device) -> Result<(), CoreError>;
    fn restore_connected_device(&self) -> Result<Option<Device>, CoreError>;
    fn clear_connected_device(&self) -> Result<(), CoreError>;
}

/// In-process slot, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<Device>>,
}

impl PersistenceGateway for MemoryPersistence {
    fn save_connected_device(&self, device: &Device) -> Result<(), CoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(device.clone());
        Ok(())
    }

    fn restore_connected_device(&self) -> Result<Option<Device>, CoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn clear_connected_device(&self) -> Result<(), CoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Pairing tokens handed out by TVs, keyed by device.
pub trait PairingTokenStore: Send + Sync {
    fn load(&self, device: &DeviceId) -> Result<Option<SecretString>, CoreError>;
    fn save(&self, device: &DeviceId, token: &SecretString) -> Result<(), CoreError>;
    fn remove(&self, device: &DeviceId) -> Result<(), CoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<DeviceId, SecretString>,
}

impl PairingTokenStore for MemoryTokenStore {
    fn load(&self, device: &DeviceId) -> Result<Option<SecretString>, CoreError> {
        Ok(self
            .tokens
            .get(device)
            .map(|t| SecretString::from(t.expose_secret().to_owned())))
    }

    fn save(&self, device: &DeviceId, token: &SecretString) -> Result<(), CoreError> {
        self.tokens.insert(
            device.clone(),
            SecretString::from(token.expose_secret().to_owned()),
        );
        Ok(())
    }

    fn remove(&self, device: &DeviceId) -> Result<(), CoreError> {
        self.tokens.remove(device);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn tv(id: &str) -> Device {
        Device::new(id, "TV", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))
    }

    #[test]
    fn memory_persistence_is_single_slot() {
        let store = MemoryPersistence::default();
        assert!(store.restore_connected_device().unwrap().is_none());

        store.save_connected_device(&tv("a")).unwrap();
        store.save_connected_device(&tv("b")).unwrap();
        assert_eq!(store.restore_connected_device().unwrap().unwrap().id, DeviceId::from("b"));

        store.clear_connected_device().unwrap();
        assert!(store.restore_connected_device().unwrap().is_none());
    }

    #[test]
    fn memory_tokens_round_trip() {
        let store = MemoryTokenStore::default();
        let id = DeviceId::from("a");
        store.save(&id, &SecretString::from("1234".to_owned())).unwrap();
        assert_eq!(store.load(&id).unwrap().unwrap().expose_secret(), "1234");
        store.remove(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn always_granted_answers_yes() {
        let (tx, rx) = oneshot::channel();
        AlwaysGranted.request_authorization(tx);
        assert!(rx.await.unwrap());
    }
}
