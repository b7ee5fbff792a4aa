// tvremote-core: Discovery, pairing and command dispatch between tvremote-api and consumers.

pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;
pub mod stream;
pub mod traits;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::RemoteKey;
pub use config::{RemoteConfig, TlsVerification};
pub use discovery::{DiscoveryEngine, DiscoverySignal, DiscoveryState, probe_device};
pub use error::CoreError;
pub use registry::{ConnectionState, FailureReason, Registry, RegistryServices};
pub use session::{AuthOutcome, Session, SessionEvent, SessionHandle};
pub use store::DeviceSnapshot;
pub use stream::DeviceStream;
pub use traits::{
    AlwaysGranted, DeviceSearch, MemoryPersistence, MemoryTokenStore, NetworkPermission,
    PairingTokenStore, PersistenceGateway, TvConnector, WebSocketConnector,
};

pub use model::{Device, DeviceFeatures, DeviceId, MacAddress, VendorInfo, decode_entities};
