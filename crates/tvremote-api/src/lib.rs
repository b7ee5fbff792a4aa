// tvremote-api: Async Rust client for the Samsung Smart TV local protocols (SSDP + remote channel)

pub mod channel;
pub mod error;
pub mod info;
pub mod protocol;
pub mod ssdp;
pub mod transport;

pub use channel::{AuthStatus, CommanderEvent, CommanderHandle};
pub use error::Error;
pub use info::{TvDeviceInfo, TvInfo};
pub use protocol::{ChannelEvent, RemoteRequest, channel_url};
pub use ssdp::{SearchConfig, SearchEvent, SsdpSearcher};
pub use transport::{TlsMode, TransportConfig};
