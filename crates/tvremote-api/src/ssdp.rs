//! SSDP search for Samsung remote-control receivers.
//!
//! Sends a multicast `M-SEARCH` for the Samsung remote-control receiver
//! URN and listens for unicast responses plus multicast `NOTIFY`
//! announcements. Every TV that answers gets its info document fetched
//! once per search; `ssdp:byebye` announcements surface as
//! [`SearchEvent::Lost`].
//!
//! ```rust,ignore
//! let searcher = SsdpSearcher::new(TransportConfig::default(), SearchConfig::default())?;
//! let cancel = CancellationToken::new();
//! let mut rx = searcher.start(cancel.clone())?;
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::info::{TvInfo, fetch_tv_info};
use crate::transport::TransportConfig;

/// Search target advertised by Samsung TVs that accept remote control.
pub const SAMSUNG_REMOTE_URN: &str = "urn:samsung.com:device:RemoteControlReceiver:1";

const SSDP_MULTICAST: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;
const EVENT_CHANNEL_SIZE: usize = 64;
const DATAGRAM_SIZE: usize = 2048;

// ── Events ───────────────────────────────────────────────────────────

/// A network event raised while a search is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// A TV answered and its info document was fetched.
    Found { address: IpAddr, info: Box<TvInfo> },
    /// A TV announced it is leaving the network.
    Lost { id: String },
}

// ── SearchConfig ─────────────────────────────────────────────────────

/// Tuning for a single search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Search target sent in `ST` and matched against `NT`.
    pub search_target: String,
    /// `MX` header: seconds a TV may wait before answering.
    pub mx_secs: u8,
    /// How many `M-SEARCH` datagrams are sent at start (UDP is lossy).
    pub probes: u8,
    /// Gap between probes.
    pub probe_interval: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_target: SAMSUNG_REMOTE_URN.into(),
            mx_secs: 2,
            probes: 3,
            probe_interval: Duration::from_millis(300),
        }
    }
}

// ── SsdpSearcher ─────────────────────────────────────────────────────

/// Multicast searcher. Cheap to clone; each [`start`](Self::start)
/// opens fresh sockets.
#[derive(Debug, Clone)]
pub struct SsdpSearcher {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SsdpSearcher {
    pub fn new(transport: &TransportConfig, config: SearchConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            config,
        })
    }

    /// Open the sockets and spawn the listener task.
    ///
    /// Socket errors are returned synchronously so callers can tell
    /// "no local network access" apart from "nothing answered". The
    /// listener stops when `cancel` fires or the receiver is dropped.
    pub fn start(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<SearchEvent>, Error> {
        let search_socket = StdUdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        search_socket.set_nonblocking(true)?;
        let search_socket = UdpSocket::from_std(search_socket)?;

        let notify_socket = match bind_notify_socket() {
            Ok(socket) => Some(socket),
            Err(e) => {
                debug!(error = %e, "NOTIFY listener unavailable, relying on search responses");
                None
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let task = SearchTask {
            http: self.http.clone(),
            config: self.config.clone(),
            tx,
            cancel,
            seen: HashSet::new(),
        };
        tokio::spawn(task.run(search_socket, notify_socket));
        Ok(rx)
    }
}

fn bind_notify_socket() -> Result<UdpSocket, Error> {
    let socket = StdUdpSocket::bind((Ipv4Addr::UNSPECIFIED, SSDP_PORT))?;
    socket.join_multicast_v4(&SSDP_MULTICAST, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket)?)
}

// ── Listener task ────────────────────────────────────────────────────

struct SearchTask {
    http: reqwest::Client,
    config: SearchConfig,
    tx: mpsc::Sender<SearchEvent>,
    cancel: CancellationToken,
    /// Addresses whose info fetch already started during this search.
    seen: HashSet<IpAddr>,
}

impl SearchTask {
    async fn run(mut self, search: UdpSocket, notify: Option<UdpSocket>) {
        let request = m_search_request(&self.config.search_target, self.config.mx_secs);
        let target = SocketAddr::from((SSDP_MULTICAST, SSDP_PORT));

        let mut probes_left = self.config.probes;
        let mut probe_timer = tokio::time::interval(self.config.probe_interval);
        let mut search_buf = [0u8; DATAGRAM_SIZE];
        let mut notify_buf = [0u8; DATAGRAM_SIZE];

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = self.tx.closed() => break,
                _ = probe_timer.tick(), if probes_left > 0 => {
                    probes_left -= 1;
                    if let Err(e) = search.send_to(request.as_bytes(), target).await {
                        warn!(error = %e, "M-SEARCH send failed");
                    } else {
                        trace!("M-SEARCH sent");
                    }
                }
                received = search.recv_from(&mut search_buf) => {
                    match received {
                        Ok((len, from)) => self.handle_datagram(&search_buf[..len], from),
                        Err(e) => debug!(error = %e, "search socket receive failed"),
                    }
                }
                received = recv_optional(notify.as_ref(), &mut notify_buf) => {
                    match received {
                        Ok((len, from)) => self.handle_datagram(&notify_buf[..len], from),
                        Err(e) => debug!(error = %e, "notify socket receive failed"),
                    }
                }
            }
        }
        debug!("SSDP listener exiting");
    }

    fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return;
        };
        let Some(message) = SsdpMessage::parse(text) else {
            return;
        };
        if !message.matches_target(&self.config.search_target) {
            return;
        }

        match message.kind {
            SsdpKind::Response | SsdpKind::Alive => {
                let address = message.location_host().unwrap_or_else(|| from.ip());
                if !self.seen.insert(address) {
                    return;
                }
                debug!(%address, "TV answered, fetching info");
                let http = self.http.clone();
                let tx = self.tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    let fetched = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        fetched = fetch_tv_info(&http, address) => fetched,
                    };
                    match fetched {
                        Ok(info) => {
                            let _ = tx
                                .send(SearchEvent::Found {
                                    address,
                                    info: Box::new(info),
                                })
                                .await;
                        }
                        Err(e) => warn!(%address, error = %e, "TV info fetch failed"),
                    }
                });
            }
            SsdpKind::ByeBye => {
                if let Some(id) = message.device_id() {
                    self.seen.remove(&from.ip());
                    debug!(%id, "TV said goodbye");
                    let tx = self.tx.clone();
                    let cancel = self.cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => {}
                            _ = tx.send(SearchEvent::Lost { id }) => {}
                        }
                    });
                }
            }
            SsdpKind::Search => {}
        }
    }
}

async fn recv_optional(
    socket: Option<&UdpSocket>,
    buf: &mut [u8],
) -> std::io::Result<(usize, SocketAddr)> {
    match socket {
        Some(socket) => socket.recv_from(buf).await,
        None => std::future::pending().await,
    }
}

fn m_search_request(search_target: &str, mx_secs: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx_secs}\r\n\
         ST: {search_target}\r\n\
         \r\n"
    )
}

// ── Datagram parsing ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SsdpKind {
    /// `HTTP/1.1 200 OK` answer to our M-SEARCH.
    Response,
    /// `NOTIFY` with `NTS: ssdp:alive`.
    Alive,
    /// `NOTIFY` with `NTS: ssdp:byebye`.
    ByeBye,
    /// Someone else's M-SEARCH echoed back on the multicast group.
    Search,
}

#[derive(Debug, Clone)]
struct SsdpMessage {
    kind: SsdpKind,
    headers: HashMap<String, String>,
}

impl SsdpMessage {
    fn parse(text: &str) -> Option<Self> {
        let mut lines = text.split("\r\n").flat_map(|l| l.split('\n'));
        let start = lines.next()?.trim().to_ascii_uppercase();

        let headers: HashMap<String, String> = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_ascii_lowercase(), value.trim().to_owned()))
            })
            .collect();

        let kind = if start.starts_with("HTTP/") {
            if !start.contains(" 200") {
                return None;
            }
            SsdpKind::Response
        } else if start.starts_with("NOTIFY") {
            match headers.get("nts").map(String::as_str) {
                Some("ssdp:alive") => SsdpKind::Alive,
                Some("ssdp:byebye") => SsdpKind::ByeBye,
                _ => return None,
            }
        } else if start.starts_with("M-SEARCH") {
            SsdpKind::Search
        } else {
            return None;
        };

        Some(Self { kind, headers })
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn matches_target(&self, target: &str) -> bool {
        let advertised = match self.kind {
            SsdpKind::Response => self.header("st"),
            SsdpKind::Alive | SsdpKind::ByeBye => self.header("nt"),
            SsdpKind::Search => return false,
        };
        advertised.is_some_and(|value| value.eq_ignore_ascii_case(target))
    }

    /// Host part of the `LOCATION` URL.
    fn location_host(&self) -> Option<IpAddr> {
        let location = url::Url::parse(self.header("location")?).ok()?;
        match location.host()? {
            url::Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
            url::Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
            url::Host::Domain(_) => None,
        }
    }

    /// Device identifier: the `USN` up to the `::urn:` suffix.
    fn device_id(&self) -> Option<String> {
        let usn = self.header("usn")?;
        let id = usn.split("::").next().unwrap_or(usn).trim();
        (!id.is_empty()).then(|| id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
        CACHE-CONTROL: max-age=1800\r\n\
        DATE: Sun, 18 Oct 2026 10:00:00 GMT\r\n\
        EXT:\r\n\
        LOCATION: http://192.168.1.20:7676/rcr/RemoteControlReceiver.xml\r\n\
        SERVER: SHP, UPnP/1.0, Samsung UPnP SDK/1.0\r\n\
        ST: urn:samsung.com:device:RemoteControlReceiver:1\r\n\
        USN: uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73::urn:samsung.com:device:RemoteControlReceiver:1\r\n\
        \r\n";

    const BYEBYE: &str = "NOTIFY * HTTP/1.1\r\n\
        HOST: 239.255.255.250:1900\r\n\
        NT: urn:samsung.com:device:RemoteControlReceiver:1\r\n\
        NTS: ssdp:byebye\r\n\
        USN: uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73::urn:samsung.com:device:RemoteControlReceiver:1\r\n\
        \r\n";

    #[test]
    fn parses_search_response() {
        let msg = SsdpMessage::parse(RESPONSE).expect("response");
        assert_eq!(msg.kind, SsdpKind::Response);
        assert!(msg.matches_target(SAMSUNG_REMOTE_URN));
        assert_eq!(
            msg.location_host(),
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))
        );
        assert_eq!(
            msg.device_id().as_deref(),
            Some("uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73")
        );
    }

    #[test]
    fn parses_byebye_notify() {
        let msg = SsdpMessage::parse(BYEBYE).expect("notify");
        assert_eq!(msg.kind, SsdpKind::ByeBye);
        assert!(msg.matches_target(SAMSUNG_REMOTE_URN));
    }

    #[test]
    fn ignores_other_device_types() {
        let media_renderer = RESPONSE.replace(
            "ST: urn:samsung.com:device:RemoteControlReceiver:1",
            "ST: urn:schemas-upnp-org:device:MediaRenderer:1",
        );
        let msg = SsdpMessage::parse(&media_renderer).expect("response");
        assert!(!msg.matches_target(SAMSUNG_REMOTE_URN));
    }

    #[test]
    fn rejects_error_responses_and_garbage() {
        assert!(SsdpMessage::parse("HTTP/1.1 404 Not Found\r\n\r\n").is_none());
        assert!(SsdpMessage::parse("hello world").is_none());
        assert!(SsdpMessage::parse("").is_none());
    }

    #[test]
    fn echoed_search_never_matches() {
        let echoed = m_search_request(SAMSUNG_REMOTE_URN, 2);
        let msg = SsdpMessage::parse(&echoed).expect("search");
        assert_eq!(msg.kind, SsdpKind::Search);
        assert!(!msg.matches_target(SAMSUNG_REMOTE_URN));
    }

    #[tokio::test]
    async fn byebye_waits_for_room_on_a_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut task = SearchTask {
            http: reqwest::Client::new(),
            config: SearchConfig::default(),
            tx: tx.clone(),
            cancel: CancellationToken::new(),
            seen: HashSet::new(),
        };
        tx.send(SearchEvent::Lost { id: "uuid:other".into() })
            .await
            .expect("fill");

        let from = SocketAddr::from((Ipv4Addr::new(192, 168, 1, 20), SSDP_PORT));
        task.handle_datagram(BYEBYE.as_bytes(), from);

        assert!(matches!(rx.recv().await, Some(SearchEvent::Lost { ref id }) if id == "uuid:other"));
        let next = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("goodbye delivered");
        match next {
            Some(SearchEvent::Lost { id }) => {
                assert_eq!(id, "uuid:0ee5ff3c-3a6f-4a62-9a58-2b4ce6f4ef73");
            }
            other => panic!("expected Lost, got {other:?}"),
        }
    }

    #[test]
    fn m_search_request_is_well_formed() {
        let req = m_search_request(SAMSUNG_REMOTE_URN, 3);
        assert!(req.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(req.contains("MAN: \"ssdp:discover\"\r\n"));
        assert!(req.contains("MX: 3\r\n"));
        assert!(req.contains(&format!("ST: {SAMSUNG_REMOTE_URN}\r\n")));
        assert!(req.ends_with("\r\n\r\n"));
    }
}
