//! Finding other DLNA servers on the LAN and browsing their content.

pub mod description;
pub mod didl;
pub mod playlist;

use std::collections::{HashSet, VecDeque};
use std::net::{IpAddr, SocketAddrV4};
use std::time::Duration;

use tokio::task::JoinSet;

use crate::http::soap;
use crate::ssdp::{messages, socket};

pub const SCAN_TIMEOUT: Duration = Duration::from_secs(4);
const DESCRIPTION_TIMEOUT: Duration = Duration::from_secs(3);
const BROWSE_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_REPEATS: usize = 3;
const SEARCH_SPACING: Duration = Duration::from_millis(100);
const SEARCH_MX: u8 = 3;
const MAX_PLAYLIST_DEPTH: usize = 32;
const USER_AGENT: &str = concat!("LocalStream/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("browse response has no Result element")]
    MissingResult,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A server that answered a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredServer {
    pub friendly_name: String,
    pub ip: IpAddr,
    pub manufacturer: String,
    /// ContentDirectory control URL as advertised; `None` for devices without
    /// one (renderers, routers).
    pub control_url: Option<String>,
    /// `scheme://host:port` of the description URL.
    pub base_url: String,
}

/// A container or item from a remote Browse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub is_folder: bool,
    /// Media URL, items only.
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub upnp_class: Option<String>,
    pub child_count: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryClient {
    http: reqwest::Client,
}

impl DiscoveryClient {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    /// Multicast an M-SEARCH and describe every responder.
    ///
    /// An IP counts as known once its description has been read; while a
    /// lookup is in flight further answers from it are ignored, and if the
    /// lookup fails a later answer from the same IP tries again. Servers are
    /// then deduplicated by friendly name with [`merge_server`]. Failures are
    /// logged and give an empty list.
    pub async fn scan(&self, timeout: Duration) -> Vec<DiscoveredServer> {
        match self.try_scan(timeout).await {
            Ok(servers) => {
                tracing::info!("scan found {} server(s)", servers.len());
                servers
            }
            Err(e) => {
                tracing::warn!("scan failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_scan(&self, timeout: Duration) -> Result<Vec<DiscoveredServer>, DiscoveryError> {
        let local_ip = socket::primary_ipv4();
        let sock = socket::build_search_socket(local_ip)?;
        let request = messages::msearch_request(messages::SEARCH_ALL, SEARCH_MX);
        let target = SocketAddrV4::new(socket::SSDP_MCAST_V4, socket::SSDP_PORT);

        for i in 0..SEARCH_REPEATS {
            if i > 0 {
                tokio::time::sleep(SEARCH_SPACING).await;
            }
            sock.send_to(request.as_bytes(), target).await?;
        }
        tracing::debug!("M-SEARCH sent from {}", local_ip);

        let deadline = tokio::time::Instant::now() + timeout;
        let mut claimed_ips = HashSet::new();
        let mut lookups = JoinSet::new();
        let mut servers = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            tokio::select! {
                received = tokio::time::timeout_at(deadline, sock.recv_from(&mut buf)) => {
                    let (len, sender) = match received {
                        Err(_) => break,
                        Ok(Err(e)) => {
                            tracing::debug!("scan recv error: {}", e);
                            continue;
                        }
                        Ok(Ok(received)) => received,
                    };
                    let packet = String::from_utf8_lossy(&buf[..len]);
                    let Some(location) = messages::header_value(&packet, "LOCATION") else {
                        continue;
                    };
                    let ip = sender.ip();
                    if !claimed_ips.insert(ip) {
                        continue;
                    }
                    let client = self.clone();
                    let location = location.to_string();
                    lookups.spawn(async move { (ip, client.describe(ip, &location).await) });
                }
                Some(joined) = lookups.join_next(), if !lookups.is_empty() => {
                    record_lookup(joined, &mut claimed_ips, &mut servers);
                }
            }
        }

        while let Some(joined) = lookups.join_next().await {
            record_lookup(joined, &mut claimed_ips, &mut servers);
        }
        Ok(servers)
    }

    /// Fetch and parse one device description.
    pub async fn describe(&self, ip: IpAddr, location: &str) -> Result<DiscoveredServer, DiscoveryError> {
        let response = self
            .http
            .get(location)
            .timeout(DESCRIPTION_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status(response.status().as_u16()));
        }
        let xml = response.text().await?;
        let device = description::parse_device_description(&xml)?;
        let base_url = description::base_url(location)
            .ok_or_else(|| DiscoveryError::InvalidUrl(location.to_string()))?;

        Ok(DiscoveredServer {
            friendly_name: device.friendly_name,
            ip,
            manufacturer: device.manufacturer,
            control_url: device.control_url,
            base_url,
        })
    }

    /// One SOAP `Browse`. With `recursive` the non-standard `BrowseRecursive`
    /// flag is sent, which this server answers with every media item below.
    pub async fn browse_remote(
        &self,
        control_url: &str,
        base_url: &str,
        object_id: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteEntry>, DiscoveryError> {
        let endpoint = description::resolve_url(base_url, control_url)
            .ok_or_else(|| DiscoveryError::InvalidUrl(control_url.to_string()))?;
        let flag = if recursive { "BrowseRecursive" } else { "BrowseDirectChildren" };
        let body = soap::browse_request_body(object_id, flag);

        let response = self
            .http
            .post(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, soap::XML_CONTENT_TYPE)
            .header("SOAPAction", format!("\"{}#Browse\"", soap::CDS_NAMESPACE))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(BROWSE_TIMEOUT)
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        didl::parse_browse_response(&text)
    }

    /// Every playable item below `object_id`, gathered one container at a
    /// time. Containers that fail to browse are skipped.
    pub async fn collect_playlist(
        &self,
        control_url: &str,
        base_url: &str,
        object_id: &str,
    ) -> Vec<RemoteEntry> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(object_id.to_string(), 0usize)]);

        while let Some((id, depth)) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let entries = match self.browse_remote(control_url, base_url, &id, false).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("browse of {} failed: {}", id, e);
                    continue;
                }
            };
            for entry in entries {
                if entry.is_folder {
                    if depth < MAX_PLAYLIST_DEPTH && !entry.id.is_empty() {
                        queue.push_back((entry.id, depth + 1));
                    }
                } else if entry.url.is_some() {
                    items.push(entry);
                }
            }
        }
        items
    }
}

/// Outcome of one description fetch during a scan.
pub type Lookup = (IpAddr, Result<DiscoveredServer, DiscoveryError>);

/// Fold a finished description fetch into the scan state. A failed fetch
/// releases its IP from `claimed_ips` so the next answer from that host is
/// looked up again.
pub fn record_lookup(
    joined: Result<Lookup, tokio::task::JoinError>,
    claimed_ips: &mut HashSet<IpAddr>,
    servers: &mut Vec<DiscoveredServer>,
) {
    match joined {
        Ok((_, Ok(server))) => {
            merge_server(servers, server);
        }
        Ok((ip, Err(e))) => {
            tracing::debug!("description fetch from {} failed: {}", ip, e);
            claimed_ips.remove(&ip);
        }
        Err(e) => tracing::debug!("description task failed: {}", e),
    }
}

/// Add `server` to the scan result unless a server with the same friendly
/// name is already listed. The first one seen is kept. Returns whether the
/// list grew.
pub fn merge_server(servers: &mut Vec<DiscoveredServer>, server: DiscoveredServer) -> bool {
    if servers.iter().any(|s| s.friendly_name == server.friendly_name) {
        tracing::debug!("duplicate server name {:?} ignored", server.friendly_name);
        return false;
    }
    servers.push(server);
    true
}
