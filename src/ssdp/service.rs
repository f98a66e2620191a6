use tokio_util::sync::CancellationToken;

use crate::ssdp::{messages, socket};

/// What the responder advertises.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// `uuid:` prefixed, must match the UDN in description.xml.
    pub udn: String,
    /// Interface the multicast group is joined on; also the LOCATION host.
    pub interface: std::net::Ipv4Addr,
    pub http_port: u16,
}

impl SsdpConfig {
    pub fn location(&self) -> String {
        format!("http://{}:{}/description.xml", self.interface, self.http_port)
    }
}

/// SSDP responder task: answer matching M-SEARCH datagrams until `shutdown`
/// fires. A socket that cannot be set up disables the responder only; HTTP
/// keeps serving.
pub async fn run(config: SsdpConfig, shutdown: CancellationToken) {
    let recv_socket = match socket::build_recv_socket_v4(config.interface) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::warn!("SSDP port 1900 is already in use, discovery responder disabled");
            return;
        }
        Err(e) => {
            tracing::warn!("SSDP responder disabled: {}", e);
            return;
        }
    };

    let location = config.location();
    tracing::info!("SSDP listening on {}:{} ({})", config.interface, socket::SSDP_PORT, location);

    // M-SEARCH packets are always well under 1KB.
    let mut buf = [0u8; 2048];
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("SSDP: shutdown signal received");
                return;
            }
            result = recv_socket.recv_from(&mut buf) => {
                let (len, sender) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::debug!("SSDP: recv_from error: {}", e);
                        continue;
                    }
                };
                let packet = String::from_utf8_lossy(&buf[..len]);
                let Some(reply) = messages::msearch_reply(&packet, &location, &config.udn) else {
                    continue;
                };
                tracing::debug!("SSDP: answering M-SEARCH from {}", sender);
                if let Err(e) = recv_socket.send_to(reply.as_bytes(), sender).await {
                    tracing::debug!("SSDP: reply to {} failed: {}", sender, e);
                }
            }
        }
    }
}
