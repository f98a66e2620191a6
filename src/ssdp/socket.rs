use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

pub const SSDP_MCAST_V4: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;
const SEARCH_TTL: u32 = 4;

/// Create a UDP socket for receiving SSDP multicast on port 1900.
/// Binds 0.0.0.0:1900 with SO_REUSEADDR (+ SO_REUSEPORT on unix, which macOS
/// requires) and joins the group on `iface_addr`.
pub fn build_recv_socket_v4(iface_addr: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    let bind_addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT).into();
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_udp: std::net::UdpSocket = socket.into();
    let tokio_udp = UdpSocket::from_std(std_udp)?;
    tokio_udp.join_multicast_v4(SSDP_MCAST_V4, iface_addr)?;
    Ok(tokio_udp)
}

/// Ephemeral socket for sending M-SEARCH from `local_ip` and collecting the
/// unicast replies.
pub fn build_search_socket(local_ip: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_multicast_ttl_v4(SEARCH_TTL)?;
    if !local_ip.is_unspecified() {
        socket.set_multicast_if_v4(&local_ip)?;
    }
    let bind_addr: SocketAddr = SocketAddrV4::new(local_ip, 0).into();
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_udp: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_udp)
}

/// Enumerate non-loopback IPv4 addresses using the `getifaddrs` crate.
/// Returns an empty Vec if enumeration fails.
pub fn list_non_loopback_v4() -> Vec<Ipv4Addr> {
    use getifaddrs::{Address, InterfaceFlags};

    let Ok(ifaces) = getifaddrs::getifaddrs() else {
        return vec![];
    };
    ifaces
        .filter(|i| !i.flags.contains(InterfaceFlags::LOOPBACK))
        .filter_map(|i| match &i.address {
            Address::V4(net_addr) => Some(net_addr.address),
            _ => None,
        })
        .collect()
}

/// The address other hosts reach us on: the source address the OS picks for
/// outbound traffic, else the first non-loopback interface, else loopback.
pub fn primary_ipv4() -> Ipv4Addr {
    outbound_ipv4()
        .or_else(|| list_non_loopback_v4().into_iter().next())
        .unwrap_or(Ipv4Addr::LOCALHOST)
}

// connect() on UDP only selects a route; nothing is sent
fn outbound_ipv4() -> Option<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() && !addr.ip().is_loopback() => Some(*addr.ip()),
        _ => None,
    }
}
