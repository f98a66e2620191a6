//! SSDP datagrams. All messages use CRLF line endings; bare `\n` is rejected
//! by strict clients.

pub const MEDIA_SERVER_TYPE: &str = "urn:schemas-upnp-org:device:MediaServer:1";
pub const ROOT_DEVICE: &str = "upnp:rootdevice";
pub const SEARCH_ALL: &str = "ssdp:all";

/// Value of the first header called `name` (case-insensitive), trimmed.
pub fn header_value<'a>(packet: &'a str, name: &str) -> Option<&'a str> {
    packet.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// The search target of an `M-SEARCH` this server answers, normalised to the
/// `ST` value sent back. `None` for any other datagram.
pub fn search_target(packet: &str) -> Option<&'static str> {
    if !packet.starts_with("M-SEARCH") {
        return None;
    }
    let st = header_value(packet, "ST")?;
    if st.eq_ignore_ascii_case(ROOT_DEVICE) {
        Some(ROOT_DEVICE)
    } else if st.eq_ignore_ascii_case(SEARCH_ALL) || st.contains("MediaServer") {
        Some(MEDIA_SERVER_TYPE)
    } else {
        None
    }
}

fn http_date() -> String {
    chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn server_token() -> String {
    format!(
        "{}/1.0 UPnP/1.0 localstream/{}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    )
}

/// Build an M-SEARCH 200 OK unicast response.
pub fn msearch_response(location: &str, st: &str, udn: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
CACHE-CONTROL: max-age=1800\r\n\
DATE: {date}\r\n\
EXT:\r\n\
LOCATION: {location}\r\n\
SERVER: {server}\r\n\
ST: {st}\r\n\
USN: {udn}::{st}\r\n\
Content-Length: 0\r\n\
\r\n",
        date = http_date(),
        server = server_token(),
    )
}

/// The reply owed to `packet`, if any.
pub fn msearch_reply(packet: &str, location: &str, udn: &str) -> Option<String> {
    search_target(packet).map(|st| msearch_response(location, st, udn))
}

/// Build a multicast M-SEARCH request.
pub fn msearch_request(st: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
HOST: 239.255.255.250:1900\r\n\
MAN: \"ssdp:discover\"\r\n\
MX: {mx}\r\n\
ST: {st}\r\n\
\r\n"
    )
}
