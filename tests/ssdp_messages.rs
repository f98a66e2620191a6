use localstream::ssdp::messages::{
    header_value, msearch_reply, msearch_request, search_target, MEDIA_SERVER_TYPE, ROOT_DEVICE,
};

const LOCATION: &str = "http://192.168.1.5:8080/description.xml";
const UDN: &str = "uuid:550e8400-e29b-41d4-a716-446655440000";

fn msearch(st: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nMX: 2\r\nST: {st}\r\n\r\n"
    )
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[test]
fn test_header_lookup_ignores_case() {
    let packet = msearch("ssdp:all");
    assert_eq!(header_value(&packet, "st"), Some("ssdp:all"));
    assert_eq!(header_value(&packet, "Mx"), Some("2"));
    assert_eq!(header_value(&packet, "USN"), None);
}

#[test]
fn test_search_targets_answered() {
    assert_eq!(search_target(&msearch("ssdp:all")), Some(MEDIA_SERVER_TYPE));
    assert_eq!(search_target(&msearch(MEDIA_SERVER_TYPE)), Some(MEDIA_SERVER_TYPE));
    assert_eq!(search_target(&msearch("upnp:rootdevice")), Some(ROOT_DEVICE));
}

#[test]
fn test_other_targets_ignored() {
    assert_eq!(
        search_target(&msearch("urn:schemas-upnp-org:device:MediaRenderer:1")),
        None
    );
    assert_eq!(search_target("M-SEARCH * HTTP/1.1\r\nHOST: x\r\n\r\n"), None);
}

#[test]
fn test_notify_and_garbage_ignored() {
    let notify = "NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\nST: ssdp:all\r\n\r\n";
    assert_eq!(msearch_reply(notify, LOCATION, UDN), None);
    assert_eq!(msearch_reply("\u{1}\u{2}garbage", LOCATION, UDN), None);
}

// ── Replies ───────────────────────────────────────────────────────────────────

#[test]
fn test_reply_advertises_location_and_usn() {
    let reply = msearch_reply(&msearch("ssdp:all"), LOCATION, UDN).unwrap();
    assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(reply.ends_with("\r\n\r\n"));
    assert_eq!(header_value(&reply, "LOCATION"), Some(LOCATION));
    assert_eq!(header_value(&reply, "ST"), Some(MEDIA_SERVER_TYPE));
    assert_eq!(
        header_value(&reply, "USN"),
        Some(format!("{UDN}::{MEDIA_SERVER_TYPE}").as_str())
    );
    assert_eq!(header_value(&reply, "CACHE-CONTROL"), Some("max-age=1800"));
}

#[test]
fn test_rootdevice_reply_echoes_rootdevice() {
    let reply = msearch_reply(&msearch("upnp:rootdevice"), LOCATION, UDN).unwrap();
    assert_eq!(header_value(&reply, "ST"), Some(ROOT_DEVICE));
    assert_eq!(
        header_value(&reply, "USN"),
        Some(format!("{UDN}::{ROOT_DEVICE}").as_str())
    );
}

#[test]
fn test_request_format() {
    let request = msearch_request("ssdp:all", 3);
    assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
    assert!(request.contains("MAN: \"ssdp:discover\"\r\n"));
    assert!(request.contains("MX: 3\r\n"));
    assert!(request.ends_with("ST: ssdp:all\r\n\r\n"));
}
