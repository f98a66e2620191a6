use std::collections::HashSet;
use std::net::IpAddr;

use localstream::discovery::description::{
    base_url, parse_device_description, resolve_url, UNKNOWN_NAME,
};
use localstream::discovery::didl::{extract_result, parse_browse_response, parse_didl};
use localstream::discovery::playlist::render_m3u;
use localstream::discovery::{
    merge_server, record_lookup, DiscoveredServer, DiscoveryError, RemoteEntry,
};

const PREFIXED_DEVICE: &str = r#"<?xml version="1.0"?>
<d:root xmlns:d="urn:schemas-upnp-org:device-1-0">
  <d:device>
    <d:deviceType>urn:schemas-upnp-org:device:MediaServer:1</d:deviceType>
    <d:friendlyName>Living Room NAS</d:friendlyName>
    <d:manufacturer>Acme &amp; Sons</d:manufacturer>
    <d:serviceList>
      <d:service>
        <d:serviceType>urn:schemas-upnp-org:service:ConnectionManager:1</d:serviceType>
        <d:controlURL>/cm/control</d:controlURL>
      </d:service>
      <d:service>
        <d:serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</d:serviceType>
        <d:controlURL>/cds/control</d:controlURL>
      </d:service>
    </d:serviceList>
    <d:deviceList>
      <d:device>
        <d:friendlyName>Embedded</d:friendlyName>
      </d:device>
    </d:deviceList>
  </d:device>
</d:root>"#;

const RENDERER_DEVICE: &str = r#"<root xmlns="urn:schemas-upnp-org:device-1-0"><device>
<friendlyName>TV</friendlyName><manufacturer>Screens Inc</manufacturer>
<serviceList><service><serviceType>urn:schemas-upnp-org:service:AVTransport:1</serviceType>
<controlURL>/avt</controlURL></service></serviceList></device></root>"#;

const DIDL: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">
<container id="10" parentID="0" restricted="1" childCount="4"><dc:title>Music</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>
<item id="11" parentID="10" restricted="1"><dc:title>Track &amp; Field</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class>
<upnp:albumArtURI>http://nas/art/11.jpg</upnp:albumArtURI>
<res protocolInfo="http-get:*:audio/mpeg:*">http://nas/media/11.mp3</res>
<res protocolInfo="http-get:*:audio/L16:*">http://nas/transcode/11</res></item>
<item id="12" parentID="10" restricted="1"/>
</DIDL-Lite>"#;

fn entry(title: &str, url: Option<&str>) -> RemoteEntry {
    RemoteEntry {
        title: title.to_string(),
        url: url.map(str::to_string),
        ..RemoteEntry::default()
    }
}

// ── Device description ────────────────────────────────────────────────────────

#[test]
fn test_prefixed_description_is_understood() {
    let device = parse_device_description(PREFIXED_DEVICE).unwrap();
    assert_eq!(device.friendly_name, "Living Room NAS");
    assert_eq!(device.manufacturer, "Acme & Sons");
    assert_eq!(device.control_url.as_deref(), Some("/cds/control"));
}

#[test]
fn test_device_without_content_directory_has_no_control_url() {
    let device = parse_device_description(RENDERER_DEVICE).unwrap();
    assert_eq!(device.friendly_name, "TV");
    assert_eq!(device.control_url, None);
}

#[test]
fn test_malformed_description_is_an_error() {
    let result = parse_device_description("<root><device></root>");
    assert!(matches!(result, Err(DiscoveryError::Xml(_))));
}

#[test]
fn test_nameless_device_is_called_unknown() {
    let xml = r#"<root xmlns="urn:schemas-upnp-org:device-1-0"><device>
<friendlyName>  </friendlyName><manufacturer>Box Co</manufacturer></device></root>"#;
    let device = parse_device_description(xml).unwrap();
    assert_eq!(device.friendly_name, UNKNOWN_NAME);
    assert_eq!(device.friendly_name, "Unknown");
    assert_eq!(device.manufacturer, "Box Co");

    let bare = parse_device_description("<root><device/></root>").unwrap();
    assert_eq!(bare.friendly_name, "Unknown");
}

// ── Scan results ──────────────────────────────────────────────────────────────

fn server(name: &str, ip: &str) -> DiscoveredServer {
    let ip: IpAddr = ip.parse().unwrap();
    DiscoveredServer {
        friendly_name: name.to_string(),
        ip,
        manufacturer: "Acme".to_string(),
        control_url: Some("/cds/control".to_string()),
        base_url: format!("http://{ip}:8200"),
    }
}

#[test]
fn test_servers_sharing_a_name_collapse_to_the_first() {
    let mut servers = Vec::new();
    assert!(merge_server(&mut servers, server("Living Room NAS", "192.168.1.10")));
    assert!(!merge_server(&mut servers, server("Living Room NAS", "192.168.1.11")));

    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].ip, "192.168.1.10".parse::<IpAddr>().unwrap());
}

#[test]
fn test_servers_with_different_names_are_all_kept() {
    let mut servers = Vec::new();
    assert!(merge_server(&mut servers, server("Living Room NAS", "192.168.1.10")));
    assert!(merge_server(&mut servers, server("Office PC", "192.168.1.10")));
    assert!(merge_server(&mut servers, server("Unknown", "192.168.1.12")));

    let names: Vec<&str> = servers.iter().map(|s| s.friendly_name.as_str()).collect();
    assert_eq!(names, vec!["Living Room NAS", "Office PC", "Unknown"]);
}

#[test]
fn test_failed_lookup_frees_the_ip_for_a_retry() {
    let ip: IpAddr = "192.168.1.20".parse().unwrap();
    let mut claimed = HashSet::from([ip]);
    let mut servers = Vec::new();

    record_lookup(Ok((ip, Err(DiscoveryError::Status(500)))), &mut claimed, &mut servers);
    assert!(servers.is_empty());
    assert!(!claimed.contains(&ip));

    // the next answer from the same host claims it again and succeeds
    assert!(claimed.insert(ip));
    record_lookup(Ok((ip, Ok(server("Den TV", "192.168.1.20")))), &mut claimed, &mut servers);
    assert_eq!(servers.len(), 1);
    assert!(claimed.contains(&ip));
}

// ── URLs ──────────────────────────────────────────────────────────────────────

#[test]
fn test_base_url_is_origin_of_location() {
    assert_eq!(
        base_url("http://192.168.1.20:49152/desc/device.xml").as_deref(),
        Some("http://192.168.1.20:49152")
    );
    assert_eq!(base_url("not a url"), None);
}

#[test]
fn test_resolve_url_joins_relative_paths() {
    let base = "http://192.168.1.20:49152";
    assert_eq!(
        resolve_url(base, "/cds/control").as_deref(),
        Some("http://192.168.1.20:49152/cds/control")
    );
    assert_eq!(
        resolve_url(base, "cds/control").as_deref(),
        Some("http://192.168.1.20:49152/cds/control")
    );
    assert_eq!(
        resolve_url(base, "http://10.0.0.1/ctl").as_deref(),
        Some("http://10.0.0.1/ctl")
    );
}

// ── DIDL-Lite ─────────────────────────────────────────────────────────────────

#[test]
fn test_didl_containers_and_items() {
    let entries = parse_didl(DIDL).unwrap();
    assert_eq!(entries.len(), 3);

    let music = &entries[0];
    assert!(music.is_folder);
    assert_eq!(music.id, "10");
    assert_eq!(music.parent_id, "0");
    assert_eq!(music.title, "Music");
    assert_eq!(music.child_count, Some(4));

    let track = &entries[1];
    assert!(!track.is_folder);
    assert_eq!(track.title, "Track & Field");
    assert_eq!(track.url.as_deref(), Some("http://nas/media/11.mp3"));
    assert_eq!(track.thumbnail_url.as_deref(), Some("http://nas/art/11.jpg"));
    assert_eq!(track.upnp_class.as_deref(), Some("object.item.audioItem.musicTrack"));

    let bare = &entries[2];
    assert_eq!(bare.id, "12");
    assert_eq!(bare.url, None);
}

#[test]
fn test_escaped_result_is_extracted() {
    let soap = format!(
        "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"><s:Body>\
<u:BrowseResponse xmlns:u=\"urn:schemas-upnp-org:service:ContentDirectory:1\">\
<Result>{}</Result><NumberReturned>3</NumberReturned></u:BrowseResponse></s:Body></s:Envelope>",
        quick_xml::escape::escape(DIDL)
    );
    assert_eq!(extract_result(&soap).unwrap(), DIDL);
    assert_eq!(parse_browse_response(&soap).unwrap().len(), 3);
}

#[test]
fn test_cdata_result_is_extracted() {
    let soap = format!(
        "<Envelope><Body><BrowseResponse><Result><![CDATA[{DIDL}]]></Result></BrowseResponse></Body></Envelope>"
    );
    assert_eq!(parse_browse_response(&soap).unwrap().len(), 3);
}

#[test]
fn test_response_without_result_is_an_error() {
    let soap = "<Envelope><Body><BrowseResponse/></Body></Envelope>";
    assert!(matches!(extract_result(soap), Err(DiscoveryError::MissingResult)));
}

// ── Playlist ──────────────────────────────────────────────────────────────────

#[test]
fn test_m3u_lists_playable_entries() {
    let entries = vec![
        entry("First", Some("http://nas/1.mp3")),
        entry("Folder", None),
        entry("Second\nLine", Some("http://nas/2.mp3")),
    ];
    assert_eq!(
        render_m3u(&entries),
        "#EXTM3U\n#EXTINF:-1,First\nhttp://nas/1.mp3\n#EXTINF:-1,Second Line\nhttp://nas/2.mp3\n"
    );
}

#[test]
fn test_empty_m3u_has_header_only() {
    assert_eq!(render_m3u(&[]), "#EXTM3U\n");
}
