use std::borrow::Cow;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, StatusCode};
use quick_xml::events::Event;
use quick_xml::Reader;

// ── Constants ─────────────────────────────────────────────────────────────────

pub const CDS_NAMESPACE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";
pub const DLNA_FLAGS: &str = "01700000000000000000000000000000";
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

// ── SOAP envelope builder ─────────────────────────────────────────────────────

/// Build a complete SOAP 1.1 response envelope for a ContentDirectory action.
pub fn soap_response(action: &str, inner_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
            s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:{action}Response xmlns:u="{ns}">
      {inner_xml}
    </u:{action}Response>
  </s:Body>
</s:Envelope>"#,
        action = action,
        ns = CDS_NAMESPACE,
        inner_xml = inner_xml,
    )
}

/// Build the SOAP request body for a ContentDirectory `Browse`.
pub fn browse_request_body(object_id: &str, browse_flag: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:Browse xmlns:u="{ns}">
      <ObjectID>{object_id}</ObjectID>
      <BrowseFlag>{browse_flag}</BrowseFlag>
      <Filter>*</Filter>
      <StartingIndex>0</StartingIndex>
      <RequestedCount>0</RequestedCount>
      <SortCriteria></SortCriteria>
    </u:Browse>
  </s:Body>
</s:Envelope>"#,
        ns = CDS_NAMESPACE,
        object_id = xml_escape(object_id),
        browse_flag = browse_flag,
    )
}

// ── SOAP fault builder ────────────────────────────────────────────────────────

/// Build a UPnP SOAP fault response (HTTP 500 per SOAP 1.1).
pub fn soap_fault(
    error_code: u32,
    error_description: &str,
) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    let body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
            s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>{error_code}</errorCode>
          <errorDescription>{error_description}</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#,
        error_code = error_code,
        error_description = xml_escape(error_description),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        body,
    )
}

// ── Request parsing ───────────────────────────────────────────────────────────

/// Action named by the `SOAPAction` header (`"urn:...:1#Browse"`), or failing
/// that, the first element inside the SOAP body.
pub fn action_name(headers: &HeaderMap, body: &str) -> Option<String> {
    let from_header = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split('#').nth(1))
        .map(|s| s.trim_matches('"').trim().to_string())
        .filter(|s| !s.is_empty());
    from_header.or_else(|| first_body_element(body))
}

fn first_body_element(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut in_body = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name();
                if in_body {
                    return Some(String::from_utf8_lossy(local.as_ref()).into_owned());
                }
                if local.as_ref() == b"Body" {
                    in_body = true;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// A parsed `Browse` invocation.
///
/// Parsing never fails: a missing, empty, or unreadable `ObjectID` means the
/// root `"0"`. `BrowseRecursive` is a non-standard flag understood by this
/// server; every other flag browses direct children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub object_id: String,
    pub recursive: bool,
}

impl BrowseRequest {
    pub fn parse(body: &str) -> Self {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(true);

        let mut current: Option<Vec<u8>> = None;
        let mut object_id: Option<String> = None;
        let mut browse_flag: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
                Ok(Event::End(_)) => current = None,
                Ok(Event::Text(t)) => {
                    let Some(name) = current.as_deref() else { continue };
                    let Ok(text) = t.unescape() else { continue };
                    match name {
                        b"ObjectID" => object_id = Some(text.trim().to_string()),
                        b"BrowseFlag" => browse_flag = Some(text.trim().to_string()),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    tracing::debug!(
                        "Browse body unreadable at {}: {}",
                        reader.buffer_position(),
                        e
                    );
                    break;
                }
                _ => {}
            }
        }

        BrowseRequest {
            object_id: object_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| crate::media::content_id::ROOT_ID.to_string()),
            recursive: browse_flag.as_deref() == Some("BrowseRecursive"),
        }
    }
}

// ── protocolInfo construction ─────────────────────────────────────────────────

/// `http-get:*:{mime}:DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=...`
pub fn build_protocol_info(mime: &str) -> String {
    format!(
        "http-get:*:{}:DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS={}",
        mime, DLNA_FLAGS
    )
}

// ── dc:date formatting ────────────────────────────────────────────────────────

/// ISO 8601 date (YYYY-MM-DD) of the file's modification time.
pub fn format_dc_date(path: &std::path::Path) -> Option<String> {
    let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
    let dt: chrono::DateTime<chrono::Utc> = mtime.into();
    Some(dt.format("%Y-%m-%d").to_string())
}

// ── URL base ──────────────────────────────────────────────────────────────────

/// `http://host:port` as the client addressed us, so URLs handed out in
/// DIDL-Lite work from the client's side of the network. Falls back to the
/// advertised address when the request carries no Host header.
pub fn base_url(headers: &HeaderMap, fallback: SocketAddr) -> String {
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{host}"),
        _ => format!("http://{fallback}"),
    }
}

// ── XML escaping ──────────────────────────────────────────────────────────────

/// Escapes the five XML special characters.
pub fn xml_escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}
