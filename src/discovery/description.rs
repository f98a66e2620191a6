//! Parsing a remote device description (`LOCATION` target).

use quick_xml::events::Event;
use quick_xml::Reader;

use super::DiscoveryError;

/// Name given to devices whose description has no `friendlyName`.
pub const UNKNOWN_NAME: &str = "Unknown";

/// The parts of a device description this client uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescription {
    pub friendly_name: String,
    pub manufacturer: String,
    /// ContentDirectory control URL as advertised, possibly relative.
    pub control_url: Option<String>,
}

/// Parse device XML, matching elements by local name so prefixed documents
/// work. The first non-empty `friendlyName`/`manufacturer` wins, which is the
/// root device's. A device without a name is called [`UNKNOWN_NAME`].
pub fn parse_device_description(xml: &str) -> Result<DeviceDescription, DiscoveryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut description = DeviceDescription::default();
    let mut text = String::new();
    let mut in_service = false;
    let mut service_type = String::new();
    let mut service_control = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"service" {
                    in_service = true;
                    service_type.clear();
                    service_control.clear();
                }
                text.clear();
            }
            Ok(Event::Text(e)) => text.push_str(&e.unescape().unwrap_or_default()),
            Ok(Event::End(e)) => {
                let value = text.trim();
                match e.local_name().as_ref() {
                    b"friendlyName" if !in_service && description.friendly_name.is_empty() => {
                        description.friendly_name = value.to_string()
                    }
                    b"manufacturer" if !in_service && description.manufacturer.is_empty() => {
                        description.manufacturer = value.to_string()
                    }
                    b"serviceType" if in_service => service_type = value.to_string(),
                    b"controlURL" if in_service => service_control = value.to_string(),
                    b"service" => {
                        if description.control_url.is_none()
                            && service_type.contains("ContentDirectory")
                            && !service_control.is_empty()
                        {
                            description.control_url = Some(service_control.clone());
                        }
                        in_service = false;
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("device description unreadable at {}", reader.buffer_position());
                return Err(e.into());
            }
            _ => {}
        }
    }

    if description.friendly_name.is_empty() {
        description.friendly_name = UNKNOWN_NAME.to_string();
    }
    Ok(description)
}

/// `scheme://host:port` of a URL.
pub fn base_url(location: &str) -> Option<String> {
    let url = url::Url::parse(location).ok()?;
    match url.origin() {
        url::Origin::Tuple(..) => Some(url.origin().ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Join a possibly relative control URL onto a base URL.
pub fn resolve_url(base: &str, path: &str) -> Option<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let base = url::Url::parse(base).ok()?;
    base.join(path).ok().map(String::from)
}
