//! Reading Browse responses from other servers. Servers disagree on
//! namespace prefixes, so every element is matched by local name.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{DiscoveryError, RemoteEntry};

/// DIDL-Lite document carried in the `Result` element of a Browse response.
pub fn extract_result(soap: &str) -> Result<String, DiscoveryError> {
    let mut reader = Reader::from_str(soap);
    let mut in_result = false;
    let mut result = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Result" => in_result = true,
            Event::End(e) if e.local_name().as_ref() == b"Result" => return Ok(result),
            Event::Text(t) if in_result => result.push_str(&t.unescape()?),
            Event::CData(c) if in_result => result.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => return Err(DiscoveryError::MissingResult),
            _ => {}
        }
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Class,
    Res,
    AlbumArt,
}

fn start_entry(e: &BytesStart<'_>, is_folder: bool) -> RemoteEntry {
    let mut entry = RemoteEntry {
        is_folder,
        ..RemoteEntry::default()
    };
    for attr in e.attributes().flatten() {
        let Ok(value) = attr.unescape_value() else { continue };
        match attr.key.local_name().as_ref() {
            b"id" => entry.id = value.into_owned(),
            b"parentID" => entry.parent_id = value.into_owned(),
            b"childCount" => entry.child_count = value.trim().parse().ok(),
            _ => {}
        }
    }
    entry
}

/// Containers and items of a DIDL-Lite document, in document order.
pub fn parse_didl(didl: &str) -> Result<Vec<RemoteEntry>, DiscoveryError> {
    let mut reader = Reader::from_str(didl);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<RemoteEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"container" => current = Some(start_entry(&e, true)),
                b"item" => current = Some(start_entry(&e, false)),
                name if current.is_some() => {
                    field = match name {
                        b"title" => Some(Field::Title),
                        b"class" => Some(Field::Class),
                        b"res" => Some(Field::Res),
                        b"albumArtURI" => Some(Field::AlbumArt),
                        _ => None,
                    };
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"container" => entries.push(start_entry(&e, true)),
                b"item" => entries.push(start_entry(&e, false)),
                _ => {}
            },
            Event::Text(t) if field.is_some() => text.push_str(&t.unescape()?),
            Event::CData(c) if field.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => match e.local_name().as_ref() {
                b"container" | b"item" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    field = None;
                }
                _ => {
                    if let (Some(f), Some(entry)) = (field.take(), current.as_mut()) {
                        let value = text.trim().to_string();
                        match f {
                            Field::Title => entry.title = value,
                            Field::Class => entry.upnp_class = Some(value),
                            // first resource is the original; later ones are transcodes
                            Field::Res if entry.url.is_none() && !value.is_empty() => {
                                entry.url = Some(value)
                            }
                            Field::AlbumArt if !value.is_empty() => entry.thumbnail_url = Some(value),
                            _ => {}
                        }
                    }
                    text.clear();
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Both steps: SOAP envelope to entries.
pub fn parse_browse_response(soap: &str) -> Result<Vec<RemoteEntry>, DiscoveryError> {
    parse_didl(&extract_result(soap)?)
}
