use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::authority::PathAuthority;
use crate::http::soap::{self, soap_fault, soap_response, BrowseRequest};
use crate::http::state::AppState;
use crate::media::content_id::{self, ROOT_ID};
use crate::media::entry::{self, MediaEntry};
use crate::media::mime::MediaKind;

// ── Helper ────────────────────────────────────────────────────────────────────

fn ok_xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, soap::XML_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

// ── Main handler ──────────────────────────────────────────────────────────────

/// POST /control/ContentDirectory
pub async fn cds_control(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let action = soap::action_name(&headers, &body);
    match action.as_deref() {
        Some("Browse") => handle_browse(&state, &headers, &body).await,
        // The tree is never versioned.
        Some("GetSystemUpdateID") => ok_xml(soap_response("GetSystemUpdateID", "<Id>1</Id>")),
        _ => {
            tracing::warn!("Unknown CDS action: {:?}", action);
            soap_fault(401, "Invalid Action").into_response()
        }
    }
}

// ── Browse ────────────────────────────────────────────────────────────────────

/// One DIDL-Lite object in a Browse result.
#[derive(Debug, Clone)]
pub struct BrowseObject {
    pub entry: MediaEntry,
    pub parent_id: String,
    pub child_count: Option<usize>,
}

impl BrowseObject {
    pub fn id(&self) -> String {
        content_id::encode(&self.entry.path)
    }
}

/// Whether a non-recursive Browse lists this entry: visible folders and
/// media files.
fn is_listed(entry: &MediaEntry) -> bool {
    match entry.kind {
        MediaKind::Container => !entry.is_hidden(),
        kind => kind.is_media(),
    }
}

/// `childCount` matches what browsing the container would return.
fn container_object(entry: MediaEntry, parent_id: String) -> BrowseObject {
    let child_count = entry::list_directory(&entry.path)
        .ok()
        .map(|listing| listing.iter().filter(|e| is_listed(e)).count());
    BrowseObject { entry, parent_id, child_count }
}

/// Resolve a Browse request against the filesystem.
///
/// The root lists shared folders. Any other id must decode to an existing
/// directory under a shared root; anything else yields an empty result rather
/// than a fault.
pub fn browse_objects(authority: &PathAuthority, request: &BrowseRequest) -> Vec<BrowseObject> {
    if request.object_id == ROOT_ID {
        return authority
            .resolve_virtual_root()
            .into_iter()
            .map(|root| container_object(root, ROOT_ID.to_string()))
            .collect();
    }

    let Some(path) = content_id::decode(&request.object_id) else {
        tracing::debug!("Browse: undecodable ObjectID {}", request.object_id);
        return Vec::new();
    };
    if authority.authorize(&path).is_err() || !path.is_dir() {
        return Vec::new();
    }

    if request.recursive {
        return entry::walk_media(&path)
            .into_iter()
            .map(|item| {
                let parent_id = item
                    .path
                    .parent()
                    .map(content_id::encode)
                    .unwrap_or_else(|| request.object_id.clone());
                BrowseObject { entry: item, parent_id, child_count: None }
            })
            .collect();
    }

    let listing = match entry::list_directory(&path) {
        Ok(listing) => listing,
        Err(e) => {
            tracing::warn!("Browse: cannot list folder: {}", e);
            return Vec::new();
        }
    };
    listing
        .into_iter()
        .filter(is_listed)
        .map(|e| match e.kind {
            MediaKind::Container => container_object(e, request.object_id.clone()),
            _ => BrowseObject { entry: e, parent_id: request.object_id.clone(), child_count: None },
        })
        .collect()
}

// ── DIDL-Lite generation ──────────────────────────────────────────────────────

fn didl_lite_wrap(inner: &str) -> String {
    format!(
        r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">{inner}</DIDL-Lite>"#,
        inner = inner,
    )
}

fn container_element(object: &BrowseObject) -> String {
    let child_count = object
        .child_count
        .map(|n| format!(r#" childCount="{n}""#))
        .unwrap_or_default();
    format!(
        r#"<container id="{id}" parentID="{parent_id}" restricted="1"{child_count}><dc:title>{title}</dc:title><upnp:class>{class}</upnp:class></container>"#,
        id = object.id(),
        parent_id = soap::xml_escape(&object.parent_id),
        child_count = child_count,
        title = soap::xml_escape(&object.entry.name),
        class = MediaKind::Container.upnp_class(),
    )
}

fn item_element(object: &BrowseObject, base_url: &str) -> String {
    let id = object.id();
    let entry = &object.entry;
    let album_art = if entry.kind.is_media() {
        format!(
            "<upnp:albumArtURI>{}</upnp:albumArtURI>",
            soap::xml_escape(&format!("{base_url}/thumb/{id}"))
        )
    } else {
        String::new()
    };
    let dc_date = soap::format_dc_date(&entry.path)
        .map(|d| format!("<dc:date>{d}</dc:date>"))
        .unwrap_or_default();
    format!(
        r#"<item id="{id}" parentID="{parent_id}" restricted="1"><dc:title>{title}</dc:title><upnp:class>{class}</upnp:class>{dc_date}{album_art}<res protocolInfo="{protocol_info}" size="{size}">{res_url}</res></item>"#,
        id = id,
        parent_id = soap::xml_escape(&object.parent_id),
        title = soap::xml_escape(&entry.title()),
        class = entry.kind.upnp_class(),
        dc_date = dc_date,
        album_art = album_art,
        protocol_info = soap::build_protocol_info(entry.mime),
        size = entry.size,
        res_url = soap::xml_escape(&format!("{base_url}/file/{id}")),
    )
}

/// DIDL-Lite document for a set of browse objects, unescaped.
pub fn render_didl(objects: &[BrowseObject], base_url: &str) -> String {
    let elements: String = objects
        .iter()
        .map(|object| match object.entry.kind {
            MediaKind::Container => container_element(object),
            _ => item_element(object, base_url),
        })
        .collect();
    didl_lite_wrap(&elements)
}

async fn handle_browse(state: &AppState, headers: &HeaderMap, body: &str) -> Response {
    let request = BrowseRequest::parse(body);
    tracing::debug!("Browse {} (recursive: {})", request.object_id, request.recursive);

    let authority = state.authority.clone();
    let objects = match tokio::task::spawn_blocking(move || browse_objects(&authority, &request)).await {
        Ok(objects) => objects,
        Err(e) => {
            tracing::error!("Browse task failed: {}", e);
            return soap_fault(501, "Action Failed").into_response();
        }
    };

    let base = soap::base_url(headers, state.advertised_addr);
    let didl_xml = render_didl(&objects, &base);
    // No pagination: everything found is returned in one response.
    let inner = format!(
        "<Result>{}</Result><NumberReturned>{}</NumberReturned><TotalMatches>{}</TotalMatches><UpdateID>1</UpdateID>",
        soap::xml_escape(&didl_xml),
        objects.len(),
        objects.len(),
    );
    ok_xml(soap_response("Browse", &inner))
}
