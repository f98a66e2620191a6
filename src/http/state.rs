use std::net::SocketAddr;

use crate::authority::PathAuthority;
use crate::thumbnail::ThumbnailService;

/// Shared application state injected into all route handlers via axum::extract::State.
/// Everything here is fixed for the lifetime of one server run; new settings mean
/// a new server with a new state.
#[derive(Clone)]
pub struct AppState {
    pub authority: PathAuthority,
    pub thumbnails: ThumbnailService,
    /// `uuid:` prefixed device identifier, fresh for every process.
    pub udn: String,
    pub server_name: String,
    /// Address absolute URLs fall back to when a request has no Host header.
    pub advertised_addr: SocketAddr,
}
