pub mod archive;
pub mod browse_ui;
pub mod content_directory;
pub mod description;
pub mod media;
pub mod soap;
pub mod state;
pub mod thumb;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::http::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // web file server
        .route("/", get(browse_ui::serve_page))
        .route("/upload", post(upload::upload_files).layer(DefaultBodyLimit::disable()))
        .route("/zip", get(archive::serve_zip))
        .route("/file/{id}", get(media::serve_file_get).head(media::serve_file_head))
        .route("/thumb/{id}", get(thumb::serve_thumbnail))
        // UPnP device and ContentDirectory
        .route("/description.xml", get(description::serve_device_xml))
        .route("/scpd/ContentDirectory.xml", get(description::serve_cds_scpd))
        .route("/control/ContentDirectory", post(content_directory::cds_control))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .method_not_allowed_fallback(|| async { StatusCode::NOT_FOUND })
        .layer(SetResponseHeaderLayer::overriding(
            header::CONNECTION,
            HeaderValue::from_static("close"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
