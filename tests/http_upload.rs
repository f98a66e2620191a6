use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use localstream::authority::PathAuthority;
use localstream::http::upload::{create_unique, sanitize_file_name};
use localstream::http::{build_router, state::AppState};
use localstream::thumbnail::ThumbnailService;

const BOUNDARY: &str = "----localstream-test-boundary";

fn make_app(roots: Vec<PathBuf>, cache: &Path) -> axum::Router {
    build_router(AppState {
        authority: PathAuthority::new(roots),
        thumbnails: ThumbnailService::new(cache.to_path_buf(), PathBuf::from("ffmpeg")),
        udn: "uuid:upload-test".to_string(),
        server_name: "Test Server".to_string(),
        advertised_addr: "127.0.0.1:8080".parse().unwrap(),
    })
}

fn encode(path: &Path) -> String {
    url::form_urlencoded::byte_serialize(path.to_string_lossy().as_bytes()).collect()
}

fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n").as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(folder: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/upload?path={folder}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── sanitize_file_name ────────────────────────────────────────────────────────

#[test]
fn test_sanitize_keeps_last_component() {
    assert_eq!(sanitize_file_name("song.mp3").as_deref(), Some("song.mp3"));
    assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
    assert_eq!(sanitize_file_name("C:\\Users\\me\\clip.mp4").as_deref(), Some("clip.mp4"));
}

#[test]
fn test_sanitize_refuses_dot_entries() {
    assert_eq!(sanitize_file_name(""), None);
    assert_eq!(sanitize_file_name("."), None);
    assert_eq!(sanitize_file_name("dir/.."), None);
}

// ── create_unique ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_unique_never_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("song.mp3"), b"original").unwrap();

    let (path, _file) = create_unique(dir.path(), "song.mp3").await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("song_"), "unexpected name {name}");
    assert!(name.ends_with(".mp3"), "unexpected name {name}");
    assert_eq!(std::fs::read(dir.path().join("song.mp3")).unwrap(), b"original");
}

#[tokio::test]
async fn test_create_unique_uses_plain_name_when_free() {
    let dir = tempfile::tempdir().unwrap();
    let (path, _file) = create_unique(dir.path(), "new.txt").await.unwrap();
    assert_eq!(path, dir.path().join("new.txt"));
}

// ── POST /upload ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_writes_files() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(
            &encode(root.path()),
            &[("a.txt", b"alpha"), ("b.txt", b"bravo")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("uploaded 2 file(s)"));
    assert_eq!(std::fs::read(root.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(root.path().join("b.txt")).unwrap(), b"bravo");
}

#[tokio::test]
async fn test_upload_collision_keeps_original() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("song.mp3"), b"original").unwrap();

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(&encode(root.path()), &[("song.mp3", b"replacement")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(std::fs::read(root.path().join("song.mp3")).unwrap(), b"original");
    let copies: Vec<PathBuf> = std::fs::read_dir(root.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap() != "song.mp3")
        .collect();
    assert_eq!(copies.len(), 1);
    let copy_name = copies[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(copy_name.starts_with("song_") && copy_name.ends_with(".mp3"));
    assert_eq!(std::fs::read(&copies[0]).unwrap(), b"replacement");
}

#[tokio::test]
async fn test_upload_strips_directories_from_filename() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(&encode(root.path()), &[("../escape.txt", b"x")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(root.path().join("escape.txt").exists());
    assert!(!root.path().parent().unwrap().join("escape.txt").exists());
}

#[tokio::test]
async fn test_upload_with_parent_token_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let target = encode(&root.path().join(".."));

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(&target, &[("a.txt", b"x")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_outside_roots_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(&encode(other.path()), &[("a.txt", b"x")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!other.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_upload_without_path_is_forbidden() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request("", &[("a.txt", b"x")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_to_missing_folder_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let missing = encode(&root.path().join("missing"));

    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(upload_request(&missing, &[("a.txt", b"x")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_multipart_body_is_unsupported() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/upload?path={}", encode(root.path())))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = make_app(vec![root.path().to_path_buf()], cache.path())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}
