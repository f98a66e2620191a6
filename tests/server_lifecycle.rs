use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use localstream::config::Config;
use localstream::discovery::DiscoveryClient;
use localstream::server::{self, ServerError};

fn config(root: &Path, cache: &Path, port: u16) -> Arc<Config> {
    Arc::new(Config {
        shared_folders: vec![root.to_path_buf()],
        port,
        name: "Lifecycle Test".to_string(),
        cache_dir: cache.to_path_buf(),
        ffmpeg: "ffmpeg".into(),
        ssdp: false,
    })
}

/// root/{a.mp3, Album/b.mp4, Album/Deeper/c.jpg, readme.txt}
fn populate(root: &Path) {
    std::fs::write(root.join("a.mp3"), b"a").unwrap();
    std::fs::write(root.join("readme.txt"), b"r").unwrap();
    std::fs::create_dir_all(root.join("Album").join("Deeper")).unwrap();
    std::fs::write(root.join("Album").join("b.mp4"), b"b").unwrap();
    std::fs::write(root.join("Album").join("Deeper").join("c.jpg"), b"c").unwrap();
}

fn loopback(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn test_server_serves_until_stopped() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let handle = server::start(config(root.path(), cache.path(), 0)).await.unwrap();
    let port = handle.local_addr().port();
    assert!(handle.udn().starts_with("uuid:"));

    let response = reqwest::get(format!("{}/description.xml", loopback(port)))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.text().await.unwrap().contains(handle.udn()));

    handle.stop();
    handle.stop();
    assert!(handle.is_stopped());
    tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("server did not stop");

    assert!(reqwest::get(format!("{}/description.xml", loopback(port))).await.is_err());
}

#[tokio::test]
async fn test_port_in_use_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let port = taken.local_addr().unwrap().port();

    let result = server::start(config(root.path(), cache.path(), port)).await;
    match result {
        Err(ServerError::Bind { port: reported, .. }) => assert_eq!(reported, port),
        Ok(_) => panic!("second bind on port {port} succeeded"),
    }
}

#[tokio::test]
async fn test_discovery_client_browses_a_running_server() {
    let root = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    populate(root.path());
    let handle = server::start(config(root.path(), cache.path(), 0)).await.unwrap();
    let base = loopback(handle.local_addr().port());
    let client = DiscoveryClient::new();

    let server = client
        .describe(IpAddr::V4(Ipv4Addr::LOCALHOST), &format!("{base}/description.xml"))
        .await
        .unwrap();
    assert_eq!(server.friendly_name, "Lifecycle Test");
    assert_eq!(server.base_url, base);
    let control = server.control_url.unwrap();

    let top = client.browse_remote(&control, &base, "0", false).await.unwrap();
    assert_eq!(top.len(), 1);
    assert!(top[0].is_folder);

    let children = client.browse_remote(&control, &base, &top[0].id, false).await.unwrap();
    let titles: Vec<&str> = children.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Album", "a"]);

    let recursive = client.browse_remote(&control, &base, &top[0].id, true).await.unwrap();
    assert_eq!(recursive.len(), 3);

    let mut playlist: Vec<String> = client
        .collect_playlist(&control, &base, "0")
        .await
        .into_iter()
        .map(|e| e.title)
        .collect();
    playlist.sort();
    assert_eq!(playlist, vec!["a", "b", "c"]);

    let first = reqwest::get(children[1].url.clone().unwrap()).await.unwrap();
    assert_eq!(first.bytes().await.unwrap().as_ref(), b"a");

    handle.stop();
    handle.wait().await;
}
