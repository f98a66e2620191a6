//! Starting and stopping one server run: HTTP listener plus SSDP responder,
//! both tied to a single cancellation token.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::authority::PathAuthority;
use crate::config::Config;
use crate::http::{build_router, state::AppState};
use crate::ssdp::{self, service::SsdpConfig};
use crate::thumbnail::{self, ThumbnailService};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// A running server. Dropping the handle does not stop it; call [`stop`].
///
/// [`stop`]: ServerHandle::stop
pub struct ServerHandle {
    token: CancellationToken,
    http: JoinHandle<()>,
    ssdp: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    udn: String,
}

impl ServerHandle {
    /// Signal both tasks to stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    /// Wait for both tasks to finish. In-flight responses are allowed to
    /// complete before the HTTP task returns.
    pub async fn wait(self) {
        if let Err(e) = self.http.await {
            tracing::error!("HTTP task failed: {}", e);
        }
        if let Some(ssdp) = self.ssdp {
            if let Err(e) = ssdp.await {
                tracing::error!("SSDP task failed: {}", e);
            }
        }
    }
}

/// Router state for `config`, advertising `advertised_addr` in absolute URLs.
pub fn app_state(config: &Config, udn: String, advertised_addr: SocketAddr) -> AppState {
    AppState {
        authority: PathAuthority::new(config.shared_folders.clone()),
        thumbnails: ThumbnailService::new(config.cache_dir.clone(), config.ffmpeg.clone()),
        udn,
        server_name: config.name.clone(),
        advertised_addr,
    }
}

pub async fn start(config: Arc<Config>) -> Result<ServerHandle, ServerError> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .map_err(|source| {
            tracing::error!("cannot listen on port {}: {}", config.port, source);
            ServerError::Bind { port: config.port, source }
        })?;
    let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
        port: config.port,
        source,
    })?;

    let local_ip = ssdp::socket::primary_ipv4();
    let udn = format!("uuid:{}", uuid::Uuid::new_v4());
    let advertised = SocketAddr::new(local_ip.into(), local_addr.port());

    tracing::info!(
        "\"{}\" ({}) serving {} folder(s) on http://{}",
        config.name,
        udn,
        config.shared_folders.len(),
        advertised
    );
    for folder in &config.shared_folders {
        if folder.is_dir() {
            tracing::info!("  {}", folder.display());
        } else {
            tracing::warn!("  {} (missing, not shown)", folder.display());
        }
    }

    thumbnail::cache::spawn_eviction(config.cache_dir.clone());

    let token = CancellationToken::new();
    let app = build_router(app_state(&config, udn.clone(), advertised));

    let http_token = token.clone();
    let http = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(http_token.cancelled_owned())
            .await
            .unwrap_or_else(|e| tracing::error!("HTTP server error: {}", e));
        tracing::info!("HTTP server stopped");
    });

    let ssdp = config.ssdp.then(|| {
        let ssdp_config = SsdpConfig {
            udn: udn.clone(),
            interface: local_ip,
            http_port: local_addr.port(),
        };
        tokio::spawn(ssdp::service::run(ssdp_config, token.clone()))
    });

    Ok(ServerHandle { token, http, ssdp, local_addr, udn })
}
