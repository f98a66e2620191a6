use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use clap::Parser;

use localstream::cli::{Cli, Command, RemoteArgs, ServeArgs};
use localstream::discovery::{playlist, DiscoveryClient};
use localstream::{config, server};

/// Set to true once the first Ctrl+C is received. Second Ctrl+C force-exits.
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Wait for the first Ctrl+C and arm the force-exit on the second.
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for Ctrl+C: {}", e);
        return;
    }
    SHUTTING_DOWN.store(true, Ordering::SeqCst);
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() && SHUTTING_DOWN.load(Ordering::SeqCst) {
            eprintln!("\nlocalstream: forced exit");
            std::process::exit(1);
        }
    });
}

async fn serve(args: ServeArgs) -> ExitCode {
    let file_config = config::find_config_file(args.config.as_deref()).and_then(|path| {
        match config::load_config(&path) {
            Ok(cfg) => {
                tracing::debug!("Loaded config from {}", path.display());
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                None
            }
        }
    });
    let config = Arc::new(config::Config::resolve(file_config, &args));
    if config.shared_folders.is_empty() {
        tracing::warn!("no shared folders configured, only the empty root will be visible");
    }

    let handle = match server::start(config).await {
        Ok(handle) => handle,
        Err(_) => return ExitCode::FAILURE,
    };

    wait_for_shutdown().await;
    tracing::info!("Shutting down...");
    handle.stop();
    if tokio::time::timeout(Duration::from_secs(5), handle.wait()).await.is_err() {
        tracing::warn!("in-flight transfers still running, exiting anyway");
    }
    tracing::info!("Goodbye.");
    ExitCode::SUCCESS
}

async fn scan(timeout: u64) -> ExitCode {
    let servers = DiscoveryClient::new().scan(Duration::from_secs(timeout)).await;
    if servers.is_empty() {
        println!("No DLNA servers found.");
    }
    for s in servers {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            s.friendly_name,
            s.ip,
            s.manufacturer,
            s.base_url,
            s.control_url.as_deref().unwrap_or("-")
        );
    }
    ExitCode::SUCCESS
}

async fn browse(args: RemoteArgs) -> ExitCode {
    let client = DiscoveryClient::new();
    match client
        .browse_remote(&args.control_url, &args.base_url, &args.object_id, args.recursive)
        .await
    {
        Ok(entries) => {
            for e in entries {
                if e.is_folder {
                    println!("[{}]\t{}", e.title, e.id);
                } else {
                    println!("{}\t{}", e.title, e.url.as_deref().unwrap_or("-"));
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: browse failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn make_playlist(args: RemoteArgs) -> ExitCode {
    let client = DiscoveryClient::new();
    let items = if args.recursive {
        // one BrowseRecursive round trip, understood by localstream servers
        match client
            .browse_remote(&args.control_url, &args.base_url, &args.object_id, true)
            .await
        {
            Ok(entries) => entries.into_iter().filter(|e| e.url.is_some()).collect(),
            Err(e) => {
                eprintln!("error: browse failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        client
            .collect_playlist(&args.control_url, &args.base_url, &args.object_id)
            .await
    };
    if items.is_empty() {
        eprintln!("error: no playable items found");
        return ExitCode::FAILURE;
    }
    match playlist::write_m3u(&items).await {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: cannot write playlist: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Scan { timeout } => scan(timeout).await,
        Command::Browse(args) => browse(args).await,
        Command::Playlist(args) => make_playlist(args).await,
    }
}
