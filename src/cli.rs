use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "localstream",
    about = "Share local folders as a DLNA media server and web file browser, and find other DLNA servers",
    long_about = None,
    version,
    arg_required_else_help = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve folders over HTTP and answer SSDP discovery until Ctrl+C
    Serve(ServeArgs),
    /// Look for DLNA servers on the local network
    Scan {
        /// Seconds to wait for answers
        #[arg(short, long, default_value_t = crate::discovery::SCAN_TIMEOUT.as_secs())]
        timeout: u64,
    },
    /// Browse one container of a remote ContentDirectory
    Browse(RemoteArgs),
    /// Write an M3U playlist of every item below a remote container
    Playlist(RemoteArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Folders to share (replace `shared_folders` from the config file)
    pub paths: Vec<PathBuf>,

    /// HTTP port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Friendly server name shown on DLNA client device lists
    #[arg(short, long)]
    pub name: Option<String>,

    /// Path to TOML config file (overrides default search: ./localstream.toml, ~/.config/localstream/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for cached thumbnails
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// ffmpeg executable used for video thumbnails
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Do not answer SSDP discovery requests
    #[arg(long)]
    pub no_ssdp: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Base URL of the server, e.g. http://192.168.1.20:8080
    pub base_url: String,

    /// ContentDirectory control URL, absolute or relative to the base URL
    pub control_url: String,

    /// Object to start from
    #[arg(default_value = "0")]
    pub object_id: String,

    /// Ask for every item below the object in one request (BrowseRecursive)
    #[arg(short, long)]
    pub recursive: bool,
}
