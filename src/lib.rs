//! Share local folders as a DLNA/UPnP media server and a browsable web file
//! server, and discover and browse other DLNA servers on the network.

pub mod authority;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod media;
pub mod server;
pub mod ssdp;
pub mod thumbnail;
