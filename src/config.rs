use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::ServeArgs;

pub const DEFAULT_PORT: u16 = 8080;

fn default_name() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|os| os.into_string().ok())
        .filter(|s| !s.is_empty());
    match host {
        Some(host) => format!("LocalStream ({host})"),
        None => "LocalStream".to_string(),
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("localstream").join("Cache"))
        .unwrap_or_else(|| PathBuf::from("Cache"))
}

fn make_absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub shared_folders: Option<Vec<PathBuf>>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ssdp: Option<bool>,
}

/// Settings for one server run. Never mutated once the server is started;
/// applying new settings means stopping and starting with a new `Config`.
#[derive(Debug, Clone)]
pub struct Config {
    pub shared_folders: Vec<PathBuf>,
    pub port: u16,
    pub name: String,
    pub cache_dir: PathBuf,
    pub ffmpeg: PathBuf,
    pub ssdp: bool,
}

impl Config {
    /// CLI flags win over the config file, which wins over defaults.
    pub fn resolve(file: Option<FileConfig>, args: &ServeArgs) -> Self {
        let file = file.unwrap_or_default();
        let folders = if args.paths.is_empty() {
            file.shared_folders.unwrap_or_default()
        } else {
            args.paths.clone()
        };
        Config {
            shared_folders: folders.into_iter().map(make_absolute).collect(),
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            name: args.name.clone().or(file.name).unwrap_or_else(default_name),
            cache_dir: args
                .cache_dir
                .clone()
                .or(file.cache_dir)
                .unwrap_or_else(default_cache_dir),
            ffmpeg: args
                .ffmpeg
                .clone()
                .or(file.ffmpeg)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            ssdp: !args.no_ssdp && file.ssdp.unwrap_or(true),
        }
    }
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("localstream.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("localstream").join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
