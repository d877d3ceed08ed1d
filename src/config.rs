use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_MB: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reads `SPLITTER_ADDR`, `UPLOAD_DIR` and `MAX_UPLOAD_MB`; bad values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(addr) = lookup("SPLITTER_ADDR") {
            match addr.parse() {
                Ok(addr) => config.addr = addr,
                Err(e) => tracing::warn!("Ignoring SPLITTER_ADDR={:?}: {}", addr, e),
            }
        }

        if let Some(dir) = lookup("UPLOAD_DIR").filter(|d| !d.trim().is_empty()) {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(mb) = lookup("MAX_UPLOAD_MB") {
            match mb.parse::<usize>() {
                Ok(mb) if mb > 0 => config.max_upload_bytes = mb * 1024 * 1024,
                _ => tracing::warn!("Ignoring MAX_UPLOAD_MB={:?}", mb),
            }
        }

        config
    }
}
