use std::path::PathBuf;

/// Where the companion listens unless the config says otherwise.
pub const DEFAULT_PEER_PORT: u16 = 9877;
const DEFAULT_PEER_HOST: &str = "127.0.0.1";

pub fn default_peer_address() -> String {
    format!("{}:{}", DEFAULT_PEER_HOST, DEFAULT_PEER_PORT)
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/wrist-remote/ on unix, same layout everywhere
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| temp_dir())
            .join(".local")
            .join("share")
            .join("wrist-remote")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wrist-remote")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("wrist-remote")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wrist-remote")
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}
