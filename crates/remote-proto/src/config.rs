use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;
use super::protocol::App;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub peer: PeerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// How to reach the companion and which application it should drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    #[serde(default = "platform::default_peer_address")]
    pub address: String,
    #[serde(default)]
    pub app: App,
    /// Pause between reconnect attempts after the link drops.
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

/// Timing windows for the two-button multiplexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Debounce window between taps on the combo button.
    #[serde(default = "default_combo_window_ms")]
    pub combo_window_ms: u64,
    /// Inactivity window before volume mode hands the buttons back.
    #[serde(default = "default_volume_window_ms")]
    pub volume_window_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Extent of a full progress bar, in face units.
    #[serde(default = "default_progress_max")]
    pub progress_max: u16,
    /// While playing, redraw the progress bar every this many seconds.
    #[serde(default = "default_progress_redraw_secs")]
    pub progress_redraw_secs: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            address: platform::default_peer_address(),
            app: App::default(),
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            combo_window_ms: default_combo_window_ms(),
            volume_window_ms: default_volume_window_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            progress_max: default_progress_max(),
            progress_redraw_secs: default_progress_redraw_secs(),
        }
    }
}

impl PeerConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs.max(1))
    }
}

impl InputConfig {
    pub fn combo_window(&self) -> Duration {
        Duration::from_millis(self.combo_window_ms)
    }

    pub fn volume_window(&self) -> Duration {
        Duration::from_millis(self.volume_window_ms)
    }
}

fn default_reconnect_secs() -> u64 {
    3
}

fn default_combo_window_ms() -> u64 {
    500
}

fn default_volume_window_ms() -> u64 {
    2000
}

fn default_progress_max() -> u16 {
    210
}

fn default_progress_redraw_secs() -> u64 {
    5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            tracing::info!("Wrote default config to {:?}", config_path);
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
