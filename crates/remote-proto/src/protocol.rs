use serde::{Deserialize, Serialize};

/// Largest frame body we are willing to buffer.  Anything bigger is treated
/// as garbage on the wire.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Commands the watch asks the companion to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "play")]
    Play,
    #[serde(rename = "pause")]
    Pause,
    #[serde(rename = "playpause")]
    PlayPause,
    #[serde(rename = "next")]
    Next,
    #[serde(rename = "previous")]
    Previous,
    #[serde(rename = "volume_up")]
    VolumeUp,
    #[serde(rename = "volume_down")]
    VolumeDown,
    /// Ask the companion for a full state snapshot.
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "enable_shuffle")]
    EnableShuffle,
    #[serde(rename = "disable_shuffle")]
    DisableShuffle,
}

impl Command {
    /// The string the companion matches on.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Play => "play",
            Command::Pause => "pause",
            Command::PlayPause => "playpause",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::VolumeUp => "volume_up",
            Command::VolumeDown => "volume_down",
            Command::Info => "info",
            Command::EnableShuffle => "enable_shuffle",
            Command::DisableShuffle => "disable_shuffle",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media applications the companion knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum App {
    #[default]
    Spotify,
    #[serde(rename = "iTunes")]
    ITunes,
    PowerPoint,
    Keynote,
    System,
}

/// Messages sent from the watch to the companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "_app")]
    pub app: App,
    #[serde(rename = "_command")]
    pub command: Command,
}

/// Sparse state push from the companion.  Every field is optional; a present
/// field overwrites the watch's copy, an absent one leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(rename = "_app", default, skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
    /// Application volume, 0..=100.
    #[serde(rename = "_appVolume", default, skip_serializing_if = "Option::is_none")]
    pub app_volume: Option<u32>,
    /// Track length in milliseconds.
    #[serde(rename = "_duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(rename = "_footerText", default, skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(rename = "_headerText", default, skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    #[serde(rename = "_mainText", default, skip_serializing_if = "Option::is_none")]
    pub main_text: Option<String>,
    #[serde(rename = "_playing", default, skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
    /// Playback position in whole seconds.
    #[serde(rename = "_position", default, skip_serializing_if = "Option::is_none")]
    pub position_secs: Option<u64>,
    #[serde(rename = "_shuffle", default, skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<bool>,
    /// System volume, 0..=100.
    #[serde(rename = "_sysVolume", default, skip_serializing_if = "Option::is_none")]
    pub system_volume: Option<u32>,
}

impl StateUpdate {
    /// Updates without an application identifier are not meant for us.
    pub fn is_addressed(&self) -> bool {
        self.app.is_some()
    }
}

/// Wrapper for socket communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(CommandRequest),
    Update(StateUpdate),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        if json.len() > MAX_FRAME_LEN {
            anyhow::bail!("Frame of {} bytes exceeds limit", json.len());
        }
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    /// Total length (header included) of the first frame in `data`, or `None`
    /// while the frame is still incomplete.
    pub fn frame_len(data: &[u8]) -> Option<usize> {
        if data.len() < 4 {
            return None;
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if data.len() < 4 + len {
            return None;
        }
        Some(4 + len)
    }

    /// Length announced by the header of the first frame, if the header is
    /// complete.
    pub fn announced_len(data: &[u8]) -> Option<usize> {
        if data.len() < 4 {
            return None;
        }
        Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize)
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        if data.len() < 4 {
            anyhow::bail!("Insufficient data for length header");
        }
        let Some(total) = Self::frame_len(data) else {
            anyhow::bail!("Insufficient data for message");
        };
        let msg: Self = serde_json::from_slice(&data[4..total])?;
        Ok((msg, total))
    }
}
