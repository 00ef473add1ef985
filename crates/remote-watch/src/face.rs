//! Rendering boundary.
//!
//! The core never draws anything itself; it pushes text, a progress extent and
//! icon identifiers through `Face`.  Whatever sits behind the trait (a watch
//! SDK, a terminal, a test recorder) owns the actual pixels.

/// The three free-form text areas of the now-playing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRegion {
    Header,
    Main,
    Footer,
}

/// The two icon areas, one per touch region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconSlot {
    TopRight,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Play,
    Pause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    /// The "..." that opens volume mode.
    More,
}

impl Icon {
    /// Asset file name on the watch.
    pub fn asset_name(&self) -> &'static str {
        match self {
            Icon::Play => "icn_musictray_play_p.png",
            Icon::Pause => "icn_musictray_pause_p.png",
            Icon::Next => "icn_musictray_next_p.png",
            Icon::Previous => "icn_musictray_previous_p.png",
            Icon::VolumeUp => "icn_musictray_volumeup_p.png",
            Icon::VolumeDown => "icn_musictray_volumedown_p.png",
            Icon::More => "icn_musictray_more_p.png",
        }
    }

    /// Single-cell stand-in for terminals.
    pub fn glyph(&self) -> &'static str {
        match self {
            Icon::Play => "▶",
            Icon::Pause => "⏸",
            Icon::Next => "⏭",
            Icon::Previous => "⏮",
            Icon::VolumeUp => "+",
            Icon::VolumeDown => "-",
            Icon::More => "…",
        }
    }
}

/// Icons for both touch regions at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonIcons {
    pub top_right: Icon,
    pub bottom_right: Icon,
}

pub trait Face {
    fn set_text(&mut self, region: TextRegion, text: &str);

    /// `extent` is in face units, `0..=progress_max`.
    fn set_progress(&mut self, extent: u16);

    fn set_icon(&mut self, slot: IconSlot, icon: Icon);

    /// Flush pending changes to the screen.
    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
