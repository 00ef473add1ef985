//! ViewModel: the watch's copy of the companion's now-playing state.
//!
//! The companion only pushes when something changes, and it pushes sparse
//! updates: a volume nudge carries `_appVolume` and nothing else.  The view
//! model merges those field by field, extrapolates the playback position once
//! a second between pushes, and notices when that extrapolation runs past the
//! end of the track so a fresh snapshot can be requested.

use remote_proto::protocol::StateUpdate;
use tracing::debug;

/// Extent of a full progress bar on the watch face, in pixels.
pub const PROGRESS_BAR_MAX: u16 = 210;
/// Upper bound of both volume scales.
pub const VOLUME_MAX: u8 = 100;

/// Everything the watch knows about the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub position_secs: u64,
    pub duration_secs: f64,
    pub is_playing: bool,
    pub is_shuffling: bool,
    pub app_volume: u8,
    /// Received but not drawn anywhere yet.
    pub system_volume: u8,
    /// Local position has run past the known duration.
    pub is_stale: bool,
    /// An `info` request is out and nothing has come back yet.
    pub info_request_pending: bool,
    pub header_text: String,
    pub main_text: String,
    pub footer_text: String,
}

/// Derived values handed to the face.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub header_text: String,
    pub main_text: String,
    pub footer_text: String,
    pub position_fraction: f64,
    pub volume_fraction: f64,
    pub is_playing: bool,
    pub is_shuffling: bool,
}

impl DisplayState {
    /// Fraction the progress bar should show; volume mode repurposes the bar.
    pub fn progress_fraction(&self, controlling_volume: bool) -> f64 {
        if controlling_volume {
            self.volume_fraction
        } else {
            self.position_fraction
        }
    }

    /// Scale the progress fraction onto a face whose full bar is `max` units.
    pub fn progress_extent(&self, controlling_volume: bool, max: u16) -> u16 {
        scale_extent(self.progress_fraction(controlling_volume), max)
    }
}

/// What a one-second tick asks of the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to draw this second.
    Idle,
    /// Refresh the progress indicator.
    Redraw(DisplayState),
    /// Position overshot the track; send `info`.  The request is already
    /// marked pending.
    RequestRefresh,
}

#[derive(Debug, Clone)]
pub struct ViewModel {
    state: SessionState,
    redraw_every_secs: u64,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ViewModel {
    pub fn new(redraw_every_secs: u64) -> Self {
        Self {
            state: SessionState::default(),
            redraw_every_secs: redraw_every_secs.max(1),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Merge a sparse update.  Hearing from the peer at all, even with no
    /// recognised fields, means local state is no longer stale.
    pub fn reconcile(&mut self, update: &StateUpdate) -> DisplayState {
        let s = &mut self.state;

        if let Some(v) = update.app_volume {
            s.app_volume = clamp_volume(v);
        }
        if let Some(ms) = update.duration_ms {
            s.duration_secs = ms as f64 / 1000.0;
        }
        if let Some(text) = &update.footer_text {
            s.footer_text.clone_from(text);
        }
        if let Some(text) = &update.header_text {
            s.header_text.clone_from(text);
        }
        if let Some(text) = &update.main_text {
            s.main_text.clone_from(text);
        }
        if let Some(playing) = update.playing {
            s.is_playing = playing;
        }
        if let Some(pos) = update.position_secs {
            s.position_secs = pos;
        }
        if let Some(shuffle) = update.shuffle {
            s.is_shuffling = shuffle;
        }
        if let Some(v) = update.system_volume {
            s.system_volume = clamp_volume(v);
        }

        s.is_stale = false;
        s.info_request_pending = false;

        debug!(
            "reconciled: pos={}s dur={}s playing={} vol={}",
            s.position_secs, s.duration_secs, s.is_playing, s.app_volume
        );

        self.display()
    }

    pub fn tick(&mut self) -> TickOutcome {
        let s = &mut self.state;
        if s.is_playing {
            s.position_secs += 1;
        }

        let pos = s.position_secs as f64;
        if pos < s.duration_secs {
            if s.position_secs % self.redraw_every_secs == 0 {
                return TickOutcome::Redraw(self.display());
            }
        } else if pos > s.duration_secs {
            s.is_stale = true;
            if !s.info_request_pending {
                debug!(
                    "position {}s past duration {}s, requesting refresh",
                    s.position_secs, s.duration_secs
                );
                s.info_request_pending = true;
                return TickOutcome::RequestRefresh;
            }
        }

        TickOutcome::Idle
    }

    /// Fraction of the progress bar to fill.  A zero (unknown) duration reads
    /// as an empty bar.
    pub fn progress_fraction(&self, controlling_volume: bool) -> f64 {
        if controlling_volume {
            self.state.app_volume as f64 / VOLUME_MAX as f64
        } else if self.state.duration_secs > 0.0 {
            (self.state.position_secs as f64 / self.state.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Optimistic local flip when a play/pause is sent.
    pub fn toggle_playing(&mut self) {
        self.state.is_playing = !self.state.is_playing;
    }

    pub fn mark_info_requested(&mut self) {
        self.state.info_request_pending = true;
    }

    pub fn display(&self) -> DisplayState {
        DisplayState {
            header_text: self.state.header_text.clone(),
            main_text: self.state.main_text.clone(),
            footer_text: self.state.footer_text.clone(),
            position_fraction: self.progress_fraction(false),
            volume_fraction: self.progress_fraction(true),
            is_playing: self.state.is_playing,
            is_shuffling: self.state.is_shuffling,
        }
    }
}

fn clamp_volume(v: u32) -> u8 {
    v.min(VOLUME_MAX as u32) as u8
}

fn scale_extent(fraction: f64, max: u16) -> u16 {
    (fraction.clamp(0.0, 1.0) * max as f64).round() as u16
}
