//! InputMultiplexer: two physical buttons, seven logical actions.
//!
//! The bottom-right button is a tap combo: one tap is play/pause, two taps
//! is next, three is previous.  Play/pause and next wait out a debounce window
//! in case another tap follows; the third tap commits immediately since no
//! further refinement is possible.
//!
//! The top-right button opens volume mode.  While it is active both buttons
//! send volume up/down directly, and every tap slides the inactivity window
//! forward.  The mode closes on its own once the window passes untouched.
//!
//! Timeouts come back through the core's event channel as `InputTimeout`
//! values stamped with a generation.  A timeout whose generation is stale
//! (its slot was re-armed or cancelled after it was sent) is ignored.

use std::time::Duration;

use remote_proto::config::InputConfig;
use remote_proto::protocol::Command;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::face::{ButtonIcons, Icon};
use crate::timer::ScheduledTask;

/// Physical touch regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    TopRight,
    BottomRight,
}

/// Where the bottom-right combo stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComboState {
    #[default]
    Idle,
    /// One tap so far; expiry sends play/pause.
    AwaitingPlayPause,
    /// Two taps so far; expiry sends next, another tap sends previous.
    AwaitingNext,
}

/// Timer expiry, posted back to the core loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTimeout {
    Combo(u64),
    VolumeMode(u64),
}

pub struct InputMultiplexer {
    combo: ComboState,
    combo_timer: ScheduledTask,
    combo_generation: u64,
    volume_mode: bool,
    volume_timer: ScheduledTask,
    volume_generation: u64,
    combo_window: Duration,
    volume_window: Duration,
    timeout_tx: mpsc::UnboundedSender<InputTimeout>,
}

impl InputMultiplexer {
    pub fn new(config: &InputConfig, timeout_tx: mpsc::UnboundedSender<InputTimeout>) -> Self {
        Self {
            combo: ComboState::Idle,
            combo_timer: ScheduledTask::new(),
            combo_generation: 0,
            volume_mode: false,
            volume_timer: ScheduledTask::new(),
            volume_generation: 0,
            combo_window: config.combo_window(),
            volume_window: config.volume_window(),
            timeout_tx,
        }
    }

    pub fn combo_state(&self) -> ComboState {
        self.combo
    }

    pub fn is_volume_mode_active(&self) -> bool {
        self.volume_mode
    }

    pub fn is_combo_armed(&self) -> bool {
        self.combo_timer.is_armed()
    }

    /// Handle a tap.  Returns a command when the tap commits one right away.
    pub fn tap(&mut self, button: Button) -> Option<Command> {
        trace!("tap {:?} combo={:?} volume_mode={}", button, self.combo, self.volume_mode);

        if self.volume_mode {
            self.arm_volume_timer();
            return Some(match button {
                Button::TopRight => Command::VolumeUp,
                Button::BottomRight => Command::VolumeDown,
            });
        }

        match button {
            Button::TopRight => {
                debug!("volume mode on");
                self.volume_mode = true;
                self.arm_volume_timer();
                None
            }
            Button::BottomRight => self.advance_combo(),
        }
    }

    /// Handle a timer expiry.  Returns the command a combo resolved to, if any.
    pub fn on_timeout(&mut self, timeout: InputTimeout) -> Option<Command> {
        match timeout {
            InputTimeout::Combo(generation) if generation == self.combo_generation => {
                self.combo_timer.clear();
                let resolved = match std::mem::take(&mut self.combo) {
                    ComboState::AwaitingPlayPause => Some(Command::PlayPause),
                    ComboState::AwaitingNext => Some(Command::Next),
                    ComboState::Idle => None,
                };
                debug!("combo window closed: {:?}", resolved);
                resolved
            }
            InputTimeout::VolumeMode(generation) if generation == self.volume_generation => {
                self.volume_timer.clear();
                if self.volume_mode {
                    debug!("volume mode off");
                    self.volume_mode = false;
                }
                None
            }
            stale => {
                trace!("ignoring stale {:?}", stale);
                None
            }
        }
    }

    /// Drop any half-entered combo without sending it.
    pub fn cancel_combo(&mut self) {
        self.combo_timer.cancel();
        self.combo_generation += 1;
        self.combo = ComboState::Idle;
    }

    /// Cancel both timer slots and return to the resting state.
    pub fn reset(&mut self) {
        self.cancel_combo();
        self.volume_timer.cancel();
        self.volume_generation += 1;
        self.volume_mode = false;
    }

    /// Icons for the current state.  Volume mode takes over both buttons.
    pub fn icons(&self, is_playing: bool) -> ButtonIcons {
        if self.volume_mode {
            return ButtonIcons {
                top_right: Icon::VolumeUp,
                bottom_right: Icon::VolumeDown,
            };
        }

        let bottom_right = match self.combo {
            ComboState::Idle if is_playing => Icon::Pause,
            ComboState::Idle => Icon::Play,
            ComboState::AwaitingPlayPause => Icon::Next,
            ComboState::AwaitingNext => Icon::Previous,
        };
        ButtonIcons {
            top_right: Icon::More,
            bottom_right,
        }
    }

    fn advance_combo(&mut self) -> Option<Command> {
        match self.combo {
            ComboState::Idle => {
                self.combo = ComboState::AwaitingPlayPause;
                self.arm_combo_timer();
                None
            }
            ComboState::AwaitingPlayPause => {
                self.combo = ComboState::AwaitingNext;
                self.arm_combo_timer();
                None
            }
            ComboState::AwaitingNext => {
                self.cancel_combo();
                debug!("combo committed: previous");
                Some(Command::Previous)
            }
        }
    }

    fn arm_combo_timer(&mut self) {
        self.combo_generation += 1;
        self.combo_timer.schedule(
            self.combo_window,
            self.timeout_tx.clone(),
            InputTimeout::Combo(self.combo_generation),
        );
    }

    fn arm_volume_timer(&mut self) {
        self.volume_generation += 1;
        self.volume_timer.schedule(
            self.volume_window,
            self.timeout_tx.clone(),
            InputTimeout::VolumeMode(self.volume_generation),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mux() -> (InputMultiplexer, mpsc::UnboundedReceiver<InputTimeout>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (InputMultiplexer::new(&InputConfig::default(), tx), rx)
    }

    /// Wait for the next timeout and feed it back, like the core loop does.
    async fn resolve(
        mux: &mut InputMultiplexer,
        rx: &mut mpsc::UnboundedReceiver<InputTimeout>,
    ) -> Option<Command> {
        let timeout = rx.recv().await.expect("timer channel closed");
        mux.on_timeout(timeout)
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<InputTimeout>) {
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn single_tap_resolves_to_playpause() {
        let (mut mux, mut rx) = mux();
        let start = tokio::time::Instant::now();

        assert_eq!(mux.tap(Button::BottomRight), None);
        assert_eq!(mux.combo_state(), ComboState::AwaitingPlayPause);
        assert_eq!(mux.icons(false).bottom_right, Icon::Next);

        assert_eq!(resolve(&mut mux, &mut rx).await, Some(Command::PlayPause));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert!(!mux.is_combo_armed());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn double_tap_resolves_to_next() {
        let (mut mux, mut rx) = mux();

        mux.tap(Button::BottomRight);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(mux.tap(Button::BottomRight), None);
        assert_eq!(mux.icons(true).bottom_right, Icon::Previous);

        assert_eq!(resolve(&mut mux, &mut rx).await, Some(Command::Next));
        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn triple_tap_commits_previous_immediately() {
        let (mut mux, mut rx) = mux();

        assert_eq!(mux.tap(Button::BottomRight), None);
        assert_eq!(mux.tap(Button::BottomRight), None);
        assert_eq!(mux.tap(Button::BottomRight), Some(Command::Previous));

        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert!(!mux.is_combo_armed());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn late_timeout_from_replaced_window_is_ignored() {
        let (mut mux, _rx) = mux();

        mux.tap(Button::BottomRight);
        let first = InputTimeout::Combo(mux.combo_generation);
        mux.tap(Button::BottomRight);

        assert_eq!(mux.on_timeout(first), None);
        assert_eq!(mux.combo_state(), ComboState::AwaitingNext);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_cancel_does_not_resolve() {
        let (mut mux, mut rx) = mux();

        mux.tap(Button::BottomRight);
        mux.cancel_combo();
        mux.cancel_combo();

        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert!(!mux.is_combo_armed());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn volume_mode_window_slides_with_each_tap() {
        let (mut mux, mut rx) = mux();

        assert_eq!(mux.tap(Button::TopRight), None);
        assert!(mux.is_volume_mode_active());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(mux.tap(Button::BottomRight), Some(Command::VolumeDown));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(rx.try_recv().is_err());
        assert!(mux.is_volume_mode_active());

        // untouched for the full window: mode closes
        assert_eq!(resolve(&mut mux, &mut rx).await, None);
        assert!(!mux.is_volume_mode_active());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn volume_mode_repurposes_both_buttons() {
        let (mut mux, _rx) = mux();

        mux.tap(Button::TopRight);
        assert_eq!(mux.tap(Button::TopRight), Some(Command::VolumeUp));
        assert_eq!(mux.tap(Button::BottomRight), Some(Command::VolumeDown));
        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert_eq!(
            mux.icons(true),
            ButtonIcons {
                top_right: Icon::VolumeUp,
                bottom_right: Icon::VolumeDown,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn volume_mode_overrides_pending_combo_icon() {
        let (mut mux, mut rx) = mux();

        mux.tap(Button::BottomRight);
        mux.tap(Button::TopRight);
        assert_eq!(mux.icons(false).bottom_right, Icon::VolumeDown);

        // the combo keeps its own clock
        assert_eq!(resolve(&mut mux, &mut rx).await, Some(Command::PlayPause));
        assert!(mux.is_volume_mode_active());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_icons_follow_play_state() {
        let (mux, _rx) = mux();
        assert_eq!(
            mux.icons(true),
            ButtonIcons {
                top_right: Icon::More,
                bottom_right: Icon::Pause,
            }
        );
        assert_eq!(mux.icons(false).bottom_right, Icon::Play);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_closes_volume_mode_and_combo() {
        let (mut mux, mut rx) = mux();

        mux.tap(Button::BottomRight);
        mux.tap(Button::TopRight);
        mux.reset();

        assert!(!mux.is_volume_mode_active());
        assert_eq!(mux.combo_state(), ComboState::Idle);
        assert_quiet(&mut rx).await;
    }
}
