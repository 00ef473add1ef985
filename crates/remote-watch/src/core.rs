//! ClientCore: single-owner event loop for all mutable watch state.
//!
//! Button taps, combo/volume timeouts, the one-second clock and everything
//! the transport hears arrive as `ClientEvent`s on one channel.  ClientCore
//! owns the `ViewModel`, the `InputMultiplexer`, the peer link and the face
//! exclusively; no other task touches them.
//!
//! After each event it pushes whatever changed through the `Face` and asks
//! the face to present a frame.
use std::time::Duration;

use remote_proto::config::Config;
use remote_proto::protocol::{App, Command, CommandRequest, Message, StateUpdate};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::face::{Face, IconSlot, TextRegion};
use crate::input::{Button, InputMultiplexer, InputTimeout};
use crate::transport::PeerLink;
use crate::view_model::{DisplayState, TickOutcome, ViewModel};

// ── ClientEvent ───────────────────────────────────────────────────────────────

/// All inputs into the ClientCore loop.
#[derive(Debug)]
pub enum ClientEvent {
    /// A touch region was activated.
    Tap(Button),
    /// A combo or volume-mode window elapsed.
    InputTimeout(InputTimeout),
    /// One-second clock for position interpolation.
    SecondTick,
    /// Something happened on the companion link.
    Peer(PeerEvent),
    /// Shutdown requested.
    Shutdown,
}

#[derive(Debug)]
pub enum PeerEvent {
    Opened(PeerLink),
    Message(Message),
    Error(TransportError),
    Closed,
}

// ── ClientCore ────────────────────────────────────────────────────────────────

pub struct ClientCore<F: Face> {
    app: App,
    view: ViewModel,
    input: InputMultiplexer,
    /// `None` while the companion is unreachable.
    peer: Option<PeerLink>,
    face: F,
    progress_max: u16,
    event_tx: mpsc::Sender<ClientEvent>,
}

impl<F: Face> ClientCore<F> {
    /// Build the core.  Must be called inside a tokio runtime: input timeouts
    /// are forwarded onto `event_tx` by a helper task.
    pub fn new(config: &Config, face: F, event_tx: mpsc::Sender<ClientEvent>) -> Self {
        let (timeout_tx, mut timeout_rx) = mpsc::unbounded_channel::<InputTimeout>();
        let core_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(timeout) = timeout_rx.recv().await {
                if core_tx.send(ClientEvent::InputTimeout(timeout)).await.is_err() {
                    break;
                }
            }
        });

        Self {
            app: config.peer.app,
            view: ViewModel::new(config.display.progress_redraw_secs),
            input: InputMultiplexer::new(&config.input, timeout_tx),
            peer: None,
            face,
            progress_max: config.display.progress_max,
            event_tx,
        }
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    pub fn face(&self) -> &F {
        &self.face
    }

    /// Run the event loop.  Returns on `Shutdown` or when every sender of
    /// the event channel is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<ClientEvent>) -> anyhow::Result<()> {
        info!("ClientCore: starting event loop");

        let tick_tx = self.event_tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                interval.tick().await;
                if tick_tx.send(ClientEvent::SecondTick).await.is_err() {
                    break;
                }
            }
        });

        self.draw_all();
        self.present();

        loop {
            match event_rx.recv().await {
                None => {
                    info!("ClientCore: event channel closed, shutting down");
                    break;
                }
                Some(ClientEvent::Shutdown) => {
                    info!("ClientCore: shutdown requested");
                    break;
                }
                Some(evt) => {
                    self.handle_event(evt);
                    self.present();
                }
            }
        }

        ticker.abort();
        self.input.reset();
        Ok(())
    }

    pub fn handle_event(&mut self, evt: ClientEvent) {
        match evt {
            ClientEvent::Tap(button) => self.on_tap(button),
            ClientEvent::InputTimeout(timeout) => self.on_input_timeout(timeout),
            ClientEvent::SecondTick => self.on_second_tick(),
            ClientEvent::Peer(evt) => self.on_peer_event(evt),
            ClientEvent::Shutdown => {}
        }
    }

    // ── Event handlers ────────────────────────────────────────────────────────

    fn on_tap(&mut self, button: Button) {
        let was_volume = self.input.is_volume_mode_active();
        if let Some(cmd) = self.input.tap(button) {
            self.send_request(cmd);
        }
        self.draw_buttons();
        if was_volume != self.input.is_volume_mode_active() {
            self.draw_progress();
        }
    }

    fn on_input_timeout(&mut self, timeout: InputTimeout) {
        let was_volume = self.input.is_volume_mode_active();
        if let Some(cmd) = self.input.on_timeout(timeout) {
            if cmd == Command::PlayPause {
                // flip now, the companion confirms later
                self.view.toggle_playing();
            }
            self.send_request(cmd);
        }
        self.draw_buttons();
        if was_volume != self.input.is_volume_mode_active() {
            self.draw_progress();
        }
    }

    fn on_second_tick(&mut self) {
        match self.view.tick() {
            TickOutcome::Idle => {}
            TickOutcome::Redraw(display) => self.draw_progress_from(&display),
            TickOutcome::RequestRefresh => self.send_request(Command::Info),
        }
    }

    fn on_peer_event(&mut self, evt: PeerEvent) {
        match evt {
            PeerEvent::Opened(link) => {
                info!("Messaging open");
                self.peer = Some(link);
                // fetch everything as soon as we can
                self.send_request(Command::Info);
            }
            PeerEvent::Message(Message::Update(update)) => self.on_update(&update),
            PeerEvent::Message(Message::Request(req)) => {
                debug!("Ignoring request frame from companion: {:?}", req);
            }
            PeerEvent::Error(e) => {
                warn!("Connection error: {}", e);
            }
            PeerEvent::Closed => {
                info!("Messaging closed");
                self.peer = None;
            }
        }
    }

    fn on_update(&mut self, update: &StateUpdate) {
        if !update.is_addressed() {
            debug!("Ignoring update without app identifier");
            return;
        }
        let display = self.view.reconcile(update);
        self.draw_display(&display);
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Send a command to the companion if the link is open; otherwise drop
    /// it.  An `info` request is marked pending either way.
    fn send_request(&mut self, command: Command) {
        let request = CommandRequest {
            app: self.app,
            command,
        };

        match self.peer.as_ref().filter(|link| link.is_open()) {
            Some(link) => {
                info!("Sending request: {}", command);
                if let Err(e) = link.send(&Message::Request(request)) {
                    warn!("Request {} dropped: {}", command, e);
                }
            }
            None => {
                info!("Not sending request {}: {}", command, TransportError::NotReady);
            }
        }

        if command == Command::Info {
            self.view.mark_info_requested();
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw_all(&mut self) {
        let display = self.view.display();
        self.draw_display(&display);
    }

    fn draw_display(&mut self, display: &DisplayState) {
        self.face.set_text(TextRegion::Header, &display.header_text);
        self.face.set_text(TextRegion::Main, &display.main_text);
        self.face.set_text(TextRegion::Footer, &display.footer_text);
        self.draw_progress_from(display);
        self.draw_buttons();
    }

    fn draw_progress(&mut self) {
        let display = self.view.display();
        self.draw_progress_from(&display);
    }

    fn draw_progress_from(&mut self, display: &DisplayState) {
        let extent =
            display.progress_extent(self.input.is_volume_mode_active(), self.progress_max);
        self.face.set_progress(extent);
    }

    fn draw_buttons(&mut self) {
        let icons = self.input.icons(self.view.is_playing());
        self.face.set_icon(IconSlot::TopRight, icons.top_right);
        self.face.set_icon(IconSlot::BottomRight, icons.bottom_right);
    }

    fn present(&mut self) {
        if let Err(e) = self.face.present() {
            warn!("Face failed to present: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::Icon;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingFace {
        texts: HashMap<TextRegion, String>,
        progress: u16,
        icons: HashMap<IconSlot, Icon>,
    }

    impl Face for RecordingFace {
        fn set_text(&mut self, region: TextRegion, text: &str) {
            self.texts.insert(region, text.to_string());
        }

        fn set_progress(&mut self, extent: u16) {
            self.progress = extent;
        }

        fn set_icon(&mut self, slot: IconSlot, icon: Icon) {
            self.icons.insert(slot, icon);
        }
    }

    struct Harness {
        core: ClientCore<RecordingFace>,
        event_rx: mpsc::Receiver<ClientEvent>,
        frames_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    }

    impl Harness {
        fn new() -> Self {
            let (event_tx, event_rx) = mpsc::channel(64);
            let core = ClientCore::new(&Config::default(), RecordingFace::default(), event_tx);
            let (_, frames_rx) = mpsc::unbounded_channel();
            Self {
                core,
                event_rx,
                frames_rx,
            }
        }

        /// Open a fake link and swallow the `info` request it triggers.
        fn open(&mut self) {
            let (frames_tx, frames_rx) = mpsc::unbounded_channel();
            self.frames_rx = frames_rx;
            self.core
                .handle_event(ClientEvent::Peer(PeerEvent::Opened(PeerLink::new(frames_tx))));
            assert_eq!(self.sent(), vec![Command::Info]);
        }

        fn sent(&mut self) -> Vec<Command> {
            let mut out = Vec::new();
            while let Ok(frame) = self.frames_rx.try_recv() {
                match Message::decode(&frame).unwrap().0 {
                    Message::Request(req) => {
                        assert_eq!(req.app, App::Spotify);
                        out.push(req.command);
                    }
                    other => panic!("unexpected frame {:?}", other),
                }
            }
            out
        }

        fn update(&mut self, update: StateUpdate) {
            self.core
                .handle_event(ClientEvent::Peer(PeerEvent::Message(Message::Update(update))));
        }

        fn tap(&mut self, button: Button) {
            self.core.handle_event(ClientEvent::Tap(button));
        }

        /// Deliver the next timer event, like `run` would.
        async fn next_timeout(&mut self) {
            match self.event_rx.recv().await {
                Some(evt @ ClientEvent::InputTimeout(_)) => self.core.handle_event(evt),
                other => panic!("expected input timeout, got {:?}", other),
            }
        }

        fn icon(&self, slot: IconSlot) -> Option<Icon> {
            self.core.face().icons.get(&slot).copied()
        }
    }

    fn spotify(update: StateUpdate) -> StateUpdate {
        StateUpdate {
            app: Some(App::Spotify),
            ..update
        }
    }

    #[tokio::test(start_paused = true)]
    async fn opening_link_requests_info() {
        let mut h = Harness::new();
        h.open();
        assert!(h.core.view().state().info_request_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn update_reaches_face() {
        let mut h = Harness::new();
        h.open();
        h.update(spotify(StateUpdate {
            header_text: Some("Artist".into()),
            main_text: Some("Title".into()),
            footer_text: Some("Album".into()),
            position_secs: Some(100),
            duration_ms: Some(200_000),
            playing: Some(true),
            ..Default::default()
        }));

        let face = h.core.face();
        assert_eq!(face.texts[&TextRegion::Header], "Artist");
        assert_eq!(face.texts[&TextRegion::Main], "Title");
        assert_eq!(face.texts[&TextRegion::Footer], "Album");
        assert_eq!(face.progress, 105);
        assert_eq!(h.icon(IconSlot::BottomRight), Some(Icon::Pause));
        assert!(!h.core.view().state().info_request_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_app_is_dropped() {
        let mut h = Harness::new();
        h.open();
        h.update(StateUpdate {
            main_text: Some("nope".into()),
            ..Default::default()
        });

        let state = h.core.view().state();
        assert_eq!(state.main_text, "");
        // not even counted as hearing from the peer
        assert!(state.info_request_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn combo_playpause_flips_local_state() {
        let mut h = Harness::new();
        h.open();

        h.tap(Button::BottomRight);
        assert_eq!(h.icon(IconSlot::BottomRight), Some(Icon::Next));
        assert!(h.sent().is_empty());

        h.next_timeout().await;
        assert_eq!(h.sent(), vec![Command::PlayPause]);
        assert!(h.core.view().is_playing());
        assert_eq!(h.icon(IconSlot::BottomRight), Some(Icon::Pause));
    }

    #[tokio::test(start_paused = true)]
    async fn combo_next_and_previous() {
        let mut h = Harness::new();
        h.open();

        h.tap(Button::BottomRight);
        h.tap(Button::BottomRight);
        h.next_timeout().await;
        assert_eq!(h.sent(), vec![Command::Next]);
        assert!(!h.core.view().is_playing());

        h.tap(Button::BottomRight);
        h.tap(Button::BottomRight);
        h.tap(Button::BottomRight);
        assert_eq!(h.sent(), vec![Command::Previous]);
        assert_eq!(h.icon(IconSlot::BottomRight), Some(Icon::Play));
    }

    #[tokio::test(start_paused = true)]
    async fn volume_mode_shows_volume_on_progress_bar() {
        let mut h = Harness::new();
        h.open();
        h.update(spotify(StateUpdate {
            app_volume: Some(50),
            position_secs: Some(0),
            duration_ms: Some(100_000),
            ..Default::default()
        }));
        assert_eq!(h.core.face().progress, 0);

        h.tap(Button::TopRight);
        assert_eq!(h.core.face().progress, 105);
        assert_eq!(h.icon(IconSlot::TopRight), Some(Icon::VolumeUp));
        assert!(h.sent().is_empty());

        h.tap(Button::TopRight);
        h.tap(Button::BottomRight);
        assert_eq!(h.sent(), vec![Command::VolumeUp, Command::VolumeDown]);

        h.next_timeout().await;
        assert_eq!(h.core.face().progress, 0);
        assert_eq!(h.icon(IconSlot::TopRight), Some(Icon::More));
    }

    #[tokio::test(start_paused = true)]
    async fn overshoot_sends_one_info_request() {
        let mut h = Harness::new();
        h.open();
        h.update(spotify(StateUpdate {
            position_secs: Some(10),
            duration_ms: Some(10_000),
            playing: Some(true),
            ..Default::default()
        }));

        for _ in 0..4 {
            h.core.handle_event(ClientEvent::SecondTick);
        }
        assert_eq!(h.sent(), vec![Command::Info]);
        assert!(h.core.view().state().is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_dropped_while_closed() {
        let mut h = Harness::new();
        h.open();
        h.core.handle_event(ClientEvent::Peer(PeerEvent::Closed));

        h.tap(Button::TopRight);
        h.tap(Button::TopRight);
        assert!(h.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn info_marked_pending_even_without_link() {
        let mut h = Harness::new();
        h.update(spotify(StateUpdate {
            playing: Some(true),
            ..Default::default()
        }));
        h.core.handle_event(ClientEvent::SecondTick);
        assert!(h.core.view().state().info_request_pending);
        // already pending: a later overshoot stays quiet
        h.core.handle_event(ClientEvent::SecondTick);
        assert!(h.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_on_shutdown() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let core = ClientCore::new(&Config::default(), RecordingFace::default(), event_tx.clone());
        event_tx.send(ClientEvent::Shutdown).await.unwrap();
        core.run(event_rx).await.unwrap();
    }
}
