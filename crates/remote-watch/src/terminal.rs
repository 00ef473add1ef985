//! Terminal stand-in for the watch screen.
//!
//! `TerminalFace` keeps the last values pushed through `Face` and draws them
//! with ratatui on `present`.  `spawn_key_reader` turns key presses into the
//! two touch-region taps.

use std::io;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use unicode_width::UnicodeWidthChar;

use crate::core::ClientEvent;
use crate::face::{Face, Icon, IconSlot, TextRegion};
use crate::input::Button;

const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
const C_PLAYING: Color = Color::Rgb(80, 200, 120);
const C_BORDER: Color = Color::Rgb(40, 40, 52);

/// What the screen currently shows.
#[derive(Debug, Clone)]
struct Screen {
    header: String,
    main: String,
    footer: String,
    progress: u16,
    top_right: Icon,
    bottom_right: Icon,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            header: String::new(),
            main: String::new(),
            footer: String::new(),
            progress: 0,
            top_right: Icon::More,
            bottom_right: Icon::Play,
        }
    }
}

pub struct TerminalFace {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    screen: Screen,
    progress_max: u16,
    dirty: bool,
}

impl TerminalFace {
    /// Switch the terminal to raw mode on the alternate screen.  The terminal
    /// is restored when the face is dropped.
    pub fn new(progress_max: u16) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("terminal face ready, size={:?}", terminal.size());
        Ok(Self {
            terminal,
            screen: Screen::default(),
            progress_max: progress_max.max(1),
            dirty: true,
        })
    }
}

impl Face for TerminalFace {
    fn set_text(&mut self, region: TextRegion, text: &str) {
        let slot = match region {
            TextRegion::Header => &mut self.screen.header,
            TextRegion::Main => &mut self.screen.main,
            TextRegion::Footer => &mut self.screen.footer,
        };
        if *slot != text {
            text.clone_into(slot);
            self.dirty = true;
        }
    }

    fn set_progress(&mut self, extent: u16) {
        let extent = extent.min(self.progress_max);
        if self.screen.progress != extent {
            self.screen.progress = extent;
            self.dirty = true;
        }
    }

    fn set_icon(&mut self, slot: IconSlot, icon: Icon) {
        let current = match slot {
            IconSlot::TopRight => &mut self.screen.top_right,
            IconSlot::BottomRight => &mut self.screen.bottom_right,
        };
        if *current != icon {
            trace!("icon {:?} -> {}", slot, icon.asset_name());
            *current = icon;
            self.dirty = true;
        }
    }

    fn present(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let screen = &self.screen;
        let progress_max = self.progress_max;
        self.terminal.draw(|f| draw_screen(f, screen, progress_max))?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for TerminalFace {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn draw_screen(frame: &mut Frame, screen: &Screen, progress_max: u16) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_BORDER));
    let inner = outer.inner(frame.area());
    frame.render_widget(outer, frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(7)])
        .split(inner);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(columns[0]);

    let width = rows[0].width as usize;
    frame.render_widget(
        Paragraph::new(truncate(&screen.header, width)).style(Style::default().fg(C_SECONDARY)),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(screen.main.as_str())
            .style(
                Style::default()
                    .fg(C_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )
            .wrap(Wrap { trim: true }),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(truncate(&screen.footer, width)).style(Style::default().fg(C_SECONDARY)),
        rows[2],
    );
    draw_progress(frame, rows[3], screen.progress, progress_max);
    draw_icons(frame, columns[1], screen.top_right, screen.bottom_right);
}

fn draw_progress(frame: &mut Frame, area: Rect, extent: u16, max: u16) {
    if area.width == 0 {
        return;
    }
    let width = area.width as usize;

    // Unicode smooth fill: 8 eighths per cell
    let eighths = extent as usize * width * 8 / max as usize;
    let full_blocks = (eighths / 8).min(width);
    let partial = eighths % 8;

    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let mut bar = String::with_capacity(width + 4);
    for _ in 0..full_blocks {
        bar.push('█');
    }
    if full_blocks < width {
        bar.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            bar.push(' ');
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(bar, Style::default().fg(C_PLAYING)))),
        area,
    );
}

fn draw_icons(frame: &mut Frame, area: Rect, top_right: Icon, bottom_right: Icon) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (area, icon, key) in [(halves[0], top_right, "t"), (halves[1], bottom_right, "b")] {
        let lines = vec![
            Line::from(Span::styled(
                icon.glyph(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(key, Style::default().fg(C_SECONDARY))),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::LEFT)
                    .border_style(Style::default().fg(C_BORDER)),
            ),
            area,
        );
    }
}

/// Cut `text` to at most `width` terminal cells, ending in an ellipsis when
/// anything was dropped.
fn truncate(text: &str, width: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Map a key to a touch region, or to a quit request.
pub fn key_to_event(code: KeyCode) -> Option<ClientEvent> {
    match code {
        KeyCode::Char('t') | KeyCode::Up => Some(ClientEvent::Tap(Button::TopRight)),
        KeyCode::Char('b') | KeyCode::Char(' ') | KeyCode::Down => {
            Some(ClientEvent::Tap(Button::BottomRight))
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(ClientEvent::Shutdown),
        _ => None,
    }
}

/// Read terminal key events on a blocking thread and forward them as taps.
pub fn spawn_key_reader(event_tx: mpsc::Sender<ClientEvent>) {
    tokio::task::spawn_blocking(move || loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if let Some(evt) = key_to_event(key.code) {
                    let quit = matches!(evt, ClientEvent::Shutdown);
                    if event_tx.blocking_send(evt).is_err() || quit {
                        break;
                    }
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });
}
