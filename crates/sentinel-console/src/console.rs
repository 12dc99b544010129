//! Live dashboard console.
//!
//! A full-screen TUI over the [`Compositor`]: a header with the refresh
//! state, a sidebar listing every view, the active view's panel and a
//! footer with the most recent message and the key bindings.
//!
//! Launch with `sentinel-console` (or `sentinel-console console`).

use std::io::{self, Stdout};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};

use sentinel_refresh::{Compositor, RefreshConfig, SessionSnapshot, ViewStatus};
use sentinel_telemetry::ViewId;

use crate::panels;

const MAX_MESSAGES: usize = 20;

/// Everything one frame needs, copied out of the compositor.
struct ConsoleSnapshot {
    view: ViewId,
    session: Option<SessionSnapshot>,
    config: RefreshConfig,
    views: Vec<ViewId>,
}

pub struct DashboardConsole {
    compositor: Compositor,
    base_url: String,
    /// Most recent last.
    messages: Vec<(DateTime<Utc>, String, Color)>,
}

impl DashboardConsole {
    pub fn new(compositor: Compositor, base_url: impl Into<String>) -> Self {
        let mut console = Self {
            compositor,
            base_url: base_url.into(),
            messages: Vec::new(),
        };
        console.add_message("Sentinel-X console ready.", Color::Cyan);
        console
    }

    fn snapshot(&self) -> ConsoleSnapshot {
        let composed = self.compositor.snapshot();
        ConsoleSnapshot {
            view: composed.view,
            session: composed.session,
            config: self.compositor.settings().config(),
            views: self.compositor.catalog().iter().map(|v| v.id).collect(),
        }
    }

    fn add_message(&mut self, msg: impl Into<String>, color: Color) {
        self.messages.push((Utc::now(), msg.into(), color));
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    fn select(&mut self, forward: bool) {
        let result = if forward {
            self.compositor.next_view()
        } else {
            self.compositor.previous_view()
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "View switch failed");
            self.add_message(format!("Cannot switch view: {e}"), Color::Red);
        }
    }

    /// Handle one key press. Returns `true` when the console should exit.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return true,
            (KeyCode::Tab, _) | (KeyCode::Right, _) => self.select(true),
            (KeyCode::BackTab, _) | (KeyCode::Left, _) => self.select(false),
            (KeyCode::Char(' '), _) => {
                let live = self.compositor.settings().toggle_live();
                if live {
                    self.add_message("Live refresh resumed.", Color::Green);
                } else {
                    self.add_message("Live refresh paused.", Color::Yellow);
                }
            }
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => self.cycle_interval(true),
            (KeyCode::Char('-'), _) => self.cycle_interval(false),
            (KeyCode::Char('r'), _) => {
                if self.compositor.refresh_now() {
                    self.add_message("Refresh requested.", Color::Cyan);
                } else {
                    self.add_message(
                        "Nothing to refresh: fetch in flight or static view.",
                        Color::DarkGray,
                    );
                }
            }
            _ => {}
        }
        false
    }

    fn cycle_interval(&mut self, slower: bool) {
        let config = self.compositor.settings().cycle_interval(slower);
        self.add_message(
            format!("Refresh interval: {} ms", config.interval_ms()),
            Color::Cyan,
        );
    }

    /// Render the full console layout.
    fn render(&self, frame: &mut Frame, snap: &ConsoleSnapshot) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(10),   // Sidebar + view
                Constraint::Length(3), // Messages + keys
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0], snap);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(26), Constraint::Min(20)])
            .split(outer[1]);
        render_sidebar(frame, main[0], snap);
        panels::render_view(frame, main[1], snap.view, snap.session.as_ref(), &snap.config);

        self.render_footer(frame, outer[2]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
        let block = Block::default()
            .title(" Sentinel-X Live Dashboard ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let (mode, mode_color) = if snap.config.live() {
            ("LIVE", Color::Green)
        } else {
            ("PAUSED", Color::Yellow)
        };

        let mut spans = vec![
            Span::styled("  View: ", Style::default().fg(Color::Gray)),
            Span::styled(
                snap.view.label(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  |  ", Style::default().fg(Color::Gray)),
            Span::styled(mode, Style::default().fg(mode_color)),
            Span::styled("  |  Interval: ", Style::default().fg(Color::Gray)),
            Span::styled(
                interval_text(snap),
                Style::default().fg(Color::Magenta),
            ),
        ];

        if let Some(session) = &snap.session {
            let status = session.status();
            spans.push(Span::styled("  |  Status: ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                if session.in_flight {
                    format!("{status} (fetching)")
                } else {
                    status.to_string()
                },
                Style::default().fg(status_color(status)),
            ));
            spans.push(Span::styled("  |  Gen: ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                session.generation.to_string(),
                Style::default().fg(Color::White),
            ));
            if let Some(at) = session.state.last_success_at {
                spans.push(Span::styled("  |  Updated: ", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(
                    at.with_timezone(&Local).format("%H:%M:%S").to_string(),
                    Style::default().fg(Color::White),
                ));
            }
        }

        spans.push(Span::styled("  |  API: ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            self.base_url.as_str(),
            Style::default().fg(Color::LightCyan),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        let mut spans = Vec::new();
        if let Some((at, msg, color)) = self.messages.last() {
            spans.push(Span::styled(
                format!("  {} ", at.with_timezone(&Local).format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
            spans.push(Span::styled(msg.as_str(), Style::default().fg(*color)));
        }
        spans.push(Span::styled(
            "   Tab/Shift+Tab views  space live  +/- interval  r refresh  q quit",
            Style::default().fg(Color::DarkGray),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, snap: &ConsoleSnapshot) {
    let block = Block::default()
        .title(" Views ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines: Vec<Line> = snap
        .views
        .iter()
        .map(|view| {
            if *view == snap.view {
                Line::from(Span::styled(
                    format!(" > {}", view.label()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(
                    format!("   {}", view.label()),
                    Style::default().fg(Color::Gray),
                ))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Effective tick period of the active session, or the shared interval
/// for static views.
fn interval_text(snap: &ConsoleSnapshot) -> String {
    match snap.session.as_ref().and_then(|s| s.interval) {
        Some(interval) => format!("{} ms", interval.as_millis()),
        None => format!("{} ms", snap.config.interval_ms()),
    }
}

fn status_color(status: ViewStatus) -> Color {
    match status {
        ViewStatus::Loading => Color::Yellow,
        ViewStatus::Fresh => Color::Green,
        ViewStatus::Stale => Color::Red,
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    console: &mut DashboardConsole,
    frame_interval: Duration,
) -> Result<(), anyhow::Error> {
    loop {
        let snapshot = console.snapshot();
        terminal.draw(|frame| console.render(frame, &snapshot))?;

        if event::poll(frame_interval)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press
                    && console.handle_key(key_event.code, key_event.modifiers)
                {
                    return Ok(());
                }
            }
        }
    }
}

/// Run the console until the operator quits.
///
/// Must be called from the thread driving the tokio runtime's
/// `block_on`: the pollers run on the runtime's workers while this loop
/// blocks on terminal input.
pub fn run_console(
    compositor: Compositor,
    base_url: String,
    frame_interval: Duration,
) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("The console requires a terminal (TTY)."));
    }

    // Restore the terminal even if rendering panics.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut console = DashboardConsole::new(compositor, base_url);
    tracing::info!(view = %console.compositor.active_view(), "Console started");

    let result = event_loop(&mut terminal, &mut console, frame_interval);
    restore_terminal(&mut terminal)?;
    tracing::info!("Console stopped");
    result
}
