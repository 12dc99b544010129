//! Body panels, one per view.
//!
//! Every panel is a pure projection of its session's last payload. A view
//! with nothing fetched yet shows a loading panel (with the last error, if
//! any); a view whose latest fetch failed keeps rendering its old payload
//! and the header marks it stale.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use sentinel_refresh::{RefreshConfig, SessionSnapshot, MIN_INTERVAL_MS, PRESET_INTERVALS_MS};
use sentinel_telemetry::models::{LogLine, NamedCount, Offense, RackStatus, RiskUser};
use sentinel_telemetry::{AppStats, DashboardStats, HardwareStats, NetworkStats, Payload, ViewId};

pub(crate) fn render_view(
    frame: &mut Frame,
    area: Rect,
    view: ViewId,
    session: Option<&SessionSnapshot>,
    config: &RefreshConfig,
) {
    match view {
        ViewId::Settings => return render_settings(frame, area, config),
        ViewId::Reports => {
            return render_static(
                frame,
                area,
                view,
                &[
                    "Compliance and incident reports are generated by the API server.",
                    "Nothing on this page refreshes.",
                ],
            )
        }
        ViewId::Admin => {
            return render_static(
                frame,
                area,
                view,
                &[
                    "User and role management is done through the web dashboard.",
                    "Nothing on this page refreshes.",
                ],
            )
        }
        _ => {}
    }

    let Some(payload) = session.and_then(|s| s.state.payload.as_ref()) else {
        return render_loading(frame, area, view, session);
    };

    match view {
        ViewId::Network => render_network(frame, area, &NetworkStats::from_payload(payload)),
        ViewId::Application => render_application(frame, area, &AppStats::from_payload(payload)),
        ViewId::Hardware => render_hardware(frame, area, &HardwareStats::from_payload(payload)),
        _ => render_stats_view(frame, area, view, payload),
    }
}

/// Views backed by the dashboard stats endpoint.
fn render_stats_view(frame: &mut Frame, area: Rect, view: ViewId, payload: &Payload) {
    let stats = DashboardStats::from_payload(payload);
    match view {
        ViewId::Logs => render_logs(frame, area, " Live Logs ", &stats.live_logs),
        ViewId::Risks => render_risks(frame, area, &stats),
        ViewId::Analytics => render_analytics(frame, area, &stats),
        ViewId::Events => render_events(frame, area, &stats),
        _ => render_overview(frame, area, &stats),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn panel(title: impl Into<String>, color: Color) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn header(columns: &[&'static str]) -> Row<'static> {
    Row::new(columns.to_vec())
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD))
}

fn cell(text: impl Into<String>, color: Color) -> Cell<'static> {
    Cell::from(Span::styled(text.into(), Style::default().fg(color)))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

fn risk_color(score: f64) -> Color {
    if score >= 80.0 {
        Color::Red
    } else if score >= 50.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn empty(frame: &mut Frame, area: Rect, block: Block<'static>, message: &'static str) {
    let text = Paragraph::new(Line::from(Span::styled(
        format!("  {message}"),
        Style::default().fg(Color::DarkGray),
    )))
    .block(block);
    frame.render_widget(text, area);
}

fn stat_card(frame: &mut Frame, area: Rect, label: &str, value: String, color: Color) {
    let lines = vec![
        Line::from(Span::styled(
            format!(" {value}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {label}"),
            Style::default().fg(Color::Gray),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(panel("", Color::DarkGray)),
        area,
    );
}

fn cards(frame: &mut Frame, area: Rect, items: Vec<(&str, String, Color)>) {
    let count = items.len().max(1) as u32;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, count); items.len()])
        .split(area);
    for ((label, value, color), slot) in items.into_iter().zip(columns.iter()) {
        stat_card(frame, *slot, label, value, color);
    }
}

fn score_text(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.0}"))
}

// ---------------------------------------------------------------------------
// Shared tables
// ---------------------------------------------------------------------------

fn render_risky_users(frame: &mut Frame, area: Rect, users: &[RiskUser]) {
    let block = panel(format!(" High Risk Users ({}) ", users.len()), Color::Red);
    if users.is_empty() {
        return empty(frame, area, block, "No high risk users.");
    }
    let rows: Vec<Row> = users
        .iter()
        .map(|u| {
            Row::new(vec![
                cell(format!("  {}", truncate(&u.username, 24)), Color::Cyan),
                cell(u.score.to_string(), risk_color(u.score as f64)),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Percentage(70), Constraint::Percentage(30)])
        .block(block)
        .header(header(&["  User", "Risk"]));
    frame.render_widget(table, area);
}

fn render_offenses(frame: &mut Frame, area: Rect, offenses: &[Offense]) {
    let block = panel(format!(" Recent Offenses ({}) ", offenses.len()), Color::Yellow);
    if offenses.is_empty() {
        return empty(frame, area, block, "No offenses recorded.");
    }
    let rows: Vec<Row> = offenses
        .iter()
        .map(|o| {
            Row::new(vec![
                cell(format!("  {}", truncate(&o.id, 10)), Color::DarkGray),
                cell(truncate(&o.user, 16), Color::Cyan),
                cell(truncate(&o.title, 32), Color::White),
                cell(format!("{:.0}", o.risk_score), risk_color(o.risk_score)),
                cell(o.time.clone(), Color::Gray),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(12),
            Constraint::Percentage(18),
            Constraint::Percentage(40),
            Constraint::Percentage(10),
            Constraint::Percentage(20),
        ],
    )
    .block(block)
    .header(header(&["  ID", "User", "Offense", "Risk", "Time"]));
    frame.render_widget(table, area);
}

fn render_logs(frame: &mut Frame, area: Rect, title: &'static str, logs: &[LogLine]) {
    let block = panel(title, Color::Blue);
    if logs.is_empty() {
        return empty(frame, area, block, "Waiting for logs...");
    }
    let rows: Vec<Row> = logs
        .iter()
        .map(|log| {
            // "2024-05-01T12:00:00.123Z" -> "12:00:00"
            let time = log
                .timestamp
                .split('T')
                .nth(1)
                .and_then(|t| t.split('.').next())
                .unwrap_or(log.timestamp.as_str())
                .to_string();
            let lowered = log.status.to_ascii_lowercase();
            let event_color = if lowered.contains("fail") || lowered.contains("unknown") {
                Color::Red
            } else {
                Color::Green
            };
            Row::new(vec![
                cell(format!("  {}", truncate(&time, 10)), Color::DarkGray),
                cell(truncate(&log.source, 12), Color::Cyan),
                cell(truncate(&log.event_type, 24), event_color),
                cell(truncate(&log.entity_id, 20), Color::White),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(15),
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ],
    )
    .block(block)
    .header(header(&["  Time", "Source", "Event", "Entity"]));
    frame.render_widget(table, area);
}

fn render_named_counts(
    frame: &mut Frame,
    area: Rect,
    title: String,
    columns: [&'static str; 2],
    items: &[NamedCount],
    color: Color,
) {
    let block = panel(title, color);
    if items.is_empty() {
        return empty(frame, area, block, "No data.");
    }
    let rows: Vec<Row> = items
        .iter()
        .map(|item| {
            Row::new(vec![
                cell(format!("  {}", truncate(&item.name, 24)), Color::White),
                cell(item.count.to_string(), color),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Percentage(70), Constraint::Percentage(30)])
        .block(block)
        .header(header(&columns));
    frame.render_widget(table, area);
}

// ---------------------------------------------------------------------------
// Dashboard-stats views
// ---------------------------------------------------------------------------

fn render_overview(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stat cards
            Constraint::Min(6),    // Users + offenses
            Constraint::Min(6),    // Logs + anomalies
        ])
        .split(area);

    cards(
        frame,
        rows[0],
        vec![
            ("Monitored Users", stats.monitored_users.to_string(), Color::White),
            ("High Risk Users", stats.high_risk_users.to_string(), Color::Red),
            ("Events (1h)", stats.events_last_hour.to_string(), Color::Cyan),
            ("Offenses (1h)", stats.offenses_last_hour.to_string(), Color::Yellow),
            ("System Score", score_text(stats.current_score()), Color::Magenta),
        ],
    );

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);
    render_risky_users(frame, middle[0], &stats.risky_users);
    render_offenses(frame, middle[1], &stats.recent_offenses);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);
    render_logs(frame, bottom[0], " Live Logs ", &stats.live_logs);
    render_anomalies(frame, bottom[1], stats);
}

fn render_anomalies(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let block = panel(format!(" Anomalies ({}) ", stats.anomalies.len()), Color::Magenta);
    if stats.anomalies.is_empty() {
        return empty(frame, area, block, "No anomalies detected.");
    }
    let rows: Vec<Row> = stats
        .anomalies
        .iter()
        .map(|a| {
            Row::new(vec![
                cell(format!("  {}", truncate(&a.entity_id, 16)), Color::Cyan),
                cell(truncate(&a.title, 28), Color::White),
                cell(format!("{:.0}", a.risk_score), risk_color(a.risk_score)),
                cell(truncate(&a.status, 10), Color::Gray),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(45),
            Constraint::Percentage(12),
            Constraint::Percentage(18),
        ],
    )
    .block(block)
    .header(header(&["  Entity", "Anomaly", "Risk", "Status"]));
    frame.render_widget(table, area);
}

fn render_risks(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);
    cards(
        frame,
        rows[0],
        vec![
            ("High Risk Users", stats.high_risk_users.to_string(), Color::Red),
            ("Offenses (1h)", stats.offenses_last_hour.to_string(), Color::Yellow),
            ("Anomalies", stats.anomalies.len().to_string(), Color::Magenta),
            ("System Score", score_text(stats.current_score()), Color::Cyan),
        ],
    );
    render_anomalies(frame, rows[1], stats);
}

fn render_analytics(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(columns[0]);

    cards(
        frame,
        left[0],
        vec![
            ("Monitored Users", stats.monitored_users.to_string(), Color::White),
            ("Events (1h)", stats.events_last_hour.to_string(), Color::Cyan),
        ],
    );
    render_named_counts(
        frame,
        left[1],
        " Events by Category ".to_string(),
        ["  Category", "Events"],
        &stats.by_category,
        Color::Cyan,
    );
    render_risky_users(frame, columns[1], &stats.risky_users);
}

fn render_events(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);
    render_offenses(frame, columns[0], &stats.recent_offenses);
    render_named_counts(
        frame,
        columns[1],
        " Threat Types ".to_string(),
        ["  Threat", "Count"],
        &stats.threat_types,
        Color::Yellow,
    );
}

// ---------------------------------------------------------------------------
// Dedicated-endpoint views
// ---------------------------------------------------------------------------

fn render_network(frame: &mut Frame, area: Rect, stats: &NetworkStats) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);
    cards(
        frame,
        rows[0],
        vec![
            ("Inbound (MB)", format!("{:.1}", stats.total_inbound_mb()), Color::Green),
            ("Outbound (MB)", format!("{:.1}", stats.total_outbound_mb()), Color::Cyan),
            ("Samples", stats.traffic.len().to_string(), Color::White),
        ],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let block = panel(" Traffic ", Color::Green);
    if stats.traffic.is_empty() {
        empty(frame, columns[0], block, "No traffic samples.");
    } else {
        let traffic: Vec<Row> = stats
            .traffic
            .iter()
            .map(|p| {
                Row::new(vec![
                    cell(format!("  {}", p.time), Color::Gray),
                    cell(format!("{:.1}", p.inbound_mb), Color::Green),
                    cell(format!("{:.1}", p.outbound_mb), Color::Cyan),
                ])
            })
            .collect();
        let table = Table::new(
            traffic,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ],
        )
        .block(block)
        .header(header(&["  Time", "In (MB)", "Out (MB)"]));
        frame.render_widget(table, columns[0]);
    }

    render_named_counts(
        frame,
        columns[1],
        " Top Ports ".to_string(),
        ["  Port", "Hits"],
        &stats.top_ports,
        Color::Yellow,
    );
}

fn render_application(frame: &mut Frame, area: Rect, stats: &AppStats) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);
    let error_color = if stats.error_rate >= 5.0 {
        Color::Red
    } else {
        Color::Green
    };
    cards(
        frame,
        rows[0],
        vec![
            ("Total Requests", stats.total_requests.to_string(), Color::White),
            ("Error Rate", format!("{:.2}%", stats.error_rate), error_color),
            ("Alerts", stats.alerts.len().to_string(), Color::Yellow),
        ],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(45),
        ])
        .split(rows[1]);

    let block = panel(" Requests ", Color::Cyan);
    if stats.requests.is_empty() {
        empty(frame, columns[0], block, "No request samples.");
    } else {
        let requests: Vec<Row> = stats
            .requests
            .iter()
            .map(|p| {
                Row::new(vec![
                    cell(format!("  {}", p.time), Color::Gray),
                    cell(p.requests.to_string(), Color::Cyan),
                ])
            })
            .collect();
        let table = Table::new(requests, [Constraint::Percentage(55), Constraint::Percentage(45)])
            .block(block)
            .header(header(&["  Time", "Requests"]));
        frame.render_widget(table, columns[0]);
    }

    render_named_counts(
        frame,
        columns[1],
        " Top Users ".to_string(),
        ["  User", "Requests"],
        &stats.top_users,
        Color::White,
    );

    let block = panel(format!(" App Alerts ({}) ", stats.alerts.len()), Color::Yellow);
    if stats.alerts.is_empty() {
        empty(frame, columns[2], block, "No application alerts.");
    } else {
        let alerts: Vec<Row> = stats
            .alerts
            .iter()
            .map(|a| {
                Row::new(vec![
                    cell(format!("  {}", truncate(&a.title, 30)), Color::White),
                    cell(format!("{:.0}", a.risk), risk_color(a.risk)),
                    cell(a.time.clone(), Color::Gray),
                ])
            })
            .collect();
        let table = Table::new(
            alerts,
            [
                Constraint::Percentage(60),
                Constraint::Percentage(15),
                Constraint::Percentage(25),
            ],
        )
        .block(block)
        .header(header(&["  Alert", "Risk", "Time"]));
        frame.render_widget(table, columns[2]);
    }
}

fn rack_color(status: RackStatus) -> Color {
    match status {
        RackStatus::Optimal => Color::Green,
        RackStatus::Warning => Color::Yellow,
        RackStatus::Critical => Color::Red,
        RackStatus::Unknown => Color::DarkGray,
    }
}

fn render_hardware(frame: &mut Frame, area: Rect, stats: &HardwareStats) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6)])
        .split(area);
    let latest_temp = stats
        .temps
        .last()
        .map_or_else(|| "-".to_string(), |t| format!("{:.1} C", t.temp));
    let critical = stats.critical_racks();
    cards(
        frame,
        rows[0],
        vec![
            ("Racks", stats.racks.len().to_string(), Color::White),
            (
                "Critical",
                critical.to_string(),
                if critical > 0 { Color::Red } else { Color::Green },
            ),
            ("Latest Temp", latest_temp, Color::Cyan),
        ],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    let block = panel(" Temperature ", Color::Cyan);
    if stats.temps.is_empty() {
        empty(frame, columns[0], block, "No temperature samples.");
    } else {
        let temps: Vec<Row> = stats
            .temps
            .iter()
            .map(|t| {
                Row::new(vec![
                    cell(format!("  {}", t.time), Color::Gray),
                    cell(format!("{:.1}", t.temp), Color::Cyan),
                ])
            })
            .collect();
        let table = Table::new(temps, [Constraint::Percentage(55), Constraint::Percentage(45)])
            .block(block)
            .header(header(&["  Time", "Temp (C)"]));
        frame.render_widget(table, columns[0]);
    }

    let block = panel(format!(" Racks ({}) ", stats.racks.len()), Color::White);
    if stats.racks.is_empty() {
        return empty(frame, columns[1], block, "No racks reported.");
    }
    let racks: Vec<Row> = stats
        .racks
        .iter()
        .map(|r| {
            Row::new(vec![
                cell(format!("  {}", truncate(&r.id, 16)), Color::White),
                cell(r.status.as_str(), rack_color(r.status)),
                cell(format!("{:.0}%", r.load), Color::Gray),
                cell(format!("{:.1}", r.temp), Color::Cyan),
            ])
        })
        .collect();
    let table = Table::new(
        racks,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
        ],
    )
    .block(block)
    .header(header(&["  Rack", "Status", "Load", "Temp (C)"]));
    frame.render_widget(table, columns[1]);
}

// ---------------------------------------------------------------------------
// Non-data panels
// ---------------------------------------------------------------------------

fn render_loading(frame: &mut Frame, area: Rect, view: ViewId, session: Option<&SessionSnapshot>) {
    let mut lines = vec![Line::from(Span::styled(
        format!("  Loading {}...", view.label()),
        Style::default().fg(Color::DarkGray),
    ))];
    if let Some(error) = session.and_then(|s| s.state.last_error.as_ref()) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  Last attempt failed: {error}"),
            Style::default().fg(Color::Red),
        )));
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel(format!(" {} ", view.label()), Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_static(frame: &mut Frame, area: Rect, view: ViewId, text: &[&'static str]) {
    let lines: Vec<Line> = text
        .iter()
        .map(|t| Line::from(Span::styled(format!("  {t}"), Style::default().fg(Color::Gray))))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(panel(format!(" {} ", view.label()), Color::White)),
        area,
    );
}

fn render_settings(frame: &mut Frame, area: Rect, config: &RefreshConfig) {
    let (mode, mode_color) = if config.live() {
        ("ON", Color::Green)
    } else {
        ("OFF", Color::Yellow)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Live refresh: ", Style::default().fg(Color::Gray)),
            Span::styled(
                mode,
                Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   (space to toggle)", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Refresh interval   (+ / - to change)",
            Style::default().fg(Color::Gray),
        )),
    ];

    let current = config.interval_ms();
    for preset in PRESET_INTERVALS_MS {
        let selected = preset == current;
        let marker = if selected { "  > " } else { "    " };
        let style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!("{marker}{preset} ms"), style)));
    }
    if !PRESET_INTERVALS_MS.contains(&current) {
        lines.push(Line::from(Span::styled(
            format!("  > {current} ms (custom)"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("  Intervals below {MIN_INTERVAL_MS} ms are rejected."),
        Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(
        Paragraph::new(lines).block(panel(" Settings ", Color::Cyan)),
        area,
    );
}
