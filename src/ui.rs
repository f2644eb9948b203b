use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};

use crate::app::{App, FetchPhase, InputMode};
use crate::filter::FilterCategory;
use crate::model::ConfigTab;

const BG: Color = Color::Rgb(13, 17, 23);
const PANEL: Color = Color::Rgb(22, 27, 34);
const ACCENT: Color = Color::Rgb(88, 166, 255);
const MUTED: Color = Color::Rgb(139, 148, 158);
const WARN: Color = Color::Rgb(210, 153, 34);
const ERROR: Color = Color::Rgb(248, 81, 73);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_tab_strip(frame, root[1], app);
    render_filter_bar(frame, root[2], app);
    render_body(frame, root[3], app);
    render_footer(frame, root[4], app);

    match app.mode() {
        InputMode::PodPicker => render_pod_picker(frame, app),
        InputMode::FilterPicker => render_filter_picker(frame, app),
        InputMode::Normal => {}
    }

    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let pod = app.selected_pod().unwrap_or("-");
    let freshness = app
        .fetched_at()
        .map(|at| {
            let elapsed = (Local::now() - at).num_seconds().max(0);
            format!("fetched {} ago", format_elapsed_seconds(elapsed))
        })
        .unwrap_or_else(|| "no data".to_string());

    let line = Line::from(vec![
        Span::styled(" zlens ", Style::default().fg(Color::Black).bg(ACCENT)),
        Span::raw(" "),
        Span::styled(
            format!("{}/{}", app.namespace(), app.workload()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("  pod:{pod}"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  ctx:{}", compact_text(app.context(), 24)),
            Style::default().fg(MUTED),
        ),
        Span::styled(
            format!("  user:{}", compact_text(app.user(), 18)),
            Style::default().fg(MUTED),
        ),
        Span::styled(format!("  {freshness}"), Style::default().fg(MUTED)),
    ]);

    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn render_tab_strip(frame: &mut Frame, area: Rect, app: &App) {
    let titles = app
        .tabs()
        .iter()
        .map(|tab| Line::from(format!(" {} ", tab.title())))
        .collect::<Vec<_>>();

    let tabs = Tabs::new(titles)
        .select(app.active_tab_index())
        .style(Style::default().fg(MUTED).bg(BG))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│");

    frame.render_widget(tabs, area);
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let active = app.active_filters();
    let mut spans = vec![Span::styled(" filters ", Style::default().fg(MUTED))];

    if active.is_empty() {
        spans.push(Span::styled("none", Style::default().fg(MUTED)));
    } else {
        for category in [FilterCategory::Namespaces, FilterCategory::Services] {
            let selected = active.selected(category);
            if selected.is_empty() {
                continue;
            }
            spans.push(Span::styled(
                format!("{}: ", category.title()),
                Style::default().fg(ACCENT),
            ));
            spans.push(Span::styled(
                selected.join(", "),
                Style::default().fg(Color::White),
            ));
            spans.push(Span::raw("  "));
        }
    }

    spans.push(Span::styled(
        "  (f edit, C clear)",
        Style::default().fg(MUTED),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    if app.phase() == FetchPhase::NoPods {
        let message = format!(
            "No {} pods found in namespace '{}'.\n\nThere is nothing to inspect; \
             check the namespace and workload flags, then press r to rescan.",
            app.workload(),
            app.namespace()
        );
        let panel = Paragraph::new(Text::from(message))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("No pods")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(WARN))
                    .style(Style::default().bg(PANEL)),
            )
            .style(Style::default().fg(MUTED));
        frame.render_widget(panel, area);
        return;
    }

    match app.active_tab() {
        ConfigTab::Services => render_services_table(frame, area, app),
        ConfigTab::Workloads => render_workloads_table(frame, area, app),
    }
}

fn render_services_table(frame: &mut Frame, area: Rect, app: &App) {
    let services = app.visible_services();
    let rows = services
        .iter()
        .map(|service| {
            Row::new(vec![
                Cell::from(service.namespace.clone()),
                Cell::from(service.name.clone()),
                Cell::from(service.hostname.clone()),
                Cell::from(service.vips.join(", ")),
            ])
        })
        .collect::<Vec<_>>();

    let headers = ["Namespace", "Service", "Hostname", "VIPs"];
    render_config_table(frame, area, app, ConfigTab::Services, &headers, rows, services.len());
}

fn render_workloads_table(frame: &mut Frame, area: Rect, app: &App) {
    let workloads = app.visible_workloads();
    let rows = workloads
        .iter()
        .map(|workload| {
            Row::new(vec![
                Cell::from(workload.namespace.clone()),
                Cell::from(workload.name.clone()),
                Cell::from(workload.node.clone()),
                Cell::from(workload.protocol.clone()),
                Cell::from(workload.workload_ips.join(", ")),
                Cell::from(workload.status.clone()),
            ])
        })
        .collect::<Vec<_>>();

    let headers = ["Namespace", "Name", "Node", "Protocol", "IPs", "Status"];
    render_config_table(
        frame,
        area,
        app,
        ConfigTab::Workloads,
        &headers,
        rows,
        workloads.len(),
    );
}

fn render_config_table(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    tab: ConfigTab,
    headers: &[&str],
    rows: Vec<Row>,
    visible: usize,
) {
    let title = match app.phase() {
        FetchPhase::Fetching => format!("{} (fetching…)", tab.title()),
        FetchPhase::FetchPending => format!("{} (awaiting fetch)", tab.title()),
        _ if app.has_config() => format!("{} ({visible})", tab.title()),
        _ => format!("{} (no data)", tab.title()),
    };

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let constraints = column_constraints(headers.len());
    let table = Table::new(rows, constraints)
        .header(header_row)
        .column_spacing(1)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(table, area);
}

fn render_pod_picker(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);

    let rows = app
        .pods()
        .iter()
        .map(|pod| {
            Row::new(vec![
                Cell::from(pod.name.clone()),
                Cell::from(pod.node.clone()),
                Cell::from(pod.phase.clone()),
            ])
        })
        .collect::<Vec<_>>();

    let header_row = Row::new(["Pod", "Node", "Status"].map(|header| {
        Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().fg(ACCENT));

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(50),
            Constraint::Percentage(30),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row)
    .block(
        Block::default()
            .title("Select ztunnel pod")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .style(Style::default().bg(PANEL)),
    )
    .row_highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD),
    )
    .style(Style::default().fg(Color::White));

    let mut state = TableState::default();
    state.select(Some(app.picker_index()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_filter_picker(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let entries = app.filter_entries();
    let rows = entries
        .iter()
        .map(|entry| {
            let marker = if entry.selected { "[x]" } else { "[ ]" };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(entry.category.title()),
                Cell::from(entry.value.title.clone()),
            ])
        })
        .collect::<Vec<_>>();

    let title = entries
        .get(app.filter_cursor())
        .map(|entry| entry.category.placeholder())
        .unwrap_or("Filters");

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(12),
            Constraint::Min(10),
        ],
    )
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT))
            .style(Style::default().bg(PANEL)),
    )
    .row_highlight_style(
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD),
    )
    .style(Style::default().fg(Color::White));

    let mut state = TableState::default();
    state.select(Some(app.filter_cursor()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let alert_is_current = app
        .last_alert()
        .is_some_and(|alert| alert.message == app.status());
    let status_style = if alert_is_current {
        Style::default().fg(ERROR)
    } else {
        Style::default().fg(Color::White)
    };

    let hints = "q quit · ←/→ tab · p pod · f filters · r refresh · ? help";
    let hints_width = hints.chars().count() as u16;
    let status = compact_text(
        app.status(),
        area.width.saturating_sub(hints_width + 4) as usize,
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(hints_width + 1)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(" "),
            Span::styled(status, status_style),
        ]))
        .style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(MUTED)))
            .style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(50, 50, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from("q          quit"),
        Line::from("←/→, h/l   switch resource tab"),
        Line::from("p          pick a ztunnel pod"),
        Line::from("f, /       edit namespace/service filters"),
        Line::from("C          clear all filters"),
        Line::from("r, F5      rescan pods"),
        Line::from("?          toggle this help"),
        Line::from(""),
        Line::from("In pickers: j/k move, space toggles, enter applies, esc closes"),
    ];

    let panel = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Keys")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(panel, area);
}

fn column_constraints(count: usize) -> Vec<Constraint> {
    let share = (100 / count.max(1)) as u16;
    (0..count).map(|_| Constraint::Percentage(share)).collect()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn compact_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated = text.chars().take(max.saturating_sub(1)).collect::<String>();
    format!("{truncated}…")
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }
    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }
    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }
    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::{compact_text, format_elapsed_seconds};

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("short", 10), "short");
        assert_eq!(compact_text("a-much-longer-name", 8), "a-much-…");
        assert_eq!(compact_text("anything", 0), "");
    }

    #[test]
    fn elapsed_seconds_pick_the_largest_unit() {
        assert_eq!(format_elapsed_seconds(12), "12s");
        assert_eq!(format_elapsed_seconds(120), "2m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(90_000), "1d");
    }
}
