use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode, RenderTable};
use crate::watch::ResourceSource;

const BG: Color = Color::Rgb(10, 14, 22);
const PANEL: Color = Color::Rgb(18, 26, 40);
const ACCENT: Color = Color::Rgb(94, 234, 212);
const MUTED: Color = Color::Rgb(138, 152, 176);
const WARN: Color = Color::Rgb(250, 204, 21);

pub fn render<S: ResourceSource>(frame: &mut Frame, app: &mut App<S>) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    if let Some(overlay) = app.overlay().cloned() {
        render_overlay(frame, root[1], &overlay);
    } else {
        render_table(frame, root[1], app);
    }
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame);
    }
    if let Some(prompt) = app.pending_confirmation_prompt() {
        let prompt = prompt.to_string();
        render_confirmation(frame, &prompt);
    }
}

fn render_header<S: ResourceSource>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let scope = app.namespace_scope();
    let mut spans = vec![
        Span::styled(" MANTA ", Style::default().fg(Color::Black).bg(ACCENT)),
        Span::styled(
            format!("  {}", app.context()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("  {}", app.cluster()),
            Style::default().fg(MUTED),
        ),
        Span::styled(format!("  ns:{scope}"), Style::default().fg(WARN)),
    ];
    if !app.port_forwards().is_empty() {
        spans.push(Span::styled(
            format!("  ⇄ {} forward(s)", app.port_forwards().len()),
            Style::default().fg(Color::Cyan),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        rows[0],
    );

    let active = app.active_kind();
    let tabs = app
        .kinds()
        .iter()
        .flat_map(|kind| {
            let style = if *kind == active {
                Style::default().fg(Color::Black).bg(ACCENT)
            } else {
                Style::default().fg(MUTED).bg(PANEL)
            };
            [
                Span::styled(format!(" {} ", kind.title()), style),
                Span::raw(" "),
            ]
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(Line::from(tabs)).style(Style::default().bg(BG)),
        rows[1],
    );
}

fn render_table<S: ResourceSource>(frame: &mut Frame, area: Rect, app: &mut App<S>) {
    app.set_table_page_size(area.height.saturating_sub(3) as usize);
    let table = app.render_table();

    let widths = column_widths(&table, area.width);
    let header_cells = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let mut label = name.clone();
            if index == table.sort.column {
                label.push(if table.sort.ascending { '↑' } else { '↓' });
            }
            Cell::from(label).style(
                Style::default()
                    .fg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
        })
        .collect::<Vec<_>>();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let base = Style::default().fg(row.decoration.fg.unwrap_or(Color::White));
            let cells = row
                .fields
                .iter()
                .enumerate()
                .map(|(index, field)| {
                    let mut value = field.clone();
                    if index == 1 && !row.decoration.markers.is_empty() {
                        for marker in &row.decoration.markers {
                            value.push(' ');
                            value.push_str(marker);
                        }
                    }
                    let changed = row
                        .changed
                        .as_ref()
                        .and_then(|mask| mask.get(index).copied())
                        .unwrap_or(false);
                    let style = if changed {
                        base.fg(WARN).add_modifier(Modifier::BOLD)
                    } else {
                        base
                    };
                    Cell::from(value).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let shown = table.rows.len();
    let title = format!(
        " {} [{shown}/{}] ",
        table.kind.title(),
        table.total_rows
    );
    let widget = Table::new(rows, widths)
        .header(Row::new(header_cells).bottom_margin(1))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().bg(BG)),
        )
        .row_highlight_style(
            Style::default()
                .bg(PANEL)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    state.select(table.selected);
    frame.render_stateful_widget(widget, area, &mut state);
}

fn column_widths(table: &RenderTable, total: u16) -> Vec<Constraint> {
    if table.columns.is_empty() {
        return Vec::new();
    }
    let max_each = (total / table.columns.len() as u16).max(6);
    table
        .columns
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let widest = table
                .rows
                .iter()
                .map(|row| row.fields.get(index).map(|field| field.len()).unwrap_or(0))
                .max()
                .unwrap_or(0)
                .max(name.len()) as u16;
            Constraint::Length(widest.clamp(4, max_each.max(12)))
        })
        .collect()
}

fn render_overlay(frame: &mut Frame, area: Rect, overlay: &crate::app::Overlay) {
    let widget = Paragraph::new(overlay.content.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", overlay.title))
                .style(Style::default().bg(BG)),
        )
        .wrap(Wrap { trim: false })
        .scroll((overlay.scroll, 0));
    frame.render_widget(widget, area);
}

fn render_footer<S: ResourceSource>(frame: &mut Frame, area: Rect, app: &App<S>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let prompt = match app.mode() {
        InputMode::Command => Some(format!(":{}", app.input())),
        InputMode::Filter => Some(format!("/{}", app.input())),
        InputMode::Normal => {
            let filter = app.filter();
            if filter.is_empty() {
                None
            } else {
                Some(format!("/{filter}"))
            }
        }
    };
    let line = match prompt {
        Some(prompt) => Line::from(Span::styled(prompt, Style::default().fg(WARN))),
        None => Line::from(Span::styled(
            "?:help  /:filter  ::command  s:shell  m:manifest  D:delete  q:quit",
            Style::default().fg(MUTED),
        )),
    };
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(BG)),
        rows[0],
    );

    let refreshed = app
        .last_refreshed()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(app.status().to_string(), Style::default().fg(Color::White)),
            Span::styled(
                format!("  refreshed {refreshed}"),
                Style::default().fg(MUTED),
            ),
        ]))
        .style(Style::default().bg(BG))
        .alignment(Alignment::Left),
        rows[1],
    );
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(frame.area(), 52, 16);
    let lines = [
        "j/k, arrows     move selection",
        "g/G             jump to top/bottom",
        "Tab, ←/→        switch resource kind",
        "</>             sort by previous/next column",
        "!               invert sort direction",
        "/               filter rows (prefix ! negates)",
        ":               command (po, ns <name>, sel, rate, pf)",
        "r / R           refresh active / all tables",
        "m               show manifest",
        "s               shell into selected pod",
        "D               delete selected resource",
        "Esc             close / clear",
        "q               quit",
    ]
    .iter()
    .map(|line| Line::from(*line))
    .collect::<Vec<_>>();

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().bg(PANEL).fg(Color::White)),
        ),
        area,
    );
}

fn render_confirmation(frame: &mut Frame, prompt: &str) {
    let area = centered_rect(frame.area(), prompt.len() as u16 + 6, 3);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            prompt.to_string(),
            Style::default().fg(WARN),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(PANEL)),
        ),
        area,
    );
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
