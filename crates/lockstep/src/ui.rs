//! Rendering for the two synchronized panes

use crate::app::{App, PaneArea};
use lockstep_core::{BackgroundClass, DifferenceType, PaneSide, Status};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::ops::Range;
use unicode_width::UnicodeWidthStr;

/// Width of the line number gutter including the selection marker column
const GUTTER_WIDTH: u16 = 6; // "▶1234 "

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_top_bar(frame, app, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    app.on_resize(u32::from(panes[0].height));
    app.source_area = Some(to_pane_area(panes[0]));
    app.destination_area = Some(to_pane_area(panes[1]));

    render_pane(frame, app, PaneSide::Source, panes[0], true);
    render_pane(frame, app, PaneSide::Destination, panes[1], false);

    render_help_bar(frame, chunks[2]);
}

fn to_pane_area(area: Rect) -> PaneArea {
    PaneArea {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height,
    }
}

fn render_top_bar(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.model.stats();
    let modified = if app.tracker.is_modified() { " [+]" } else { "" };
    let text = match (app.coordinator.status(), &app.error) {
        (Status::Error(message), _) | (_, Some(message)) => format!("error: {message}"),
        (Status::Parsing, _) => "parsing...".to_string(),
        _ => format!(
            " {} hunks · {} differences · {} applied{}",
            stats.hunks, stats.differences, stats.applied, modified
        ),
    };
    let bar = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(bar, area);
}

fn render_help_bar(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(" n/p step · space apply · a/u apply/unapply all · j/k scroll · q quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

fn render_pane(frame: &mut Frame, app: &App, side: PaneSide, area: Rect, border: bool) {
    let divider_width = if border { 1 } else { 0 };
    let content_width = area.width.saturating_sub(GUTTER_WIDTH + divider_width);

    let mut constraints = vec![Constraint::Length(GUTTER_WIDTH), Constraint::Min(0)];
    if border {
        constraints.push(Constraint::Length(1));
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let pane = app.pane(side);
    let selection = app.coordinator.selection();
    let offset = app.pane_scroll_offset(side);
    let visible_height = area.height as usize;

    let mut gutter_lines: Vec<Line> = Vec::new();
    let mut content_lines: Vec<Line> = Vec::new();

    for row in pane.rows() {
        if row.pos + row.height <= offset {
            continue;
        }
        if gutter_lines.len() >= visible_height {
            break;
        }

        let payload = pane.paint_payload(&app.model, row, selection);
        let is_blank = matches!(row.item, lockstep_core::PaneItem::Blank { .. });
        let style = row_style(&payload.class, app);
        let selected = matches!(
            payload.class,
            BackgroundClass::Difference { selected: true, .. }
        );

        let marker = if selected {
            app.settings.selected_marker.as_str()
        } else {
            " "
        };
        let number = match payload.number {
            Some(n) if app.settings.line_numbers => format!("{n:4} "),
            _ => "     ".to_string(),
        };
        gutter_lines.push(Line::from(vec![
            Span::styled(
                marker.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(number, Style::default().fg(Color::DarkGray)),
        ]));

        content_lines.push(content_line(
            payload.text,
            payload.changed,
            style,
            app.settings.tab_width,
            &payload.class,
            is_blank,
            content_width as usize,
        ));
    }

    frame.render_widget(Paragraph::new(gutter_lines), chunks[0]);
    frame.render_widget(Paragraph::new(content_lines), chunks[1]);

    if border {
        let divider = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(Color::DarkGray));
        frame.render_widget(divider, chunks[2]);
    }
}

/// Build one content line, splitting the text at its intra-line changed
/// ranges so those spans paint emphasized.
fn content_line(
    text: &str,
    changed: &[Range<usize>],
    style: Style,
    tab_width: usize,
    class: &BackgroundClass,
    is_blank: bool,
    width: usize,
) -> Line<'static> {
    if matches!(class, BackgroundClass::HunkHeader) {
        let label = expand_tabs(text, tab_width);
        let pad = width.saturating_sub(label.width());
        return Line::from(Span::styled(format!("{label}{}", "─".repeat(pad)), style));
    }
    if is_blank {
        // placeholder for the side with no lines of its own
        return Line::from(Span::styled("╌".repeat(width), style));
    }

    let mut spans: Vec<Span> = Vec::new();
    let mut cursor = 0usize;
    for range in changed {
        if range.start > cursor {
            spans.push(plain_span(&text[cursor..range.start], tab_width, style));
        }
        spans.push(Span::styled(
            expand_tabs(&text[range.clone()], tab_width),
            style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ));
        cursor = range.end;
    }
    if cursor < text.len() {
        spans.push(plain_span(&text[cursor..], tab_width, style));
    }
    if spans.is_empty() {
        spans.push(Span::styled(String::new(), style));
    }
    Line::from(spans)
}

fn plain_span(text: &str, tab_width: usize, style: Style) -> Span<'static> {
    Span::styled(expand_tabs(text, tab_width), style)
}

fn expand_tabs(text: &str, tab_width: usize) -> String {
    text.replace('\t', &" ".repeat(tab_width))
}

/// Color classification: unchanged rows keep the default foreground, hunk
/// headers and differences take the configured table, applied overrides the
/// base type color, selection inverts.
fn row_style(class: &BackgroundClass, app: &App) -> Style {
    let colors = &app.settings.colors;
    match class {
        BackgroundClass::HunkHeader => Style::default().fg(colors.hunk_header),
        BackgroundClass::Unchanged => Style::default().fg(Color::White),
        BackgroundClass::Difference {
            kind,
            selected,
            applied,
        } => {
            let fg = if *applied {
                colors.applied
            } else {
                match kind {
                    DifferenceType::Inserted => colors.inserted,
                    DifferenceType::Deleted => colors.deleted,
                    DifferenceType::Changed => colors.changed,
                    DifferenceType::Unchanged => Color::White,
                }
            };
            let style = Style::default().fg(fg);
            if *selected {
                style.add_modifier(Modifier::REVERSED)
            } else {
                style
            }
        }
    }
}
