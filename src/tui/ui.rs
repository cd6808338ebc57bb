//! Frame layout and widgets

use super::app::{App, Focus};
use super::markdown::render_markdown;
use crate::api::Role;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

const PLACEHOLDER: &str = "Ask Kurobot anything...";
const TYPING_FRAMES: [&str; 4] = ["   ", ".  ", ".. ", "..."];
const ACCENT: Color = Color::Cyan;
const DISABLED: Style = Style::new().fg(Color::DarkGray);

pub fn draw(frame: &mut Frame, app: &mut App) {
    let [header, transcript, input, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, app, header);
    draw_transcript(frame, app, transcript);
    draw_input(frame, app, input);
    draw_footer(frame, app, footer);

    if app.state().is_confirming_clear() {
        draw_confirm(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" KUROBOT", Style::new().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled("  Gemini chat", Style::new().fg(Color::Gray)),
    ];
    if !app.gateway_label.is_empty() {
        spans.push(Span::styled(
            format!("  {}", app.gateway_label),
            Style::new().fg(Color::DarkGray),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::new().fg(Color::DarkGray)),
    );
    frame.render_widget(header, area);
}

fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let state = app.state();
    let mut lines = Vec::new();

    if state.history().is_empty() && !state.is_pending() {
        lines.push(Line::styled(
            "No messages yet. Type below and press Enter.",
            DISABLED,
        ));
        return lines;
    }

    for turn in state.history() {
        match turn.role {
            Role::User => {
                lines.push(Line::styled("You", Style::new().fg(Color::Green).bold()));
                lines.extend(turn.text().lines().map(|l| Line::raw(l.to_string())));
            }
            Role::Model => {
                lines.push(Line::styled("Kurobot", Style::new().fg(ACCENT).bold()));
                lines.extend(render_markdown(&turn.text()));
            }
        }
        lines.push(Line::default());
    }

    if state.is_pending() {
        lines.push(Line::styled("Kurobot", Style::new().fg(ACCENT).bold()));
        let dots = TYPING_FRAMES[app.tick % TYPING_FRAMES.len()];
        lines.push(Line::styled(
            format!("typing{dots}"),
            Style::new().fg(Color::Gray).italic(),
        ));
    }

    lines
}

fn draw_transcript(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::bordered()
        .title(" Conversation ")
        .border_style(Style::new().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(transcript_lines(app)).wrap(Wrap { trim: false });
    let content = u16::try_from(paragraph.line_count(inner.width)).unwrap_or(u16::MAX);
    app.scroll.fit(content, inner.height);

    frame.render_widget(paragraph.scroll((app.scroll.offset, 0)), inner);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Input;
    let border = if focused {
        Style::new().fg(ACCENT)
    } else {
        Style::new().fg(Color::DarkGray)
    };
    let block = Block::bordered().title(" Message ").border_style(border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Keep room for the cursor after the text
    let (shown, shown_width) = visible_tail(&app.input, usize::from(inner.width.saturating_sub(1)));

    let text = if app.input.is_empty() {
        Line::styled(PLACEHOLDER, DISABLED)
    } else {
        Line::raw(shown)
    };
    frame.render_widget(Paragraph::new(text), inner);

    if focused && !app.state().is_confirming_clear() {
        let offset = u16::try_from(shown_width).unwrap_or(u16::MAX);
        frame.set_cursor_position((inner.x.saturating_add(offset), inner.y));
    }
}

/// Longest suffix of `input` that fits in `columns`, with its display width
fn visible_tail(input: &str, columns: usize) -> (String, usize) {
    let mut used = 0;
    let mut tail = Vec::new();
    for c in input.chars().rev() {
        let width = c.width().unwrap_or(0);
        if used + width > columns {
            break;
        }
        used += width;
        tail.push(c);
    }
    (tail.into_iter().rev().collect(), used)
}

fn button(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let style = match (enabled, focused) {
        (false, _) => DISABLED,
        (true, true) => Style::new().fg(Color::Black).bg(ACCENT).bold(),
        (true, false) => Style::new().fg(ACCENT),
    };
    Span::styled(format!("[ {label} ]"), style)
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let line = Line::from(vec![
        Span::raw(" "),
        button("Send", app.focus == Focus::Send, !state.is_pending()),
        Span::raw(" "),
        button(
            "Clear history",
            app.focus == Focus::Clear,
            !state.is_pending() && !state.history().is_empty(),
        ),
        Span::styled(
            "  Enter send · Tab focus · Ctrl+L clear · PgUp/PgDn scroll · Esc quit",
            DISABLED,
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_confirm(frame: &mut Frame) {
    let area = centered(frame.area(), 40, 5);
    frame.render_widget(Clear, area);
    let dialog = Paragraph::new(vec![
        Line::raw(""),
        Line::raw("Clear the message history? (y/n)"),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::bordered()
            .title(" Clear history ")
            .border_style(Style::new().fg(Color::Yellow)),
    );
    frame.render_widget(dialog, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
