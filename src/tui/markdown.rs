//! Markdown to terminal lines
//!
//! Model replies are parsed with pulldown-cmark (tables and strikethrough
//! enabled) and flattened into styled ratatui lines. Fenced code blocks and
//! tables get their own styling so they stand apart from prose.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const CODE_BLOCK_STYLE: Style = Style::new().fg(Color::LightGreen).bg(Color::Black);
const CODE_LABEL_STYLE: Style = Style::new().fg(Color::DarkGray).bg(Color::Black);
const INLINE_CODE_STYLE: Style = Style::new().fg(Color::Yellow);
const TABLE_BORDER_STYLE: Style = Style::new().fg(Color::DarkGray);
const QUOTE_STYLE: Style = Style::new().fg(Color::Gray).add_modifier(Modifier::ITALIC);
const LINK_STYLE: Style = Style::new()
    .fg(Color::LightBlue)
    .add_modifier(Modifier::UNDERLINED);

/// Render markdown text into owned, styled lines
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = MarkdownRenderer::new(Style::default());
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Debug)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

#[derive(Debug, Default)]
struct TableState {
    alignments: Vec<Alignment>,
    header: Vec<Vec<Span<'static>>>,
    rows: Vec<Vec<Vec<Span<'static>>>>,
    row: Vec<Vec<Span<'static>>>,
    cell: Vec<Span<'static>>,
}

struct MarkdownRenderer {
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<ListKind>,
    quote_depth: usize,
    code_block: Option<String>,
    link_target: Option<String>,
    table: Option<TableState>,
}

impl MarkdownRenderer {
    fn new(base: Style) -> Self {
        Self {
            base,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            code_block: None,
            link_target: None,
            table: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn push_span(&mut self, span: Span<'static>) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push(span);
        } else {
            if self.current.is_empty() && self.quote_depth > 0 {
                self.current
                    .push(Span::styled("│ ".repeat(self.quote_depth), QUOTE_STYLE));
            }
            self.current.push(span);
        }
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            return;
        }
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(code) | Event::InlineMath(code) | Event::DisplayMath(code) => {
                let style = self.style().patch(INLINE_CODE_STYLE);
                self.push_span(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => {
                if self.code_block.is_none() {
                    let style = self.style();
                    self.push_span(Span::styled(" ", style));
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.blank_line();
                self.lines
                    .push(Line::styled("─".repeat(40), TABLE_BORDER_STYLE));
                self.lines.push(Line::default());
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                let style = self.style();
                self.push_span(Span::styled(marker, style));
            }
            Event::FootnoteReference(label) => {
                let style = self.style();
                self.push_span(Span::styled(format!("[^{label}]"), style));
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.blank_line();
                self.push_style(heading_style(level));
            }
            Tag::BlockQuote(_) => {
                self.blank_line();
                self.quote_depth += 1;
                self.push_style(QUOTE_STYLE);
            }
            Tag::CodeBlock(kind) => {
                self.blank_line();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                if !lang.is_empty() {
                    self.lines
                        .push(Line::styled(format!(" {lang} "), CODE_LABEL_STYLE));
                }
                self.code_block = Some(lang);
            }
            Tag::List(start) => {
                self.flush_line();
                if self.lists.is_empty() {
                    self.blank_line();
                }
                self.lists.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Bullet,
                });
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    Some(ListKind::Bullet) | None => "• ".to_string(),
                };
                let style = self.style();
                self.push_span(Span::styled(format!("{}{marker}", "  ".repeat(depth)), style));
            }
            Tag::Emphasis => self.push_style(Style::new().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::new().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::new().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { dest_url, .. } => {
                self.link_target = Some(dest_url.into_string());
                self.push_style(LINK_STYLE);
            }
            Tag::Image { dest_url, .. } => {
                self.link_target = Some(dest_url.into_string());
                self.push_style(LINK_STYLE);
                self.push_span(Span::styled("[image: ", LINK_STYLE));
            }
            Tag::Table(alignments) => {
                self.blank_line();
                self.table = Some(TableState {
                    alignments,
                    ..TableState::default()
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else {
                    self.flush_line();
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.code_block = None;
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_target.take() {
                    let style = self.style();
                    self.push_span(Span::styled(format!(" ({url})"), style));
                }
            }
            TagEnd::Image => {
                self.pop_style();
                if let Some(url) = self.link_target.take() {
                    self.push_span(Span::styled(format!("] ({url})"), LINK_STYLE));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.lines.extend(render_table(&table));
                    self.lines.push(Line::default());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code_block.is_some() {
            for line in text.lines() {
                self.lines.push(Line::from(vec![
                    Span::styled("  ", CODE_BLOCK_STYLE),
                    Span::styled(line.to_string(), CODE_BLOCK_STYLE),
                ]));
            }
            return;
        }

        let style = self.style();
        let mut segments = text.split('\n').peekable();
        while let Some(segment) = segments.next() {
            if !segment.is_empty() {
                self.push_span(Span::styled(segment.to_string(), style));
            }
            if segments.peek().is_some() {
                self.flush_line();
            }
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::new().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style.fg(Color::Cyan),
        _ => style.fg(Color::LightCyan),
    }
}

fn cell_width(cell: &[Span<'_>]) -> usize {
    cell.iter().map(Span::width).sum()
}

/// Lay out a table with box-drawing borders and aligned columns
fn render_table(table: &TableState) -> Vec<Line<'static>> {
    let columns = std::iter::once(&table.header)
        .chain(table.rows.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![1usize; columns];
    for row in std::iter::once(&table.header).chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell_width(cell));
        }
    }

    let border = |left: &str, mid: &str, right: &str| {
        let body = widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join(mid);
        Line::styled(format!("{left}{body}{right}"), TABLE_BORDER_STYLE)
    };

    let row_line = |row: &[Vec<Span<'static>>], header: bool| {
        let mut spans = vec![Span::styled("│", TABLE_BORDER_STYLE)];
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map_or(&[][..], Vec::as_slice);
            let pad = width - cell_width(cell);
            let (before, after) = match table.alignments.get(i) {
                Some(Alignment::Right) => (pad, 0),
                Some(Alignment::Center) => (pad / 2, pad - pad / 2),
                _ => (0, pad),
            };
            spans.push(Span::raw(" ".repeat(before + 1)));
            for span in cell {
                let span = span.clone();
                spans.push(if header {
                    let style = span.style.add_modifier(Modifier::BOLD);
                    span.style(style)
                } else {
                    span
                });
            }
            spans.push(Span::raw(" ".repeat(after + 1)));
            spans.push(Span::styled("│", TABLE_BORDER_STYLE));
        }
        Line::from(spans)
    };

    let mut lines = vec![border("┌", "┬", "┐")];
    lines.push(row_line(table.header.as_slice(), true));
    lines.push(border("├", "┼", "┤"));
    for row in &table.rows {
        lines.push(row_line(row.as_slice(), false));
    }
    lines.push(border("└", "┴", "┘"));
    lines
}
