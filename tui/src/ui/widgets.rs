use super::Palette;
use crate::app::{App, View, SETTINGS_ITEMS, SettingsItem};
use crate::config::Action;
use chrono::{Datelike, Local};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Render the header with book title, position and save state
pub fn render_header(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let document = app.reader.document();
    let title = match document.title() {
        Some(title) => format!(" 📖 {} ", title),
        None => " Marginalia ".to_string(),
    };

    let mut spans = vec![Span::styled(
        title,
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
    )];
    if document.is_open() {
        spans.push(Span::raw(format!(
            "| Page {} of {} | {}% ",
            document.current_page() + 1,
            document.page_count(),
            app.reader.zoom().percent()
        )));
        if app.reader.is_dirty() {
            spans.push(Span::styled("● Unsaved ", Style::default().fg(palette.error)));
        } else {
            spans.push(Span::styled("✓ Saved ", Style::default().fg(palette.muted)));
        }
    }

    spans.push(Span::raw("| "));
    for (number, view) in [View::Main, View::Calendar, View::Settings, View::About]
        .into_iter()
        .enumerate()
    {
        let label = format!("[{}:{}] ", number + 1, view.title());
        let style = if view == app.view {
            Style::default().fg(palette.accent).add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(palette.muted)
        };
        spans.push(Span::styled(label, style));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    frame.render_widget(header, area);
}

/// Status message if one is showing, key hints otherwise
pub fn render_status_bar(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let keymap = &app.config.keymap;
    let (text, style) = match &app.status {
        Some(status) if status.is_error => (
            format!(" ⚠ {} ", status.text),
            Style::default().bg(palette.error).fg(palette.bar_fg),
        ),
        Some(status) => (
            format!(" {} ", status.text),
            Style::default().bg(palette.bar_bg).fg(palette.bar_fg),
        ),
        None => {
            let hints = if app.is_editing {
                format!(
                    " [Esc:Done] [Shift+Arrows:Select] [{}:Save] ",
                    keymap.label(Action::Save)
                )
            } else {
                match app.view {
                    View::Main => format!(
                        " [{}/{}:Page] [{}:Go to] [{}:Edit] [{}:Open] [{}:Save] [{}:Help] [{}:Quit] ",
                        keymap.label(Action::PrevPage),
                        keymap.label(Action::NextPage),
                        keymap.label(Action::GotoPage),
                        keymap.label(Action::EditNotes),
                        keymap.label(Action::OpenBook),
                        keymap.label(Action::Save),
                        keymap.label(Action::Help),
                        keymap.label(Action::Quit),
                    ),
                    View::Calendar => {
                        " [Arrows:Day] [PgUp/PgDn:Month] [Home:Today] [Esc:Back] ".to_string()
                    }
                    View::Settings => " [↑/↓:Select] [Enter:Change] [Esc:Back] ".to_string(),
                    View::About => " [Esc:Back] ".to_string(),
                }
            };
            let autosave = if app.reader.autosave_enabled() { "auto-save on" } else { "auto-save off" };
            (
                format!("{}| {} ", hints, autosave),
                Style::default().bg(palette.bar_bg).fg(palette.bar_fg),
            )
        }
    };

    let status_bar = Paragraph::new(text).style(style).alignment(Alignment::Left);
    frame.render_widget(status_bar, area);
}

/// Extracted text of the current page
pub fn render_page_pane(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let document = app.reader.document();
    if !document.is_open() {
        let empty = Paragraph::new(format!(
            "No book loaded. Press '{}' to open a PDF.",
            app.config.keymap.label(Action::OpenBook)
        ))
        .block(Block::default().borders(Borders::ALL).title(" Page "))
        .alignment(Alignment::Center)
        .style(Style::default().fg(palette.muted));
        frame.render_widget(empty, area);
        return;
    }

    let title = format!(
        " Page {} of {} ",
        document.current_page() + 1,
        document.page_count()
    );
    let page = Paragraph::new(app.page_text.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.page_scroll, 0));
    frame.render_widget(page, area);
}

/// The note of the current page, with the cursor and selection while editing
pub fn render_notes_editor(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let document = app.reader.document();
    let title = if document.is_open() {
        format!(" Notes: page {} ", document.current_page() + 1)
    } else {
        " Notes ".to_string()
    };
    let border_style = if app.is_editing {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style);
    let inner = block.inner(area);

    if !app.is_editing && app.edit_buffer.is_empty() {
        let hint = if document.is_open() {
            format!(
                "No notes for this page. Press {} to write.",
                app.config.keymap.label(Action::EditNotes)
            )
        } else {
            String::new()
        };
        let empty = Paragraph::new(hint)
            .block(block)
            .style(Style::default().fg(palette.muted));
        frame.render_widget(empty, area);
        return;
    }

    let selected = Style::default().bg(palette.selection).fg(palette.fg);
    let lines = editor_lines(&app.edit_buffer, app.selection_range(), selected);

    let (line_start, column) = app.cursor_line_col();
    let cursor_row = app.edit_buffer[..byte_offset(&app.edit_buffer, line_start)]
        .matches('\n')
        .count() as u16;
    let scroll = if inner.height > 0 && cursor_row >= inner.height {
        cursor_row - inner.height + 1
    } else {
        0
    };

    let editor = Paragraph::new(lines).block(block).scroll((scroll, 0));
    frame.render_widget(editor, area);

    if app.is_editing && inner.width > 0 && inner.height > 0 {
        let line_text = &app.edit_buffer[byte_offset(&app.edit_buffer, line_start)..];
        let prefix: String = line_text.chars().take(column).collect();
        let x = (prefix.width() as u16).min(inner.width - 1);
        frame.set_cursor(inner.x + x, inner.y + cursor_row - scroll);
    }
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Split the buffer into lines, styling the selected char range
fn editor_lines(buffer: &str, selection: Option<(usize, usize)>, selected: Style) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut index = 0;
    for raw in buffer.split('\n') {
        let len = raw.chars().count();
        let line = match selection {
            Some((start, end)) if start < index + len && end > index => {
                let from = start.saturating_sub(index);
                let to = (end - index).min(len);
                let (before, rest) = raw.split_at(byte_offset(raw, from));
                let (inside, after) = rest.split_at(byte_offset(rest, to - from));
                Line::from(vec![
                    Span::raw(before),
                    Span::styled(inside, selected),
                    Span::raw(after),
                ])
            }
            _ => Line::from(raw),
        };
        lines.push(line);
        index += len + 1;
    }
    lines
}

/// Bookmarks and highlights of the current page
pub fn render_markers_panel(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let markers = app.reader.markers();
    let title = format!(
        " Bookmarks & highlights [{}/{}] ",
        app.config.keymap.label(Action::PrevMarker),
        app.config.keymap.label(Action::NextMarker)
    );

    let mut items: Vec<ListItem> = markers
        .all()
        .iter()
        .map(|marker| ListItem::new(format!("{} {}", marker.kind.icon(), marker.label)))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(Line::styled(
            "Select note text, then press b or m",
            Style::default().fg(palette.muted),
        )));
    }

    let mut state = ListState::default();
    if !markers.is_empty() {
        state.select(Some(app.markers_selected_index));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(palette.selection).fg(palette.fg));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Month grid of recorded activity, Monday first
pub fn render_calendar(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let month_start = app.calendar_month_start;
    let today = Local::now().date_naive();
    let usage = app.reader.usage();

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!("{} {}", month_start.format("%B"), month_start.year()),
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(" Mo  Tu  We  Th  Fr  Sa  Su"));

    for week in usage.month_grid(month_start.year(), month_start.month()) {
        let mut spans: Vec<Span> = Vec::new();
        for cell in week {
            match cell {
                Some(cell) => {
                    let mut style = Style::default().fg(palette.heat_for(cell.count));
                    if cell.count > 0 {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    if cell.date == today {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    if cell.date == app.calendar_selected {
                        style = style.bg(palette.selection).fg(palette.fg);
                    }
                    spans.push(Span::styled(format!(" {:>2} ", cell.date.day()), style));
                }
                None => spans.push(Span::raw("    ")),
            }
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    let count = usage.count(app.calendar_selected);
    lines.push(Line::from(format!(
        "{}: {} {}",
        app.calendar_selected.format("%a %b %-d"),
        count,
        if count == 1 { "action" } else { "actions" }
    )));
    lines.push(Line::from(vec![
        Span::raw("Less "),
        Span::styled("■", Style::default().fg(palette.heat[0])),
        Span::styled("■", Style::default().fg(palette.heat[1])),
        Span::styled("■", Style::default().fg(palette.heat[2])),
        Span::styled("■", Style::default().fg(palette.heat[3])),
        Span::raw(" More"),
    ]));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Reading calendar "),
    );
    frame.render_widget(widget, area);
}

/// Usage statistics next to the calendar
pub fn render_stats(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let stats = app.stats();
    let label = Style::default().fg(palette.muted);
    let value = Style::default().add_modifier(Modifier::BOLD);
    let avg = stats
        .avg_pages_per_day
        .map(|n| n.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    let rows = [
        ("Days used", stats.days_used.to_string()),
        ("Current streak", format!("{} days", stats.current_streak)),
        ("Longest streak", format!("{} days", stats.longest_streak)),
        ("Total notes", stats.total_notes.to_string()),
        ("Avg pages/session", avg),
    ];
    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(name, v)| {
            Line::from(vec![
                Span::styled(format!("{:<20}", name), label),
                Span::styled(v, value),
            ])
        })
        .collect();

    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Statistics "));
    frame.render_widget(widget, area);
}

pub fn render_settings(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let autosave = &app.config.autosave;
    let items: Vec<ListItem> = SETTINGS_ITEMS
        .iter()
        .map(|item| {
            let text = match item {
                SettingsItem::Theme => format!("Theme: {}", app.reader.theme().label()),
                SettingsItem::Autosave => format!(
                    "Auto-save: {} (saves {} s after the last edit, backup every {} s)",
                    if app.reader.autosave_enabled() { "On" } else { "Off" },
                    autosave.delay_secs,
                    autosave.backup_interval_secs
                ),
                SettingsItem::MarkersPanel => format!(
                    "Bookmarks panel: {}",
                    if app.show_markers { "Shown" } else { "Hidden" }
                ),
                SettingsItem::ResetDefaults => "Reset to defaults".to_string(),
            };
            ListItem::new(text)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.settings_selected_index));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" ⚙ Settings "))
        .highlight_style(Style::default().bg(palette.selection).fg(palette.fg))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state);

    let data_dir = app.reader.data_dir();
    let footer = Paragraph::new(vec![
        Line::from(format!("Data directory: {}", data_dir.root().display())),
        Line::from(format!("Key bindings: {}", data_dir.config_path().display())),
    ])
    .style(Style::default().fg(palette.muted));
    let footer_area = Rect {
        x: area.x + 2,
        y: area.y + area.height.saturating_sub(3),
        width: area.width.saturating_sub(4),
        height: 2.min(area.height),
    };
    frame.render_widget(footer, footer_area);
}

pub fn render_about(frame: &mut Frame, _app: &App, palette: &Palette, area: Rect) {
    let heading = Style::default().fg(palette.accent).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled(
            format!("Marginalia {}", env!("CARGO_PKG_VERSION")),
            heading,
        )),
        Line::from(""),
        Line::from("A PDF reader for the terminal with per-page notes."),
        Line::from(""),
        Line::from(Span::styled("Features", heading)),
        Line::from("• Page text view with zoom controls"),
        Line::from("• Per-page notes with auto-save"),
        Line::from("• Bookmarks and highlights for the page you are on"),
        Line::from("• Reading calendar with usage statistics"),
        Line::from("• Dark and light themes"),
        Line::from("• Automatic session restore"),
        Line::from(""),
        Line::from(Span::styled("Built with", heading)),
        Line::from("Rust, ratatui, crossterm, lopdf"),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" About "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

/// Centered popup of at most `width` x `height`
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Single-line input overlay
pub fn render_prompt(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let Some(prompt) = &app.prompt else {
        return;
    };
    let popup = popup_area(area, 70, 3);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(prompt.kind.title())
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    let inner = block.inner(popup);
    let input = Paragraph::new(prompt.input.as_str()).block(block);
    frame.render_widget(input, popup);

    if inner.width > 0 && inner.height > 0 {
        let x = (prompt.input.width() as u16).min(inner.width - 1);
        frame.set_cursor(inner.x + x, inner.y);
    }
}

pub fn render_help_screen(frame: &mut Frame, app: &App, palette: &Palette, size: Rect) {
    let keymap = &app.config.keymap;
    let heading = Style::default().fg(palette.accent).add_modifier(Modifier::BOLD);
    let row = |action: Action, text: &str| Line::from(format!("{:<13}{}", keymap.label(action), text));

    let help_text = vec![
        Line::from(Span::styled("Reading", heading)),
        row(Action::NextPage, "Next page"),
        row(Action::PrevPage, "Previous page"),
        row(Action::GotoPage, "Go to page"),
        Line::from(format!("{:<13}{}", "up/down", "Scroll page text")),
        row(Action::ZoomIn, "Zoom in"),
        row(Action::ZoomOut, "Zoom out"),
        row(Action::ResetZoom, "Reset zoom"),
        Line::from(""),
        Line::from(Span::styled("Notes", heading)),
        row(Action::EditNotes, "Edit notes (Esc to finish)"),
        row(Action::Save, "Save notes"),
        row(Action::SaveAs, "Save notes as"),
        row(Action::OpenNotes, "Load notes file"),
        row(Action::Export, "Export notes to Markdown"),
        row(Action::Bookmark, "Bookmark selected text"),
        row(Action::Highlight, "Highlight selected text"),
        row(Action::NextMarker, "Next bookmark or highlight"),
        Line::from(""),
        Line::from(Span::styled("Interface", heading)),
        row(Action::OpenBook, "Open PDF"),
        row(Action::MainView, "Notes view"),
        row(Action::CalendarView, "Calendar view"),
        row(Action::SettingsView, "Settings"),
        row(Action::AboutView, "About"),
        row(Action::ToggleTheme, "Toggle dark mode"),
        row(Action::ToggleAutosave, "Toggle auto-save"),
        row(Action::Help, "Show this help"),
        row(Action::Quit, "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            format!("Press '{}' or 'Esc' to close", keymap.label(Action::Help)),
            Style::default().fg(palette.muted),
        )),
    ];

    let popup = popup_area(size, 60, help_text.len() as u16 + 2);
    frame.render_widget(Clear, popup);
    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().fg(palette.fg).bg(palette.bg)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(help, popup);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_lines_selection() {
        let selected = Style::default().add_modifier(Modifier::REVERSED);
        let lines = editor_lines("abc\ndef", Some((2, 5)), selected);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[1].content, "c");
        assert_eq!(lines[1].spans[0].content, "");
        assert_eq!(lines[1].spans[1].content, "d");
        assert_eq!(lines[1].spans[2].content, "ef");
    }

    #[test]
    fn test_popup_area_fits() {
        let area = Rect::new(0, 0, 10, 4);
        let popup = popup_area(area, 70, 3);
        assert_eq!(popup.width, 10);
        assert_eq!(popup.height, 3);
    }
}
