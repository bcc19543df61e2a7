use crate::app::{App, View};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Block,
    Frame,
};

use super::{
    render_about, render_calendar, render_header, render_help_screen, render_markers_panel,
    render_notes_editor, render_page_pane, render_prompt, render_settings, render_stats,
    render_status_bar, Palette,
};

/// Render the complete UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.size();
    let palette = Palette::for_theme(app.reader.theme());
    frame.render_widget(
        Block::default().style(Style::default().fg(palette.fg).bg(palette.bg)),
        size,
    );

    // Header, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(frame, app, &palette, chunks[0]);
    match app.view {
        View::Main => render_main(frame, app, &palette, chunks[1]),
        View::Calendar => render_calendar_view(frame, app, &palette, chunks[1]),
        View::Settings => render_settings(frame, app, &palette, chunks[1]),
        View::About => render_about(frame, app, &palette, chunks[1]),
    }
    render_status_bar(frame, app, &palette, chunks[2]);

    // Overlays (drawn last)
    if app.prompt.is_some() {
        render_prompt(frame, app, &palette, size);
    }
    if app.help_open {
        render_help_screen(frame, app, &palette, size);
    }
}

/// Page text on the left, notes and markers on the right
fn render_main(frame: &mut Frame, app: &mut App, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    render_page_pane(frame, app, palette, columns[0]);

    if app.show_markers {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(8)])
            .split(columns[1]);
        render_notes_editor(frame, app, palette, right[0]);
        render_markers_panel(frame, app, palette, right[1]);
    } else {
        render_notes_editor(frame, app, palette, columns[1]);
    }
}

fn render_calendar_view(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)])
        .split(area);
    render_calendar(frame, app, palette, columns[0]);
    render_stats(frame, app, palette, columns[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::storage::DataDir;
    use marginalia_core::test_utils::write_pdf;
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    #[test]
    fn test_every_view_renders() {
        let dir = tempdir().unwrap();
        let book = write_pdf(dir.path(), "render", 2);
        let mut app = App::new(DataDir::new(dir.path().join("data"))).unwrap();
        app.start(Some(book.as_path()));
        app.start_editing();
        for c in "line one\nline two".chars() {
            app.insert_char(c);
        }

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for view in [View::Main, View::Calendar, View::Settings, View::About] {
            app.view = view;
            terminal.draw(|f| render(f, &mut app)).unwrap();
        }

        app.view = View::Main;
        app.open_help();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        app.close_help();
        app.open_prompt(crate::app::PromptKind::GotoPage);
        terminal.draw(|f| render(f, &mut app)).unwrap();
    }

    #[test]
    fn test_renders_in_tiny_terminal() {
        let dir = tempdir().unwrap();
        let mut app = App::new(DataDir::new(dir.path().join("data"))).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
    }
}
