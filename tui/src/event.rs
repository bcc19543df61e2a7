use crate::app::{App, View};
use crate::config::Action;
use anyhow::Result;
use crossterm::event::{
    self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use std::time::Duration;

/// Terminal events
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// Key press event
    Key(KeyEvent),
    /// Terminal tick event
    Tick,
    /// Mouse event
    Mouse(MouseEvent),
}

/// Event handler for the terminal
pub struct EventHandler {
    /// Tick rate in milliseconds
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Poll for the next event
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                CEvent::Key(key) => return Ok(Event::Key(key)),
                CEvent::Mouse(m) => return Ok(Event::Mouse(m)),
                _ => {}
            }
        }
        Ok(Event::Tick)
    }
}

fn is_text_input(key: &KeyEvent) -> bool {
    // AltGr arrives as CONTROL+ALT
    !key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT)
}

/// Handle key events for the application
pub fn handle_key_event(key: KeyEvent, app: &mut App) {
    // On Windows, crossterm reports both key press and release events.
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.help_open {
        if matches!(key.code, KeyCode::Esc) || app.action_for(&key) == Some(Action::Help) {
            app.close_help();
        }
        return;
    }

    if app.prompt.is_some() {
        match key.code {
            KeyCode::Esc => app.close_prompt(),
            KeyCode::Enter => app.submit_prompt(),
            KeyCode::Backspace => app.prompt_pop(),
            KeyCode::Char(c) if is_text_input(&key) => app.prompt_push(c),
            _ => {}
        }
        return;
    }

    if app.is_editing {
        handle_editing_input(key, app);
        return;
    }

    let handled = match app.view {
        View::Calendar => handle_calendar_input(key, app),
        View::Settings => handle_settings_input(key, app),
        View::Main => handle_main_input(key, app),
        View::About => false,
    };
    if handled {
        return;
    }

    if let Some(action) = app.action_for(&key) {
        app.perform(action);
    } else if key.code == KeyCode::Esc && app.view != View::Main {
        app.show_view(View::Main);
    }
}

/// Handle key events while the notes editor has focus
fn handle_editing_input(key: KeyEvent, app: &mut App) {
    // Save stays reachable while typing
    if key.modifiers.contains(KeyModifiers::CONTROL) && app.action_for(&key) == Some(Action::Save) {
        app.save();
        return;
    }

    let extend = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Esc => app.stop_editing(),
        KeyCode::Enter => app.insert_char('\n'),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete_forward(),
        KeyCode::Left => app.cursor_left(extend),
        KeyCode::Right => app.cursor_right(extend),
        KeyCode::Up => app.cursor_up(extend),
        KeyCode::Down => app.cursor_down(extend),
        KeyCode::Home => app.cursor_home(extend),
        KeyCode::End => app.cursor_end(extend),
        KeyCode::Char(c) if is_text_input(&key) => app.insert_char(c),
        _ => {}
    }
}

/// Keys owned by the main view before the keymap is consulted
fn handle_main_input(key: KeyEvent, app: &mut App) -> bool {
    match key.code {
        KeyCode::Up => app.scroll_page(-1),
        KeyCode::Down => app.scroll_page(1),
        KeyCode::PageUp => app.scroll_page(-10),
        KeyCode::PageDown => app.scroll_page(10),
        _ => return false,
    }
    true
}

fn handle_calendar_input(key: KeyEvent, app: &mut App) -> bool {
    match key.code {
        KeyCode::Left => app.calendar_move_day(-1),
        KeyCode::Right => app.calendar_move_day(1),
        KeyCode::Up => app.calendar_move_week(-1),
        KeyCode::Down => app.calendar_move_week(1),
        KeyCode::PageUp => app.calendar_prev_month(),
        KeyCode::PageDown => app.calendar_next_month(),
        KeyCode::Home => app.calendar_goto_today(),
        _ => return false,
    }
    true
}

fn handle_settings_input(key: KeyEvent, app: &mut App) -> bool {
    match key.code {
        KeyCode::Up => app.settings_up(),
        KeyCode::Down => app.settings_down(),
        KeyCode::Enter | KeyCode::Char(' ') => app.settings_activate(),
        _ => return false,
    }
    true
}

/// Mouse wheel scrolls the page text
pub fn handle_mouse_event(mouse: MouseEvent, app: &mut App) {
    if app.view != View::Main {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_page(-3),
        MouseEventKind::ScrollDown => app.scroll_page(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::storage::DataDir;
    use marginalia_core::test_utils::write_pdf;
    use tempfile::tempdir;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_event_handler_creation() {
        let handler = EventHandler::new(250);
        assert_eq!(handler.tick_rate, Duration::from_millis(250));
    }

    #[test]
    fn test_editing_flow() {
        let dir = tempdir().unwrap();
        let book = write_pdf(dir.path(), "flow", 2);
        let mut app = App::new(DataDir::new(dir.path().join("data"))).unwrap();
        app.start(Some(book.as_path()));

        handle_key_event(press(KeyCode::Enter), &mut app);
        assert!(app.is_editing);
        for c in "hi".chars() {
            handle_key_event(press(KeyCode::Char(c)), &mut app);
        }
        // Keymap letters are text while editing
        handle_key_event(press(KeyCode::Char('q')), &mut app);
        assert!(!app.should_quit);
        assert_eq!(app.reader.current_note(), "hiq");

        handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), &mut app);
        assert!(!app.reader.is_dirty());

        handle_key_event(press(KeyCode::Esc), &mut app);
        assert!(!app.is_editing);
        handle_key_event(press(KeyCode::Right), &mut app);
        assert_eq!(app.reader.current_page(), 1);

        handle_key_event(press(KeyCode::Char('q')), &mut app);
        assert!(app.should_quit);
    }

    #[test]
    fn test_view_switching() {
        let dir = tempdir().unwrap();
        let mut app = App::new(DataDir::new(dir.path().join("data"))).unwrap();

        handle_key_event(press(KeyCode::Char('2')), &mut app);
        assert_eq!(app.view, View::Calendar);
        let selected = app.calendar_selected;
        handle_key_event(press(KeyCode::Right), &mut app);
        assert_eq!(app.calendar_selected, selected.succ_opt().unwrap());

        handle_key_event(press(KeyCode::Esc), &mut app);
        assert_eq!(app.view, View::Main);

        handle_key_event(press(KeyCode::Char('h')), &mut app);
        assert!(app.help_open);
        handle_key_event(press(KeyCode::Char('2')), &mut app);
        assert_eq!(app.view, View::Main);
        handle_key_event(press(KeyCode::Esc), &mut app);
        assert!(!app.help_open);
    }

    #[test]
    fn test_prompt_input() {
        let dir = tempdir().unwrap();
        let mut app = App::new(DataDir::new(dir.path().join("data"))).unwrap();

        handle_key_event(press(KeyCode::Char('o')), &mut app);
        assert!(app.prompt.is_some());
        for c in "nope.pdf".chars() {
            handle_key_event(press(KeyCode::Char(c)), &mut app);
        }
        handle_key_event(press(KeyCode::Backspace), &mut app);
        assert_eq!(app.prompt.as_ref().unwrap().input, "nope.pd");

        handle_key_event(press(KeyCode::Enter), &mut app);
        assert!(app.prompt.is_none());
        assert!(app.status.as_ref().unwrap().is_error);
        assert!(!app.reader.document().is_open());
    }
}
