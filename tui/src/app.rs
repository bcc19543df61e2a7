use crate::config::{load_config, Action, Config, KeyBinding};
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use crossterm::event::KeyEvent;
use log::{info, warn};
use marginalia_core::models::{today, Marker, ReadingStats, Theme};
use marginalia_core::storage::DataDir;
use marginalia_core::Reader;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays visible
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Top-level screens, switched only by explicit user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    Calendar,
    Settings,
    About,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::Main => "Notes",
            View::Calendar => "Calendar",
            View::Settings => "Settings",
            View::About => "About",
        }
    }
}

/// What the single-line input overlay is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    OpenBook,
    OpenNotes,
    SaveAs,
    Export,
    GotoPage,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            PromptKind::OpenBook => " Open PDF ",
            PromptKind::OpenNotes => " Load notes file ",
            PromptKind::SaveAs => " Save notes as ",
            PromptKind::Export => " Export notes to Markdown ",
            PromptKind::GotoPage => " Go to page ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub shown_at: Instant,
}

/// Rows of the settings screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsItem {
    Theme,
    Autosave,
    MarkersPanel,
    ResetDefaults,
}

pub const SETTINGS_ITEMS: [SettingsItem; 4] = [
    SettingsItem::Theme,
    SettingsItem::Autosave,
    SettingsItem::MarkersPanel,
    SettingsItem::ResetDefaults,
];

/// Application state
pub struct App {
    pub should_quit: bool,
    pub reader: Reader,
    pub config: Config,
    bindings: Vec<(KeyBinding, Action)>,
    pub view: View,
    // Notes editor
    pub is_editing: bool,
    pub edit_buffer: String,
    pub edit_cursor_position: usize,
    pub selection_anchor: Option<usize>,
    // Page pane
    pub page_text: String,
    pub page_scroll: u16,
    // Overlays
    pub prompt: Option<Prompt>,
    pub help_open: bool,
    pub status: Option<StatusMessage>,
    // Markers panel
    pub show_markers: bool,
    pub markers_selected_index: usize,
    // Settings
    pub settings_selected_index: usize,
    // Calendar
    pub calendar_month_start: NaiveDate,
    pub calendar_selected: NaiveDate,
}

impl App {
    /// Create the app on top of `data_dir`, loading `config.toml` from it
    pub fn new(data_dir: DataDir) -> Result<Self> {
        data_dir.ensure()?;
        let mut config_error = None;
        let config = match load_config(&data_dir.config_path()) {
            Ok(config) => config,
            Err(err) => {
                warn!("config: {:#}, using defaults", err);
                config_error = Some(format!("Config error, using defaults: {:#}", err));
                Config::default()
            }
        };
        let reader = Reader::new(data_dir, config.autosave)?;
        let today = today();
        let month_start = first_of_month(today);

        let mut app = Self {
            should_quit: false,
            reader,
            bindings: config.keymap.resolve(),
            config,
            view: View::Main,
            is_editing: false,
            edit_buffer: String::new(),
            edit_cursor_position: 0,
            selection_anchor: None,
            page_text: String::new(),
            page_scroll: 0,
            prompt: None,
            help_open: false,
            status: None,
            show_markers: true,
            markers_selected_index: 0,
            settings_selected_index: 0,
            calendar_month_start: month_start,
            calendar_selected: today,
        };
        if let Some(message) = config_error {
            app.set_error(message);
        }
        Ok(app)
    }

    /// Open `book` if given, otherwise resume the previous session
    pub fn start(&mut self, book: Option<&Path>) {
        match book {
            Some(path) => self.open_book(path),
            None => match self.reader.resume() {
                Ok(true) => {
                    self.after_document_change();
                    let title = self.reader.document().title().unwrap_or("").to_string();
                    self.set_status(format!("Resumed {}", title));
                }
                Ok(false) => self.set_status("Press 'o' to open a PDF"),
                Err(err) => self.set_error(format!("Could not resume last book: {}", err)),
            },
        }
    }

    /// Action bound to `key` in the configured keymap
    pub fn action_for(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(key))
            .map(|(_, action)| *action)
    }

    pub fn perform(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit(),
            Action::Help => self.open_help(),
            Action::Save => self.save(),
            Action::SaveAs => self.open_prompt(PromptKind::SaveAs),
            Action::OpenBook => self.open_prompt(PromptKind::OpenBook),
            Action::OpenNotes => self.open_prompt(PromptKind::OpenNotes),
            Action::Export => self.open_prompt(PromptKind::Export),
            Action::NextPage => self.next_page(),
            Action::PrevPage => self.prev_page(),
            Action::GotoPage => self.open_prompt(PromptKind::GotoPage),
            Action::EditNotes => self.start_editing(),
            Action::ZoomIn => {
                let zoom = self.reader.zoom_in();
                self.set_status(format!("Zoom: {}%", zoom.percent()));
            }
            Action::ZoomOut => {
                let zoom = self.reader.zoom_out();
                self.set_status(format!("Zoom: {}%", zoom.percent()));
            }
            Action::ResetZoom => {
                let zoom = self.reader.reset_zoom();
                self.set_status(format!("Zoom: {}%", zoom.percent()));
            }
            Action::ToggleTheme => self.toggle_theme(),
            Action::ToggleAutosave => self.toggle_autosave(),
            Action::Bookmark => self.add_bookmark(),
            Action::Highlight => self.add_highlight(),
            Action::PrevMarker => self.select_marker(-1),
            Action::NextMarker => self.select_marker(1),
            Action::MainView => self.show_view(View::Main),
            Action::CalendarView => self.show_view(View::Calendar),
            Action::SettingsView => self.show_view(View::Settings),
            Action::AboutView => self.show_view(View::About),
        }
    }

    // =========================
    // Status line
    // =========================

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    /// Handle tick events: autosave, background errors and status expiry
    pub fn tick(&mut self, now: Instant) {
        if self.reader.tick(now).is_some() {
            info!("autosave: notes written");
        }
        if let Some(message) = self.reader.take_persist_error() {
            self.set_error(message);
        }
        if let Some(status) = &self.status {
            if now.duration_since(status.shown_at) >= STATUS_TIMEOUT {
                self.status = None;
            }
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        if self.is_editing {
            self.stop_editing();
        }
        self.should_quit = true;
    }

    /// Flush everything before the process exits
    pub fn shutdown(&mut self) {
        self.reader.shutdown();
    }

    // =========================
    // Documents
    // =========================

    pub fn open_book(&mut self, path: &Path) {
        match self.reader.open_book(path) {
            Ok(page_count) => {
                self.after_document_change();
                let title = self.reader.document().title().unwrap_or("").to_string();
                self.set_status(format!("Opened {} ({} pages)", title, page_count));
            }
            Err(err) => self.set_error(format!("Failed to load PDF: {}", err)),
        }
    }

    pub fn open_notes(&mut self, path: &Path) {
        match self.reader.open_notes(path) {
            Ok(_) => {
                self.after_document_change();
                self.set_status("Notes loaded successfully");
            }
            Err(err) => self.set_error(format!("Failed to load notes: {}", err)),
        }
    }

    pub fn save(&mut self) {
        match self.reader.save() {
            Ok(()) => self.set_status("Notes saved"),
            Err(err) => self.set_error(format!("Failed to save notes: {}", err)),
        }
    }

    pub fn save_as(&mut self, path: &Path) {
        match self.reader.save_as(path) {
            Ok(()) => self.set_status(format!("Notes saved to {}", path.display())),
            Err(err) => self.set_error(format!("Failed to save notes: {}", err)),
        }
    }

    /// Write the non-empty notes of the open book as Markdown
    pub fn export_markdown(&mut self, path: &Path) {
        let Some(title) = self.reader.document().title().map(str::to_string) else {
            self.set_error("No book is currently loaded");
            return;
        };
        let markdown = self.reader.notes().to_markdown(&title);
        match fs::write(path, markdown) {
            Ok(()) => self.set_status(format!("Exported to {}", path.display())),
            Err(err) => self.set_error(format!("Export failed: {}", err)),
        }
    }

    /// Default export target: the notes file with an `.md` extension
    fn default_export_path(&self) -> Option<PathBuf> {
        self.reader.notes_path().map(|path| path.with_extension("md"))
    }

    // =========================
    // Pages
    // =========================

    pub fn next_page(&mut self) {
        match self.reader.next_page() {
            Ok(true) => self.after_page_change(),
            Ok(false) => {}
            Err(err) => self.set_error(err.to_string()),
        }
    }

    pub fn prev_page(&mut self) {
        match self.reader.prev_page() {
            Ok(true) => self.after_page_change(),
            Ok(false) => {}
            Err(err) => self.set_error(err.to_string()),
        }
    }

    pub fn go_to_page(&mut self, input: &str) {
        match self.reader.go_to_page(input) {
            Ok(()) => self.after_page_change(),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn after_document_change(&mut self) {
        self.view = View::Main;
        self.after_page_change();
    }

    /// Reload the page text and the editor from the reader
    fn after_page_change(&mut self) {
        let page = self.reader.current_page();
        self.page_text = match self.reader.document().page_text(page) {
            Ok(text) if text.trim().is_empty() => "(this page has no extractable text)".to_string(),
            Ok(text) => text,
            Err(err) => format!("(could not extract text: {})", err),
        };
        self.page_scroll = 0;
        self.is_editing = false;
        self.edit_buffer = self.reader.current_note().to_string();
        self.edit_cursor_position = self.edit_buffer.chars().count();
        self.selection_anchor = None;
        self.markers_selected_index = 0;
    }

    pub fn scroll_page(&mut self, delta: i32) {
        let lines = self.page_text.lines().count() as i32;
        let next = (self.page_scroll as i32 + delta).clamp(0, (lines - 1).max(0));
        self.page_scroll = next as u16;
    }

    // =========================
    // Notes editor
    // =========================

    pub fn start_editing(&mut self) {
        if !self.reader.document().is_open() {
            self.set_error("No book is currently loaded");
            return;
        }
        self.view = View::Main;
        self.is_editing = true;
    }

    pub fn stop_editing(&mut self) {
        self.is_editing = false;
    }

    fn char_count(&self) -> usize {
        self.edit_buffer.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.edit_buffer
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.edit_buffer.len())
    }

    /// Push the buffer into the reader after every change
    fn note_changed(&mut self) {
        if let Err(err) = self.reader.edit_note(self.edit_buffer.clone()) {
            self.set_error(err.to_string());
        }
    }

    /// Replace the selection, if any; true when something was removed
    fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.selection_range() else {
            self.selection_anchor = None;
            return false;
        };
        let from = self.byte_index(start);
        let to = self.byte_index(end);
        self.edit_buffer.replace_range(from..to, "");
        self.edit_cursor_position = start;
        self.selection_anchor = None;
        true
    }

    pub fn insert_char(&mut self, c: char) {
        self.delete_selection();
        let at = self.byte_index(self.edit_cursor_position);
        self.edit_buffer.insert(at, c);
        self.edit_cursor_position += 1;
        self.note_changed();
    }

    pub fn backspace(&mut self) {
        if !self.delete_selection() {
            if self.edit_cursor_position == 0 {
                return;
            }
            let at = self.byte_index(self.edit_cursor_position - 1);
            self.edit_buffer.remove(at);
            self.edit_cursor_position -= 1;
        }
        self.note_changed();
    }

    pub fn delete_forward(&mut self) {
        if !self.delete_selection() {
            if self.edit_cursor_position >= self.char_count() {
                return;
            }
            let at = self.byte_index(self.edit_cursor_position);
            self.edit_buffer.remove(at);
        }
        self.note_changed();
    }

    /// Set the cursor, extending the selection from the old position when
    /// `extend` is set and clearing it otherwise
    fn move_cursor_to(&mut self, position: usize, extend: bool) {
        if extend {
            if self.selection_anchor.is_none() {
                self.selection_anchor = Some(self.edit_cursor_position);
            }
        } else {
            self.selection_anchor = None;
        }
        self.edit_cursor_position = position.min(self.char_count());
    }

    pub fn cursor_left(&mut self, extend: bool) {
        let position = self.edit_cursor_position.saturating_sub(1);
        self.move_cursor_to(position, extend);
    }

    pub fn cursor_right(&mut self, extend: bool) {
        let position = self.edit_cursor_position + 1;
        self.move_cursor_to(position, extend);
    }

    pub fn cursor_home(&mut self, extend: bool) {
        let (line_start, _) = self.cursor_line_col();
        self.move_cursor_to(line_start, extend);
    }

    pub fn cursor_end(&mut self, extend: bool) {
        let (line_start, _) = self.cursor_line_col();
        let line_len = self
            .edit_buffer
            .chars()
            .skip(line_start)
            .take_while(|c| *c != '\n')
            .count();
        self.move_cursor_to(line_start + line_len, extend);
    }

    pub fn cursor_up(&mut self, extend: bool) {
        let (line_start, column) = self.cursor_line_col();
        if line_start == 0 {
            self.move_cursor_to(0, extend);
            return;
        }
        let chars: Vec<char> = self.edit_buffer.chars().collect();
        let prev_end = line_start - 1;
        let prev_start = chars[..prev_end]
            .iter()
            .rposition(|c| *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.move_cursor_to(prev_start + column.min(prev_end - prev_start), extend);
    }

    pub fn cursor_down(&mut self, extend: bool) {
        let (line_start, column) = self.cursor_line_col();
        let chars: Vec<char> = self.edit_buffer.chars().collect();
        let Some(newline) = chars[line_start..].iter().position(|c| *c == '\n') else {
            self.move_cursor_to(chars.len(), extend);
            return;
        };
        let next_start = line_start + newline + 1;
        let next_len = chars[next_start..].iter().take_while(|c| **c != '\n').count();
        self.move_cursor_to(next_start + column.min(next_len), extend);
    }

    /// Char index of the cursor line's start, and the cursor column in chars
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line_start = 0;
        for (i, c) in self.edit_buffer.chars().take(self.edit_cursor_position).enumerate() {
            if c == '\n' {
                line_start = i + 1;
            }
        }
        (line_start, self.edit_cursor_position - line_start)
    }

    /// Selected char range, ordered, empty selections excluded
    pub fn selection_range(&self) -> Option<(usize, usize)> {
        let anchor = self.selection_anchor?;
        let cursor = self.edit_cursor_position;
        match anchor.cmp(&cursor) {
            std::cmp::Ordering::Less => Some((anchor, cursor)),
            std::cmp::Ordering::Greater => Some((cursor, anchor)),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn selected_text(&self) -> Option<String> {
        let (start, end) = self.selection_range()?;
        Some(self.edit_buffer.chars().skip(start).take(end - start).collect())
    }

    // =========================
    // Bookmarks & highlights
    // =========================

    pub fn add_bookmark(&mut self) {
        let added = match (self.selected_text(), self.selection_range()) {
            (Some(text), Some((start, _))) => self.reader.add_bookmark(&text, start),
            _ => false,
        };
        if added {
            self.set_status("Bookmark added");
        } else {
            self.set_error("Please select text to bookmark");
        }
    }

    pub fn add_highlight(&mut self) {
        let added = match (self.selected_text(), self.selection_range()) {
            (Some(text), Some((start, _))) => self.reader.add_highlight(&text, start),
            _ => false,
        };
        if added {
            self.set_status("Highlight added");
        } else {
            self.set_error("Please select text to highlight");
        }
    }

    /// Move the marker selection and put the editor cursor on its anchor
    pub fn select_marker(&mut self, delta: i32) {
        let count = self.reader.markers().len();
        if count == 0 {
            return;
        }
        let index = (self.markers_selected_index as i32 + delta).rem_euclid(count as i32) as usize;
        self.markers_selected_index = index;
        if let Some(anchor) = self.selected_marker().map(|marker| marker.anchor) {
            self.move_cursor_to(anchor, false);
        }
    }

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.reader.markers().get(self.markers_selected_index)
    }

    // =========================
    // Views & settings
    // =========================

    pub fn show_view(&mut self, view: View) {
        self.is_editing = false;
        self.view = view;
        if view == View::Calendar {
            self.calendar_goto_today();
        }
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.reader.toggle_theme();
        self.set_status(format!("{} mode", theme.label()));
    }

    pub fn toggle_autosave(&mut self) {
        let enabled = !self.reader.autosave_enabled();
        self.reader.set_autosave(enabled);
        self.set_status(if enabled { "Auto-save enabled" } else { "Auto-save disabled" });
    }

    pub fn settings_up(&mut self) {
        self.settings_selected_index = self.settings_selected_index.saturating_sub(1);
    }

    pub fn settings_down(&mut self) {
        if self.settings_selected_index + 1 < SETTINGS_ITEMS.len() {
            self.settings_selected_index += 1;
        }
    }

    pub fn settings_activate(&mut self) {
        match SETTINGS_ITEMS[self.settings_selected_index] {
            SettingsItem::Theme => self.toggle_theme(),
            SettingsItem::Autosave => self.toggle_autosave(),
            SettingsItem::MarkersPanel => self.show_markers = !self.show_markers,
            SettingsItem::ResetDefaults => {
                self.reader.set_theme(Theme::default());
                self.reader.reset_zoom();
                self.reader.set_autosave(self.config.autosave.enabled);
                self.show_markers = true;
                self.set_status("Settings reset to defaults");
            }
        }
    }

    // =========================
    // Prompt overlay
    // =========================

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let needs_document = matches!(
            kind,
            PromptKind::SaveAs | PromptKind::Export | PromptKind::GotoPage
        );
        if needs_document && !self.reader.document().is_open() {
            self.set_error("No book is currently loaded");
            return;
        }
        let input = match kind {
            PromptKind::SaveAs => self
                .reader
                .notes_path()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            PromptKind::Export => self
                .default_export_path()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        self.is_editing = false;
        self.prompt = Some(Prompt { kind, input });
    }

    pub fn close_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn prompt_push(&mut self, c: char) {
        if let Some(prompt) = &mut self.prompt {
            prompt.input.push(c);
        }
    }

    pub fn prompt_pop(&mut self) {
        if let Some(prompt) = &mut self.prompt {
            prompt.input.pop();
        }
    }

    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let input = prompt.input.trim();
        if input.is_empty() {
            return;
        }
        let path = PathBuf::from(input);
        match prompt.kind {
            PromptKind::OpenBook => self.open_book(&path),
            PromptKind::OpenNotes => self.open_notes(&path),
            PromptKind::SaveAs => self.save_as(&path),
            PromptKind::Export => self.export_markdown(&path),
            PromptKind::GotoPage => self.go_to_page(input),
        }
    }

    // =========================
    // Help
    // =========================

    pub fn open_help(&mut self) {
        self.help_open = true;
    }

    pub fn close_help(&mut self) {
        self.help_open = false;
    }

    // =========================
    // Calendar helpers
    // =========================

    pub fn calendar_move_day(&mut self, delta: i64) {
        self.calendar_selected = self.calendar_selected + ChronoDuration::days(delta);
        self.calendar_month_start = first_of_month(self.calendar_selected);
    }

    pub fn calendar_move_week(&mut self, delta_weeks: i64) {
        self.calendar_move_day(delta_weeks * 7);
    }

    pub fn calendar_prev_month(&mut self) {
        let y = self.calendar_month_start.year();
        let m = self.calendar_month_start.month();
        let (ny, nm) = if m == 1 { (y - 1, 12) } else { (y, m - 1) };
        self.set_calendar_month(ny, nm);
    }

    pub fn calendar_next_month(&mut self) {
        let y = self.calendar_month_start.year();
        let m = self.calendar_month_start.month();
        let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
        self.set_calendar_month(ny, nm);
    }

    fn set_calendar_month(&mut self, year: i32, month: u32) {
        self.calendar_month_start =
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(self.calendar_month_start);
        if self.calendar_selected.year() != year || self.calendar_selected.month() != month {
            self.calendar_selected = self.calendar_month_start;
        }
    }

    pub fn calendar_goto_today(&mut self) {
        let today = today();
        self.calendar_selected = today;
        self.calendar_month_start = first_of_month(today);
    }

    pub fn stats(&self) -> ReadingStats {
        self.reader.stats(today())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_core::test_utils::write_pdf;
    use tempfile::{tempdir, TempDir};

    fn app_in(dir: &TempDir) -> App {
        App::new(DataDir::new(dir.path().join("data"))).unwrap()
    }

    fn app_with_book(dir: &TempDir, pages: usize) -> App {
        let book = write_pdf(dir.path(), "book", pages);
        let mut app = app_in(dir);
        app.start(Some(book.as_path()));
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_app_creation() {
        let dir = tempdir().unwrap();
        let app = app_in(&dir);
        assert!(!app.should_quit);
        assert_eq!(app.view, View::Main);
        assert!(dir.path().join("data").join("config.toml").exists());
    }

    #[test]
    fn test_start_without_book_or_history() {
        let dir = tempdir().unwrap();
        let mut app = app_in(&dir);
        app.start(None);
        assert!(!app.reader.document().is_open());
        assert!(app.status.is_some());
    }

    #[test]
    fn test_open_book_shows_first_page() {
        let dir = tempdir().unwrap();
        let app = app_with_book(&dir, 3);
        assert_eq!(app.reader.document().page_count(), 3);
        assert!(!app.page_text.is_empty());
        assert_eq!(app.edit_buffer, "");
    }

    #[test]
    fn test_typing_updates_reader() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 3);
        app.start_editing();
        type_text(&mut app, "hello");
        assert_eq!(app.reader.current_note(), "hello");
        assert!(app.reader.is_dirty());

        app.backspace();
        assert_eq!(app.reader.current_note(), "hell");
    }

    #[test]
    fn test_page_change_loads_other_note() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 3);
        app.start_editing();
        type_text(&mut app, "first");
        app.stop_editing();

        app.next_page();
        assert_eq!(app.reader.current_page(), 1);
        assert_eq!(app.edit_buffer, "");

        app.prev_page();
        assert_eq!(app.edit_buffer, "first");
        assert_eq!(app.edit_cursor_position, 5);
    }

    #[test]
    fn test_goto_prompt_reports_range() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 3);
        app.open_prompt(PromptKind::GotoPage);
        for c in "7".chars() {
            app.prompt_push(c);
        }
        app.submit_prompt();

        let status = app.status.clone().unwrap();
        assert!(status.is_error);
        assert!(status.text.contains("Page number must be between 1 and 3"));
        assert_eq!(app.reader.current_page(), 0);

        app.open_prompt(PromptKind::GotoPage);
        app.prompt_push('3');
        app.submit_prompt();
        assert_eq!(app.reader.current_page(), 2);
    }

    #[test]
    fn test_prompts_need_a_document() {
        let dir = tempdir().unwrap();
        let mut app = app_in(&dir);
        app.open_prompt(PromptKind::SaveAs);
        assert!(app.prompt.is_none());
        app.open_prompt(PromptKind::OpenBook);
        assert!(app.prompt.is_some());
    }

    #[test]
    fn test_status_expires() {
        let dir = tempdir().unwrap();
        let mut app = app_in(&dir);
        app.set_status("hello");
        let shown_at = app.status.as_ref().unwrap().shown_at;

        app.tick(shown_at + Duration::from_secs(1));
        assert!(app.status.is_some());
        app.tick(shown_at + STATUS_TIMEOUT);
        assert!(app.status.is_none());
    }

    #[test]
    fn test_cursor_movement_across_lines() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 1);
        app.start_editing();
        type_text(&mut app, "abcd\nxy\nlonger line");

        app.cursor_up(false);
        // Column 11 clamps to the end of "xy"
        assert_eq!(app.cursor_line_col(), (5, 2));
        app.cursor_up(false);
        assert_eq!(app.cursor_line_col(), (0, 2));
        app.cursor_end(false);
        assert_eq!(app.edit_cursor_position, 4);
        app.cursor_down(false);
        assert_eq!(app.cursor_line_col(), (5, 2));
        app.cursor_home(false);
        assert_eq!(app.edit_cursor_position, 5);
    }

    #[test]
    fn test_selection_replace_and_bookmark() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 2);
        app.start_editing();
        type_text(&mut app, "key idea here");

        app.add_bookmark();
        assert!(app.status.as_ref().unwrap().is_error);

        app.cursor_home(false);
        for _ in 0..8 {
            app.cursor_right(true);
        }
        assert_eq!(app.selected_text().as_deref(), Some("key idea"));
        app.add_bookmark();
        app.add_highlight();
        assert_eq!(app.reader.markers().len(), 2);
        assert_eq!(app.reader.markers().all()[0].label, "key idea");

        app.insert_char('X');
        assert_eq!(app.edit_buffer, "X here");

        app.next_page();
        assert!(app.reader.markers().is_empty());
    }

    #[test]
    fn test_select_marker_moves_cursor() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 1);
        app.start_editing();
        type_text(&mut app, "one two three");
        app.edit_cursor_position = 4;
        app.cursor_right(true);
        app.cursor_right(true);
        app.cursor_right(true);
        app.add_highlight();
        app.cursor_end(false);

        app.select_marker(1);
        assert_eq!(app.markers_selected_index, 0);
        assert_eq!(app.edit_cursor_position, 4);
    }

    #[test]
    fn test_settings_items() {
        let dir = tempdir().unwrap();
        let mut app = app_in(&dir);
        app.show_view(View::Settings);

        app.settings_activate();
        assert_eq!(app.reader.theme(), Theme::Dark);

        app.settings_down();
        app.settings_activate();
        assert!(!app.reader.autosave_enabled());

        app.settings_down();
        app.settings_activate();
        assert!(!app.show_markers);

        app.settings_down();
        app.settings_down();
        app.settings_activate();
        assert_eq!(app.reader.theme(), Theme::Light);
        assert!(app.reader.autosave_enabled());
        assert!(app.show_markers);
    }

    #[test]
    fn test_calendar_navigation() {
        let dir = tempdir().unwrap();
        let mut app = app_in(&dir);
        app.calendar_selected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        app.calendar_month_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        app.calendar_move_day(1);
        assert_eq!(app.calendar_month_start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        app.calendar_prev_month();
        app.calendar_prev_month();
        assert_eq!(app.calendar_month_start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(app.calendar_selected, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    }

    #[test]
    fn test_export_markdown() {
        let dir = tempdir().unwrap();
        let mut app = app_with_book(&dir, 2);
        app.start_editing();
        type_text(&mut app, "worth keeping");
        app.stop_editing();

        let out = dir.path().join("book.md");
        app.export_markdown(&out);
        let markdown = fs::read_to_string(&out).unwrap();
        assert!(markdown.starts_with("# book\n"));
        assert!(markdown.contains("## Page 1"));
        assert!(markdown.contains("worth keeping"));
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("config.toml"), "keymap = [").unwrap();

        let app = App::new(DataDir::new(&data)).unwrap();
        assert!(app.status.as_ref().unwrap().is_error);
        assert_eq!(app.config.keymap.quit, "q");
    }
}
